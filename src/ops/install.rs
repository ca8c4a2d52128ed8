//! Runs `composer install` before dependency resolution.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::util::process::{find_composer, ProcessBuilder};

/// Locate the composer executable: the explicit path if given, else PATH.
pub fn locate_composer(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    find_composer().context(
        "composer was not found in PATH\n\
         hint: pass --composer <PATH>, set SHADEPACK_COMPOSER, or use --no-install",
    )
}

/// Install the dependencies of the project at `project_dir`.
///
/// Platform requirements are ignored; a non-zero exit status aborts.
pub fn install_dependencies(composer: &Path, project_dir: &Path) -> Result<()> {
    let process = ProcessBuilder::new(composer)
        .args(["install", "--ignore-platform-reqs", "--no-interaction"])
        .cwd(project_dir);

    tracing::info!("Running {} in {}", process.display_command(), project_dir.display());
    process
        .status_and_check()
        .with_context(|| format!("failed to install dependencies in {}", project_dir.display()))
}
