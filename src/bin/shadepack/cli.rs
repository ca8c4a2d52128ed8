//! CLI definitions using clap.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use clap::Parser;
use thiserror::Error;

use shadepack::core::PLUGIN_DESCRIPTOR;
use shadepack::ops::{InputFile, PackOptions, DEFAULT_SOURCE_ROOT};

/// Archive written when no output is selected.
const DEFAULT_ARCHIVE: &str = "output.phar";

/// Shadepack - package a plugin with its libraries shaded into a private namespace
#[derive(Parser, Debug)]
#[command(name = "shadepack")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Plugin directory: copies plugin.yml and resources/, and adds src/ as a source root
    #[arg(short = 'i', value_name = "PATH")]
    pub input_dir: Option<PathBuf>,

    /// Copy a file or directory into the output under NAME
    #[arg(short = 'f', value_name = "NAME:PATH")]
    pub files: Vec<InputFile>,

    /// Add a source root to split and shade
    #[arg(short = 's', value_name = "PATH")]
    pub source_roots: Vec<PathBuf>,

    /// Name of the source root directory in the output
    #[arg(short = 'r', value_name = "NAME", default_value = DEFAULT_SOURCE_ROOT)]
    pub source_root_name: String,

    /// Write the output tree to this directory
    #[arg(short = 'o', value_name = "PATH")]
    pub output_dir: Option<PathBuf>,

    /// Package the output into an archive (.phar, .tar.gz or .tgz)
    #[arg(short = 'p', value_name = "PATH", num_args = 0..=1)]
    pub archive: Option<Option<PathBuf>>,

    /// Shade this namespace root (repeatable)
    #[arg(short = 'a', value_name = "NAMESPACE")]
    pub shade: Vec<String>,

    /// Take source roots and shaded libraries from the composer project here
    #[arg(short = 'c', value_name = "PATH", num_args = 0..=1)]
    pub composer_project: Option<Option<PathBuf>>,

    /// Composer executable used to install dependencies
    #[arg(long, env = "SHADEPACK_COMPOSER", value_name = "PATH")]
    pub composer: Option<PathBuf>,

    /// Use the dependencies already installed under vendor/
    #[arg(long)]
    pub no_install: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

/// Invocations that parse but cannot be run.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UsageError {
    #[error("`-c` needs a path when `-i` is not given")]
    ProjectWithoutInput,

    #[error("nothing to package: pass -i, -f, -s or -c")]
    NothingToPack,
}

impl Cli {
    /// Lower the parsed arguments into library options.
    pub fn to_options(&self) -> Result<PackOptions, UsageError> {
        let input_dir = self.input_dir.as_deref().map(trim_separators);

        let composer_project = match &self.composer_project {
            None => None,
            Some(Some(path)) => Some(path.clone()),
            Some(None) => Some(input_dir.clone().ok_or(UsageError::ProjectWithoutInput)?),
        };

        let mut inputs = Vec::new();
        let mut source_roots = Vec::new();
        if let Some(dir) = &input_dir {
            let resources = dir.join("resources");
            if resources.is_dir() {
                inputs.push(InputFile::new("resources", resources));
            }
            inputs.push(InputFile::new(PLUGIN_DESCRIPTOR, dir.join(PLUGIN_DESCRIPTOR)));
            if composer_project.is_none() {
                source_roots.push(dir.join(DEFAULT_SOURCE_ROOT));
            }
        }
        inputs.extend(self.files.iter().cloned());
        source_roots.extend(self.source_roots.iter().cloned());

        if inputs.is_empty() && source_roots.is_empty() && composer_project.is_none() {
            return Err(UsageError::NothingToPack);
        }

        let output_dir = self.output_dir.as_deref().map(trim_separators);
        let archive = match (&output_dir, &self.archive) {
            (_, Some(Some(path))) => Some(path.clone()),
            (None, _) => Some(PathBuf::from(DEFAULT_ARCHIVE)),
            (Some(dir), Some(None)) => {
                let mut name = OsString::from(dir.as_os_str());
                name.push(".phar");
                Some(PathBuf::from(name))
            }
            (Some(_), None) => None,
        };

        Ok(PackOptions {
            inputs,
            source_roots,
            source_root_name: self.source_root_name.clone(),
            output_dir,
            archive,
            shaded_namespaces: self.shade.clone(),
            composer_project,
            install: !self.no_install,
            composer: self.composer.clone(),
            plugin_descriptor: input_dir.map(|dir| dir.join(PLUGIN_DESCRIPTOR)),
        })
    }
}

/// Drop trailing `/` and `\` without emptying the path.
fn trim_separators(path: &Path) -> PathBuf {
    let text = path.to_string_lossy();
    let trimmed = text.trim_end_matches(['/', '\\']);
    if trimmed.is_empty() {
        path.to_path_buf()
    } else {
        PathBuf::from(trimmed)
    }
}
