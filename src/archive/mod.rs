//! Packaging an output directory into a single distributable file.

pub mod phar;
pub mod tar_gz;

use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tempfile::NamedTempFile;
use walkdir::WalkDir;

use crate::util::fs::{ensure_dir, relative_path, remove_file_if_exists};

pub use phar::PharPackager;
pub use tar_gz::TarGzPackager;

/// A file to store in an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Path inside the archive, `/`-separated
    pub name: String,
    /// File on disk holding the contents
    pub path: PathBuf,
}

/// Writes a set of entries in one archive format.
pub trait Packager {
    fn write_archive(&self, entries: &[ArchiveEntry], out: &mut dyn Write) -> Result<()>;
}

/// Archive format, chosen by the destination's extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Phar,
    TarGz,
}

impl ArchiveFormat {
    /// `.tar.gz` and `.tgz` select a gzip tarball; anything else is a phar.
    pub fn from_path(path: &Path) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            ArchiveFormat::TarGz
        } else {
            ArchiveFormat::Phar
        }
    }

    pub fn packager(&self) -> Box<dyn Packager> {
        match self {
            ArchiveFormat::Phar => Box::new(PharPackager::default()),
            ArchiveFormat::TarGz => Box::new(TarGzPackager::default()),
        }
    }
}

/// List the regular files under `dir` in a stable order.
pub fn collect_entries(dir: &Path) -> Result<Vec<ArchiveEntry>> {
    let mut entries = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.with_context(|| format!("failed to walk {}", dir.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = relative_path(dir, entry.path());
        let name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        entries.push(ArchiveEntry {
            name,
            path: entry.into_path(),
        });
    }
    Ok(entries)
}

/// Package `dir` into `dest`, replacing any existing file there.
///
/// The archive is written to a temporary file next to `dest` and only
/// moved into place once complete.
pub fn package_dir(dir: &Path, dest: &Path) -> Result<()> {
    let format = ArchiveFormat::from_path(dest);
    let entries = collect_entries(dir)?;
    tracing::debug!("packaging {} files as {:?}", entries.len(), format);

    remove_file_if_exists(dest)?;
    let parent = match dest.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    ensure_dir(parent)?;

    let mut tmp = NamedTempFile::new_in(parent)
        .with_context(|| format!("failed to create temporary file in {}", parent.display()))?;
    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        format.packager().write_archive(&entries, &mut writer)?;
        writer
            .flush()
            .with_context(|| format!("failed to write archive {}", dest.display()))?;
    }
    tmp.persist(dest)
        .map_err(|e| e.error)
        .with_context(|| format!("failed to move archive into place: {}", dest.display()))?;
    Ok(())
}
