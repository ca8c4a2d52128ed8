//! Filesystem utilities.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use walkdir::WalkDir;

/// Extension of the source files picked up from a source root.
pub const SOURCE_EXTENSION: &str = "php";

/// Recursively copy a directory.
///
/// Symbolic links are rejected rather than followed or recreated.
pub fn copy_dir_all(src: &Path, dst: &Path) -> Result<()> {
    fs::create_dir_all(dst)
        .with_context(|| format!("failed to create directory: {}", dst.display()))?;

    for entry in fs::read_dir(src)
        .with_context(|| format!("failed to read directory: {}", src.display()))?
    {
        let entry = entry?;
        let ty = entry.file_type()?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if ty.is_symlink() {
            bail!("refusing to copy symbolic link: {}", src_path.display());
        } else if ty.is_dir() {
            copy_dir_all(&src_path, &dst_path)?;
        } else {
            copy_file(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

/// Copy a file or a directory tree to `dst`.
pub fn copy_path(src: &Path, dst: &Path) -> Result<()> {
    let meta = fs::symlink_metadata(src)
        .with_context(|| format!("failed to stat input: {}", src.display()))?;
    let ty = meta.file_type();

    if ty.is_dir() {
        copy_dir_all(src, dst)
    } else if ty.is_file() {
        if let Some(parent) = dst.parent() {
            ensure_dir(parent)?;
        }
        copy_file(src, dst)
    } else {
        bail!(
            "input {} is neither a regular file nor a directory",
            src.display()
        )
    }
}

fn copy_file(src: &Path, dst: &Path) -> Result<()> {
    fs::copy(src, dst)
        .with_context(|| format!("failed to copy {} to {}", src.display(), dst.display()))?;
    Ok(())
}

/// Remove a directory and all its contents, if it exists.
pub fn remove_dir_all_if_exists(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_dir_all(path)
            .with_context(|| format!("failed to remove directory: {}", path.display()))?;
    }
    Ok(())
}

/// Remove a file, if it exists.
pub fn remove_file_if_exists(path: &Path) -> Result<()> {
    if path.is_file() {
        fs::remove_file(path)
            .with_context(|| format!("failed to remove file: {}", path.display()))?;
    }
    Ok(())
}

/// Ensure a directory exists, creating it if necessary.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)
            .with_context(|| format!("failed to create directory: {}", path.display()))?;
    }
    Ok(())
}

/// Read a file to string, with nice error messages.
pub fn read_to_string(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read file: {}", path.display()))
}

/// Write a string to a file, creating parent directories if needed.
pub fn write_string(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    fs::write(path, contents).with_context(|| format!("failed to write file: {}", path.display()))
}

/// List the source files under a source root.
///
/// A root that is itself a file is returned as is. Directories are walked
/// recursively in file-name order.
pub fn collect_sources(root: &Path) -> Result<Vec<PathBuf>> {
    if root.is_file() {
        return Ok(vec![root.to_path_buf()]);
    }
    if !root.is_dir() {
        bail!("source root does not exist: {}", root.display());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry =
            entry.with_context(|| format!("failed to walk source root: {}", root.display()))?;
        let is_source = entry
            .path()
            .extension()
            .is_some_and(|ext| ext == SOURCE_EXTENSION);
        if entry.file_type().is_file() && is_source {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Canonicalize a path, but don't fail if it doesn't exist yet.
/// Returns the path as-is if canonicalization fails.
pub fn normalize_path(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

/// Get the relative path from `base` to `path`.
pub fn relative_path(base: &Path, path: &Path) -> PathBuf {
    pathdiff::diff_paths(path, base).unwrap_or_else(|| path.to_path_buf())
}

/// Check if a path is inside another path, component-wise.
pub fn is_inside(path: &Path, parent: &Path) -> bool {
    path.starts_with(parent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_collect_sources() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src");
        fs::create_dir_all(src.join("b")).unwrap();
        fs::write(src.join("b/Two.php"), "<?php").unwrap();
        fs::write(src.join("One.php"), "<?php").unwrap();
        fs::write(src.join("readme.txt"), "readme").unwrap();

        let files = collect_sources(&src).unwrap();
        let names: Vec<_> = files.iter().map(|f| relative_path(&src, f)).collect();
        assert_eq!(names, vec![PathBuf::from("One.php"), PathBuf::from("b/Two.php")]);

        let single = collect_sources(&src.join("One.php")).unwrap();
        assert_eq!(single, vec![src.join("One.php")]);

        assert!(collect_sources(&tmp.path().join("missing")).is_err());
    }

    #[test]
    fn test_copy_dir_all() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src");
        let dst = tmp.path().join("dst");

        fs::create_dir_all(src.join("nested")).unwrap();
        fs::write(src.join("file.txt"), "content").unwrap();
        fs::write(src.join("nested/inner.txt"), "inner").unwrap();

        copy_dir_all(&src, &dst).unwrap();

        assert_eq!(fs::read_to_string(dst.join("file.txt")).unwrap(), "content");
        assert_eq!(
            fs::read_to_string(dst.join("nested/inner.txt")).unwrap(),
            "inner"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_copy_dir_all_rejects_symlinks() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src");
        fs::create_dir_all(&src).unwrap();
        fs::write(tmp.path().join("target.txt"), "x").unwrap();
        std::os::unix::fs::symlink(tmp.path().join("target.txt"), src.join("link.txt")).unwrap();

        let err = copy_dir_all(&src, &tmp.path().join("dst")).unwrap_err();
        assert!(err.to_string().contains("symbolic link"));
    }

    #[test]
    fn test_copy_path_file_creates_parents() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("plugin.yml");
        fs::write(&src, "name: Demo").unwrap();

        let dst = tmp.path().join("out/deep/plugin.yml");
        copy_path(&src, &dst).unwrap();
        assert_eq!(fs::read_to_string(dst).unwrap(), "name: Demo");
    }

    #[test]
    fn test_is_inside_is_component_wise() {
        assert!(is_inside(Path::new("/a/lib/x.php"), Path::new("/a/lib")));
        assert!(!is_inside(Path::new("/a/library/x.php"), Path::new("/a/lib")));
    }
}
