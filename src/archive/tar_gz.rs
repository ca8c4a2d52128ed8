//! Gzip-compressed tarball writer.

use std::io::Write;

use anyhow::{Context, Result};
use flate2::write::GzEncoder;
use flate2::Compression;
use tar::Builder;

use super::{ArchiveEntry, Packager};

#[derive(Debug, Default)]
pub struct TarGzPackager;

impl Packager for TarGzPackager {
    fn write_archive(&self, entries: &[ArchiveEntry], out: &mut dyn Write) -> Result<()> {
        let encoder = GzEncoder::new(out, Compression::default());
        let mut builder = Builder::new(encoder);
        builder.mode(tar::HeaderMode::Deterministic);

        for entry in entries {
            builder
                .append_path_with_name(&entry.path, &entry.name)
                .with_context(|| format!("failed to add {} to tarball", entry.path.display()))?;
        }

        builder
            .into_inner()
            .context("failed to finish tarball")?
            .finish()
            .context("failed to finish gzip stream")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use std::fs;
    use std::io::Read;
    use tar::Archive;
    use tempfile::TempDir;

    #[test]
    fn test_tarball_round_trip() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("A.php");
        fs::write(&file, "<?php class A {}").unwrap();
        let entries = vec![ArchiveEntry {
            name: "src/Foo/A.php".to_string(),
            path: file,
        }];

        let mut bytes = Vec::new();
        TarGzPackager.write_archive(&entries, &mut bytes).unwrap();

        let mut archive = Archive::new(GzDecoder::new(bytes.as_slice()));
        let mut found = Vec::new();
        for entry in archive.entries().unwrap() {
            let mut entry = entry.unwrap();
            let path = entry.path().unwrap().to_string_lossy().into_owned();
            let mut content = String::new();
            entry.read_to_string(&mut content).unwrap();
            found.push((path, content));
        }

        assert_eq!(
            found,
            vec![("src/Foo/A.php".to_string(), "<?php class A {}".to_string())]
        );
    }
}
