//! Phar writer.
//!
//! Layout: stub, manifest, file contents, signature. All integers are
//! little-endian u32 except the two-byte API version.

use std::fs;
use std::io::Write;
use std::time::UNIX_EPOCH;

use anyhow::{Context, Result};
use flate2::Crc;
use sha2::{Digest, Sha256};

use super::{ArchiveEntry, Packager};

/// Loader stub; the archive data starts right after it.
pub const STUB: &[u8] = b"<?php __HALT_COMPILER(); ?>\r\n";

/// Manifest API version 1.1.1.
const API_VERSION: [u8; 2] = [0x11, 0x10];
/// Global flag: the archive carries a signature.
const FLAG_SIGNED: u32 = 0x0001_0000;
const SIGNATURE_SHA256: u32 = 0x0003;
const SIGNATURE_MAGIC: &[u8; 4] = b"GBMB";
const FILE_PERMISSIONS: u32 = 0o644;

/// Writes uncompressed, SHA-256 signed phar archives.
#[derive(Debug, Default)]
pub struct PharPackager;

impl Packager for PharPackager {
    fn write_archive(&self, entries: &[ArchiveEntry], out: &mut dyn Write) -> Result<()> {
        let mut manifest = Vec::new();
        let mut contents = Vec::new();

        put_u32(&mut manifest, to_u32(entries.len(), "file count")?);
        manifest.extend_from_slice(&API_VERSION);
        put_u32(&mut manifest, FLAG_SIGNED);
        put_u32(&mut manifest, 0); // alias
        put_u32(&mut manifest, 0); // metadata

        for entry in entries {
            let data = fs::read(&entry.path)
                .with_context(|| format!("failed to read {}", entry.path.display()))?;
            let size = to_u32(data.len(), &entry.name)?;
            let mut crc = Crc::new();
            crc.update(&data);

            put_u32(&mut manifest, to_u32(entry.name.len(), &entry.name)?);
            manifest.extend_from_slice(entry.name.as_bytes());
            put_u32(&mut manifest, size);
            put_u32(&mut manifest, modified_time(entry));
            put_u32(&mut manifest, size);
            put_u32(&mut manifest, crc.sum());
            put_u32(&mut manifest, FILE_PERMISSIONS);
            put_u32(&mut manifest, 0); // metadata

            contents.extend_from_slice(&data);
        }

        let mut archive = Vec::with_capacity(STUB.len() + 4 + manifest.len() + contents.len() + 40);
        archive.extend_from_slice(STUB);
        put_u32(&mut archive, to_u32(manifest.len(), "manifest")?);
        archive.extend_from_slice(&manifest);
        archive.extend_from_slice(&contents);

        let signature = Sha256::digest(&archive);
        archive.extend_from_slice(&signature);
        put_u32(&mut archive, SIGNATURE_SHA256);
        archive.extend_from_slice(SIGNATURE_MAGIC);

        out.write_all(&archive).context("failed to write phar")?;
        Ok(())
    }
}

fn put_u32(buf: &mut Vec<u8>, value: u32) {
    buf.extend_from_slice(&value.to_le_bytes());
}

fn to_u32(value: usize, what: &str) -> Result<u32> {
    u32::try_from(value).with_context(|| format!("{} is too large for a phar archive", what))
}

fn modified_time(entry: &ArchiveEntry) -> u32 {
    fs::metadata(&entry.path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .and_then(|d| u32::try_from(d.as_secs()).ok())
        .unwrap_or(0)
}
