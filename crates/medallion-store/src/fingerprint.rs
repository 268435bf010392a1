//! File fingerprints used for change detection

#![allow(clippy::result_large_err)]

use crate::errors::{io_error, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::Path;

const CHUNK_SIZE: usize = 1024 * 1024;

/// (mtime, content hash, size) of a file at one point in time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileFingerprint {
    pub mtime_utc: String,
    pub sha256: String,
    pub size_bytes: u64,
}

impl FileFingerprint {
    /// Stat and hash a file
    pub fn of(path: &Path) -> Result<Self> {
        let meta = std::fs::metadata(path).map_err(|e| io_error("stat_source", e))?;
        let modified = meta.modified().map_err(|e| io_error("stat_source", e))?;
        let mtime: DateTime<Utc> = modified.into();
        Ok(Self {
            mtime_utc: mtime.to_rfc3339_opts(SecondsFormat::Micros, true),
            sha256: sha256_file(path)?,
            size_bytes: meta.len(),
        })
    }
}

/// Streaming SHA-256 of a file, read in 1 MiB chunks
pub fn sha256_file(path: &Path) -> Result<String> {
    let mut file = File::open(path).map_err(|e| io_error("hash_file", e))?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        let n = file.read(&mut buf).map_err(|e| io_error("hash_file", e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use medallion_core::digest::sha256_hex;
    use tempfile::TempDir;

    #[test]
    fn test_streaming_hash_matches_in_memory_hash() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("big.csv");
        let content: Vec<u8> = (0..(CHUNK_SIZE * 2 + 17)).map(|i| (i % 251) as u8).collect();
        std::fs::write(&path, &content).unwrap();

        assert_eq!(sha256_file(&path).unwrap(), sha256_hex(&content));
    }

    #[test]
    fn test_fingerprint_fields() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.csv");
        std::fs::write(&path, b"id\n1\n").unwrap();

        let fp = FileFingerprint::of(&path).unwrap();
        assert_eq!(fp.size_bytes, 5);
        assert_eq!(fp.sha256.len(), 64);
        assert!(fp.mtime_utc.ends_with('Z'));
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let err = FileFingerprint::of(&dir.path().join("nope.csv")).unwrap_err();
        assert_eq!(err.io_kind(), Some(std::io::ErrorKind::NotFound));
    }
}
