//! Content digests for required input files.
//!
//! The digest is a pure function of file content: same bytes, same digest.
//! Hashing is behind the [`FileHasher`] trait so tests and alternative
//! pipelines can inject their own implementation.

use std::fs;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use thiserror::Error;

/// A discovered file vanished or was unreadable at resolution time.
#[derive(Debug, Error)]
#[error("Failed to read {path} for hashing: {source}")]
pub struct ReadError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// Capability computing a content digest for a file on disk.
pub trait FileHasher: Send + Sync {
    fn digest_file(&self, path: &Path) -> Result<String, ReadError>;
}

/// Default hasher: streaming SHA-256, hex-encoded.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Hasher;

impl FileHasher for Sha256Hasher {
    fn digest_file(&self, path: &Path) -> Result<String, ReadError> {
        let file = fs::File::open(path)
            .map_err(|source| ReadError { path: path.to_path_buf(), source })?;
        let mut reader = BufReader::new(file);
        let mut hasher = Sha256::new();
        let mut buf = [0u8; 8192];

        loop {
            let n = reader
                .read(&mut buf)
                .map_err(|source| ReadError { path: path.to_path_buf(), source })?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }

        Ok(format!("{:x}", hasher.finalize()))
    }
}

/// SHA-256 of a byte slice as a hex string.
pub fn sha256_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}
