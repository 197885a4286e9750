//! Fingerprint service
//!
//! Streams a file through SHA-256 and returns the hex digest. Fingerprints
//! are computed fresh for every upload attempt cycle and never cached, so a
//! file edited between runs is always detected.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::io::AsyncReadExt;
use tracing::{debug, instrument};

use vaultpush_core::domain::{DomainError, Fingerprint};

/// Read buffer size for hashing.
const CHUNK_SIZE: usize = 64 * 1024;

/// Errors raised while fingerprinting a file
#[derive(Debug, Error)]
pub enum FingerprintError {
    /// The file could not be opened or read
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The computed digest was not a valid fingerprint
    #[error("invalid digest for {path}: {source}")]
    Digest {
        path: PathBuf,
        #[source]
        source: DomainError,
    },
}

impl FingerprintError {
    /// Path of the file that could not be fingerprinted
    pub fn path(&self) -> &Path {
        match self {
            FingerprintError::Io { path, .. } | FingerprintError::Digest { path, .. } => path,
        }
    }
}

/// Fingerprint of a file plus the number of bytes hashed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDigest {
    pub fingerprint: Fingerprint,
    pub size: u64,
}

/// Computes the fingerprint of the file at `path`
///
/// Reads the whole file. Same bytes always yield the same fingerprint.
pub async fn fingerprint(path: &Path) -> Result<Fingerprint, FingerprintError> {
    digest_file(path).await.map(|d| d.fingerprint)
}

/// Computes the fingerprint and size of the file at `path`
#[instrument(skip_all, fields(path = %path.display()))]
pub async fn digest_file(path: &Path) -> Result<FileDigest, FingerprintError> {
    let io_err = |source| FingerprintError::Io {
        path: path.to_path_buf(),
        source,
    };

    let mut file = tokio::fs::File::open(path).await.map_err(io_err)?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut size = 0u64;

    loop {
        let n = file.read(&mut buf).await.map_err(io_err)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        size += n as u64;
    }

    let fingerprint =
        Fingerprint::new(format!("{:x}", hasher.finalize())).map_err(|source| {
            FingerprintError::Digest {
                path: path.to_path_buf(),
                source,
            }
        })?;

    debug!(size, fingerprint = %fingerprint, "Fingerprint computed");
    Ok(FileDigest { fingerprint, size })
}
