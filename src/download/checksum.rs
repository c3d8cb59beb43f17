//! Post-transfer digest verification.
//!
//! Verification runs over the finalized file. A mismatch is reported as
//! [`DownloadError::ChecksumMismatch`] but the file is left in place so the
//! caller can decide what to do with it.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use md5::Md5;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use tracing::debug;

use super::error::DownloadError;

/// Read buffer used while hashing (64 KiB).
const HASH_BUFFER_SIZE: usize = 64 * 1024;

/// Supported digest algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumAlgorithm {
    /// MD5 (128-bit).
    Md5,
    /// SHA-256.
    Sha256,
}

impl ChecksumAlgorithm {
    /// Returns the lowercase algorithm name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Md5 => "md5",
            Self::Sha256 => "sha256",
        }
    }

    /// Length of the hex encoded digest.
    #[must_use]
    pub fn hex_len(self) -> usize {
        match self {
            Self::Md5 => 32,
            Self::Sha256 => 64,
        }
    }
}

impl fmt::Display for ChecksumAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChecksumAlgorithm {
    type Err = ChecksumError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.trim().to_ascii_lowercase().replace('-', "").as_str() {
            "md5" => Ok(Self::Md5),
            "sha256" => Ok(Self::Sha256),
            _ => Err(ChecksumError::UnsupportedAlgorithm {
                name: name.to_string(),
            }),
        }
    }
}

/// Errors raised while building an expected checksum.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChecksumError {
    /// The algorithm name is not one of `md5` or `sha256`.
    #[error("unsupported checksum algorithm: {name}")]
    UnsupportedAlgorithm {
        /// Name as given.
        name: String,
    },

    /// The digest is not hex of the right length for its algorithm.
    #[error("invalid {algorithm} digest {digest:?}: expected {expected_len} hex characters")]
    InvalidDigest {
        /// Algorithm the digest was given for.
        algorithm: ChecksumAlgorithm,
        /// Digest as given.
        digest: String,
        /// Required hex length.
        expected_len: usize,
    },
}

/// A digest the downloaded file must match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectedChecksum {
    /// Algorithm to compute.
    pub algorithm: ChecksumAlgorithm,
    /// Lowercase hex digest.
    pub value: String,
}

impl ExpectedChecksum {
    /// Builds an expected checksum from an algorithm name and hex digest.
    ///
    /// # Errors
    ///
    /// Returns [`ChecksumError`] for unknown algorithms or malformed digests.
    pub fn new(algorithm: &str, digest: &str) -> Result<Self, ChecksumError> {
        Self::with_algorithm(algorithm.parse()?, digest)
    }

    /// Builds an expected checksum for a known algorithm.
    ///
    /// # Errors
    ///
    /// Returns [`ChecksumError::InvalidDigest`] when `digest` is not hex of
    /// the algorithm's length.
    pub fn with_algorithm(algorithm: ChecksumAlgorithm, digest: &str) -> Result<Self, ChecksumError> {
        let value = digest.trim().to_ascii_lowercase();
        if value.len() != algorithm.hex_len() || !value.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ChecksumError::InvalidDigest {
                algorithm,
                digest: digest.to_string(),
                expected_len: algorithm.hex_len(),
            });
        }
        Ok(Self { algorithm, value })
    }
}

/// Computes the hex digest of a file.
///
/// # Errors
///
/// Returns [`DownloadError::Io`] if the file cannot be read.
pub async fn compute_checksum(
    path: &Path,
    algorithm: ChecksumAlgorithm,
) -> Result<String, DownloadError> {
    match algorithm {
        ChecksumAlgorithm::Md5 => hash_file::<Md5>(path).await,
        ChecksumAlgorithm::Sha256 => hash_file::<Sha256>(path).await,
    }
}

async fn hash_file<D: Digest>(path: &Path) -> Result<String, DownloadError> {
    let mut file = File::open(path)
        .await
        .map_err(|e| DownloadError::io(path, e))?;
    let mut hasher = D::new();
    let mut buffer = vec![0u8; HASH_BUFFER_SIZE];
    loop {
        let n = file
            .read(&mut buffer)
            .await
            .map_err(|e| DownloadError::io(path, e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Verifies a file against every expected checksum, in order.
///
/// # Errors
///
/// Returns [`DownloadError::ChecksumMismatch`] on the first mismatch, or
/// [`DownloadError::Io`] if the file cannot be read.
pub async fn verify_checksums(
    path: &Path,
    expected: &[ExpectedChecksum],
) -> Result<(), DownloadError> {
    for checksum in expected {
        let actual = compute_checksum(path, checksum.algorithm).await?;
        if !actual.eq_ignore_ascii_case(&checksum.value) {
            return Err(DownloadError::checksum_mismatch(
                path,
                checksum.algorithm,
                checksum.value.clone(),
                actual,
            ));
        }
        debug!(algorithm = %checksum.algorithm, path = %path.display(), "checksum verified");
    }
    Ok(())
}
