//! Error types for the download module.
//!
//! Every variant is terminal for a single download invocation. Nothing is
//! retried internally; a caller that wants retries re-invokes the engine
//! with the same request.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::checksum::ChecksumAlgorithm;

/// Errors that can occur during a single download.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// The URL is malformed or has no scheme. Raised before any I/O.
    #[error("invalid URL {url}: {reason}")]
    InvalidUrl {
        /// The URL as given by the caller.
        url: String,
        /// Why the URL was rejected.
        reason: String,
    },

    /// Transport-level failure while constructing or sending the request.
    #[error("request to {url} failed: {source}")]
    Request {
        /// The URL that was requested.
        url: String,
        /// The underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a status other than 200 or 206.
    #[error("bad status code: {status} from {url}")]
    BadStatus {
        /// The URL that returned the status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// Reading the response body failed.
    #[error("error reading response body from {url}: {source}")]
    Stream {
        /// The URL being streamed.
        url: String,
        /// The underlying read error.
        #[source]
        source: std::io::Error,
    },

    /// File system error (create, write, flush, sync, remove).
    #[error("IO error on {path}: {source}")]
    Io {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Fewer bytes reached the staging file than were read from the network.
    #[error("short write to {path}: persisted {written} of {expected} bytes")]
    ShortWrite {
        /// The staging file path.
        path: PathBuf,
        /// Bytes read from the network for this chunk.
        expected: usize,
        /// Bytes actually persisted before the writer stalled.
        written: usize,
    },

    /// No usable destination filename could be derived.
    #[error("could not determine filename to save in {destination}")]
    UnresolvableFilename {
        /// The destination the caller asked for.
        destination: PathBuf,
    },

    /// The finalized file does not match the expected digest.
    #[error("{algorithm} checksum mismatch for {path}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// The finalized file (left in place).
        path: PathBuf,
        /// Algorithm used for verification.
        algorithm: ChecksumAlgorithm,
        /// Expected hex digest.
        expected: String,
        /// Computed hex digest.
        actual: String,
    },

    /// Cancellation was observed before the transfer finished.
    #[error("download of {url} cancelled")]
    Cancelled {
        /// The URL whose transfer was cancelled.
        url: String,
    },

    /// Moving the staged file into place failed after the copy fallback.
    #[error("rename failed: {from} -> {to}: {source}")]
    RenameFailed {
        /// Source of the rename.
        from: PathBuf,
        /// Destination of the rename.
        to: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The atomic rename failed and the copy fallback failed too.
    #[error("rename to {to} failed ({rename_error}) and fallback copy failed: {source}")]
    FallbackCopyFailed {
        /// Destination path.
        to: PathBuf,
        /// Display form of the original rename failure.
        rename_error: String,
        /// The copy failure.
        #[source]
        source: std::io::Error,
    },
}

/// Classification carried on `Failed` events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Malformed URL or missing scheme.
    InvalidUrl,
    /// Transport failure sending the request.
    Request,
    /// Unexpected HTTP status.
    BadStatus,
    /// Socket or file I/O failure.
    Io,
    /// Partial chunk write.
    ShortWrite,
    /// No destination filename.
    UnresolvableFilename,
    /// Digest verification failed.
    ChecksumMismatch,
    /// Cancelled mid-transfer.
    Cancelled,
    /// Final move into place failed.
    RenameFailed,
    /// Cross-volume copy fallback failed.
    FallbackCopyFailed,
}

impl FailureKind {
    /// Returns the stable lowercase label for this kind.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidUrl => "invalid_url",
            Self::Request => "request",
            Self::BadStatus => "bad_status",
            Self::Io => "io",
            Self::ShortWrite => "short_write",
            Self::UnresolvableFilename => "unresolvable_filename",
            Self::ChecksumMismatch => "checksum_mismatch",
            Self::Cancelled => "cancelled",
            Self::RenameFailed => "rename_failed",
            Self::FallbackCopyFailed => "fallback_copy_failed",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl DownloadError {
    /// Returns the classification of this error.
    #[must_use]
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::InvalidUrl { .. } => FailureKind::InvalidUrl,
            Self::Request { .. } => FailureKind::Request,
            Self::BadStatus { .. } => FailureKind::BadStatus,
            Self::Stream { .. } | Self::Io { .. } => FailureKind::Io,
            Self::ShortWrite { .. } => FailureKind::ShortWrite,
            Self::UnresolvableFilename { .. } => FailureKind::UnresolvableFilename,
            Self::ChecksumMismatch { .. } => FailureKind::ChecksumMismatch,
            Self::Cancelled { .. } => FailureKind::Cancelled,
            Self::RenameFailed { .. } => FailureKind::RenameFailed,
            Self::FallbackCopyFailed { .. } => FailureKind::FallbackCopyFailed,
        }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Creates a request error from a reqwest error.
    pub fn request(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Request {
            url: url.into(),
            source,
        }
    }

    /// Creates a bad status error.
    pub fn bad_status(url: impl Into<String>, status: u16) -> Self {
        Self::BadStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates a body read error.
    pub fn stream(url: impl Into<String>, source: std::io::Error) -> Self {
        Self::Stream {
            url: url.into(),
            source,
        }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates a short write error.
    pub fn short_write(path: impl Into<PathBuf>, expected: usize, written: usize) -> Self {
        Self::ShortWrite {
            path: path.into(),
            expected,
            written,
        }
    }

    /// Creates an unresolvable filename error.
    pub fn unresolvable_filename(destination: impl Into<PathBuf>) -> Self {
        Self::UnresolvableFilename {
            destination: destination.into(),
        }
    }

    /// Creates a checksum mismatch error.
    pub fn checksum_mismatch(
        path: impl Into<PathBuf>,
        algorithm: ChecksumAlgorithm,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::ChecksumMismatch {
            path: path.into(),
            algorithm,
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Creates a cancellation error.
    pub fn cancelled(url: impl Into<String>) -> Self {
        Self::Cancelled { url: url.into() }
    }

    /// Creates a rename error.
    pub fn rename_failed(
        from: impl Into<PathBuf>,
        to: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Self::RenameFailed {
            from: from.into(),
            to: to.into(),
            source,
        }
    }

    /// Creates a fallback copy error.
    pub fn fallback_copy_failed(
        to: impl Into<PathBuf>,
        rename_error: &std::io::Error,
        source: std::io::Error,
    ) -> Self {
        Self::FallbackCopyFailed {
            to: to.into(),
            rename_error: rename_error.to_string(),
            source,
        }
    }
}

// No `From<reqwest::Error>` / `From<std::io::Error>`: every variant needs a
// URL or path that the source error does not carry.
