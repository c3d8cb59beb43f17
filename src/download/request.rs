//! The immutable input to one engine invocation.

use std::path::{Path, PathBuf};

use super::checksum::ExpectedChecksum;
use crate::events::DownloadId;

/// One requested transfer.
///
/// Built by the caller and consumed by exactly one
/// [`Downloader::download`](super::Downloader::download) call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    id: DownloadId,
    url: String,
    destination: PathBuf,
    checksums: Vec<ExpectedChecksum>,
    verbose: bool,
}

impl DownloadRequest {
    /// Creates a request for `url` saved to `destination` (a file or directory).
    pub fn new(id: DownloadId, url: impl Into<String>, destination: impl Into<PathBuf>) -> Self {
        Self {
            id,
            url: url.into(),
            destination: destination.into(),
            checksums: Vec::new(),
            verbose: false,
        }
    }

    /// Adds a digest the finalized file must match.
    #[must_use]
    pub fn with_checksum(mut self, checksum: ExpectedChecksum) -> Self {
        self.checksums.push(checksum);
        self
    }

    /// Enables per-sample progress logging.
    #[must_use]
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Caller-assigned identifier used to route events.
    #[must_use]
    pub fn id(&self) -> DownloadId {
        self.id
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Destination file or directory.
    #[must_use]
    pub fn destination(&self) -> &Path {
        &self.destination
    }

    #[must_use]
    pub fn checksums(&self) -> &[ExpectedChecksum] {
        &self.checksums
    }

    #[must_use]
    pub fn verbose(&self) -> bool {
        self.verbose
    }
}
