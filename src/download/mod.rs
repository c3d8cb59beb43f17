//! HTTP download engine for streaming files to disk.
//!
//! A download is streamed chunk by chunk into a hidden staging file next to
//! its destination, then moved into place once the transfer has finished.
//! Readers of the destination path only ever see a complete file.
//!
//! # Features
//!
//! - Streaming downloads (memory use bounded by one chunk)
//! - Filename from `Content-Disposition`, the destination path, or the URL
//! - Connect timeout only; no read timeout
//! - Cancellation through a [`tokio_util::sync::CancellationToken`]
//! - Atomic rename with a copy fallback
//! - Optional MD5 / SHA-256 verification
//! - Structured error types with full context
//!
//! # Example
//!
//! ```no_run
//! use surge_core::download::{DownloadRequest, Downloader, HttpClient};
//! use surge_core::events::{DownloadId, pipeline};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let (events, _receiver) = pipeline(64);
//! let downloader = Downloader::new(HttpClient::new());
//! let request = DownloadRequest::new(DownloadId(1), "https://example.com/paper.pdf", "./downloads/");
//! let file = downloader
//!     .download(&CancellationToken::new(), &request, &events)
//!     .await?;
//! println!("Downloaded: {}", file.path.display());
//! # Ok(())
//! # }
//! ```

mod checksum;
mod client;
mod constants;
mod engine;
mod error;
mod filename;
mod finalize;
mod request;
mod stage;

pub use checksum::{
    ChecksumAlgorithm, ChecksumError, ExpectedChecksum, compute_checksum, verify_checksums,
};
pub use client::HttpClient;
pub use constants::{
    CHUNK_SIZE, CONNECT_TIMEOUT_SECS, DEFAULT_EVENT_BUFFER, PART_SUFFIX, PROGRESS_INTERVAL,
};
pub use engine::{DownloadedFile, Downloader, EngineOptions, names_directory};
pub use error::{DownloadError, FailureKind};
pub use finalize::{FileMover, FsMover};
pub use request::DownloadRequest;
