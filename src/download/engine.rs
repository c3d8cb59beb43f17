//! Download engine: one transfer, end to end.
//!
//! The [`Downloader`] performs a single transfer per [`Downloader::download`]
//! call and may be shared by any number of concurrent calls. Each call:
//!
//! 1. validates the URL (before any network or filesystem action);
//! 2. sends a GET bound to the caller's cancellation token;
//! 3. rejects any status other than 200/206 without reading the body;
//! 4. resolves the destination filename;
//! 5. stages bytes in `<name>.part.<random>` next to the destination;
//! 6. streams the body in fixed-size chunks, checking cancellation before
//!    every read and sampling progress at most every 200 ms;
//! 7. flushes and syncs the staging file, then closes it;
//! 8. moves it into place (atomic rename, copy fallback);
//! 9. verifies requested digests over the finalized file.
//!
//! Every path other than full success removes the staging file and leaves
//! the destination untouched. The one exception is a digest mismatch: the
//! file stays in place and the failure is reported.
//!
//! # Example
//!
//! ```no_run
//! use surge_core::download::{DownloadRequest, Downloader, HttpClient};
//! use surge_core::events::{DownloadId, pipeline, spawn_consumer};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let (events, receiver) = pipeline(64);
//! let consumer = spawn_consumer(receiver, Vec::new());
//!
//! let downloader = Downloader::new(HttpClient::new());
//! let request = DownloadRequest::new(DownloadId(1), "https://example.com/a.bin", "downloads/");
//! let file = downloader
//!     .download(&CancellationToken::new(), &request, &events)
//!     .await?;
//! println!("saved {} bytes to {}", file.bytes_written, file.path.display());
//!
//! drop(events);
//! let seen = consumer.await?;
//! assert!(seen.last().is_some_and(|e| e.is_terminal()));
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use futures_util::TryStreamExt;
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_LENGTH};
use tokio::io::AsyncReadExt;
use tokio::time::Instant;
use tokio_util::io::StreamReader;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, trace, warn};
use url::Url;

use super::checksum::verify_checksums;
use super::client::HttpClient;
use super::constants::{CHUNK_SIZE, PROGRESS_INTERVAL};
use super::error::DownloadError;
use super::filename::{final_destination, resolve_filename, staging_dir};
use super::finalize::{FileMover, FsMover, finalize};
use super::request::DownloadRequest;
use super::stage::StagedFile;
use crate::events::{DownloadId, EventSender, LifecycleEvent};

/// Tunables for the streaming loop. Neither affects correctness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    /// Bytes requested per read from the response body.
    pub chunk_size: usize,
    /// Minimum spacing between `Progress` events of one download.
    pub progress_interval: Duration,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            chunk_size: CHUNK_SIZE,
            progress_interval: PROGRESS_INTERVAL,
        }
    }
}

/// A finished transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedFile {
    /// Final destination path.
    pub path: PathBuf,
    /// Size of the file in bytes.
    pub bytes_written: u64,
}

/// Per-invocation mutable state. Never shared across invocations.
#[derive(Debug)]
struct TransferState {
    staged: StagedFile,
    filename: String,
    bytes_written: u64,
    total_bytes: Option<u64>,
    started: Instant,
    last_report: Instant,
}

impl TransferState {
    fn new(staged: StagedFile, filename: String, total_bytes: Option<u64>) -> Self {
        let now = Instant::now();
        Self {
            staged,
            filename,
            bytes_written: 0,
            total_bytes,
            started: now,
            last_report: now,
        }
    }

    fn progress_due(&self, now: Instant, interval: Duration) -> bool {
        now.duration_since(self.last_report) > interval
    }

    fn progress_event(&mut self, id: DownloadId, now: Instant) -> LifecycleEvent {
        self.last_report = now;
        LifecycleEvent::Progress {
            id,
            bytes_written: self.bytes_written,
            total_bytes: self.total_bytes,
            elapsed: now.duration_since(self.started),
        }
    }
}

/// Streams HTTP resources to disk, one transfer per call.
#[derive(Debug, Clone)]
pub struct Downloader {
    client: HttpClient,
    mover: Arc<dyn FileMover>,
    options: EngineOptions,
}

impl Downloader {
    /// Creates a downloader over a shared HTTP client.
    #[must_use]
    pub fn new(client: HttpClient) -> Self {
        Self {
            client,
            mover: Arc::new(FsMover),
            options: EngineOptions::default(),
        }
    }

    /// Overrides the streaming tunables.
    #[must_use]
    pub fn with_options(mut self, options: EngineOptions) -> Self {
        self.options = EngineOptions {
            chunk_size: options.chunk_size.max(1),
            ..options
        };
        self
    }

    /// Overrides the file operations used to finalize downloads.
    #[must_use]
    pub fn with_mover(mut self, mover: Arc<dyn FileMover>) -> Self {
        self.mover = mover;
        self
    }

    #[must_use]
    pub fn options(&self) -> EngineOptions {
        self.options
    }

    /// Performs one download and reports it on `events`.
    ///
    /// Emits `Started`, zero or more `Progress`, then exactly one of
    /// `Completed` or `Failed`.
    ///
    /// # Errors
    ///
    /// Returns the [`DownloadError`] that ended the transfer; the same error
    /// is mirrored into the `Failed` event.
    #[instrument(skip_all, fields(id = %request.id(), url = %request.url()))]
    pub async fn download(
        &self,
        cancel: &CancellationToken,
        request: &DownloadRequest,
        events: &EventSender,
    ) -> Result<DownloadedFile, DownloadError> {
        let id = request.id();
        events
            .send(LifecycleEvent::Started {
                id,
                url: request.url().to_string(),
            })
            .await;

        match self.transfer(cancel, request, events).await {
            Ok(file) => {
                info!(path = %file.path.display(), bytes = file.bytes_written, "download complete");
                events
                    .send(LifecycleEvent::Completed {
                        id,
                        path: file.path.clone(),
                        bytes_written: file.bytes_written,
                    })
                    .await;
                Ok(file)
            }
            Err(error) => {
                warn!(kind = %error.kind(), error = %error, "download failed");
                events
                    .send(LifecycleEvent::Failed {
                        id,
                        kind: error.kind(),
                        error: error.to_string(),
                    })
                    .await;
                Err(error)
            }
        }
    }

    async fn transfer(
        &self,
        cancel: &CancellationToken,
        request: &DownloadRequest,
        events: &EventSender,
    ) -> Result<DownloadedFile, DownloadError> {
        let url = parse_url(request.url())?;

        let destination = request.destination();
        let mut destination_is_dir = tokio::fs::metadata(destination)
            .await
            .is_ok_and(|meta| meta.is_dir());
        // A trailing separator names a directory; create it before any I/O
        // on the network so an unusable destination fails fast.
        if !destination_is_dir && names_directory(destination) {
            tokio::fs::create_dir_all(destination)
                .await
                .map_err(|e| DownloadError::io(destination, e))?;
            debug!(dir = %destination.display(), "created destination directory");
            destination_is_dir = true;
        }

        let response = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(DownloadError::cancelled(url.as_str())),
            response = self.client.get(&url) => response?,
        };

        let content_disposition = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok());
        let filename = resolve_filename(content_disposition, destination, destination_is_dir, &url)
            .ok_or_else(|| DownloadError::unresolvable_filename(destination))?;
        let final_path = final_destination(destination, destination_is_dir, &filename);
        let total_bytes = response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());
        debug!(
            filename = %filename,
            path = %final_path.display(),
            total_bytes = ?total_bytes,
            "resolved destination"
        );

        let staged = StagedFile::create(&staging_dir(destination, destination_is_dir), &filename)?;
        let mut state = TransferState::new(staged, filename, total_bytes);

        let body = response.bytes_stream().map_err(std::io::Error::other);
        let mut reader = StreamReader::new(body);
        self.stream_body(cancel, request, events, &url, &mut reader, &mut state)
            .await?;

        let TransferState {
            staged,
            filename,
            bytes_written,
            ..
        } = state;
        trace!(staged = %staged.path().display(), "sealing staging file");
        let sealed = staged.seal().await?;
        finalize(self.mover.as_ref(), sealed, &final_path).await?;
        debug!(filename = %filename, path = %final_path.display(), "file in place");

        if !request.checksums().is_empty() {
            verify_checksums(&final_path, request.checksums()).await?;
        }

        Ok(DownloadedFile {
            path: final_path,
            bytes_written,
        })
    }

    async fn stream_body<R>(
        &self,
        cancel: &CancellationToken,
        request: &DownloadRequest,
        events: &EventSender,
        url: &Url,
        reader: &mut R,
        state: &mut TransferState,
    ) -> Result<(), DownloadError>
    where
        R: tokio::io::AsyncRead + Unpin,
    {
        let mut buf = vec![0u8; self.options.chunk_size];
        loop {
            // Never start a read once cancellation has been requested.
            if cancel.is_cancelled() {
                return Err(DownloadError::cancelled(url.as_str()));
            }
            let n = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(DownloadError::cancelled(url.as_str())),
                read = reader.read(&mut buf) => read.map_err(|e| DownloadError::stream(url.as_str(), e))?,
            };

            if n > 0 {
                state.staged.write_chunk(&buf[..n]).await?;
                state.bytes_written += n as u64;
            }

            let end_of_stream = n == 0;
            let now = Instant::now();
            if end_of_stream || state.progress_due(now, self.options.progress_interval) {
                let event = state.progress_event(request.id(), now);
                if request.verbose() {
                    info!(bytes = state.bytes_written, total = ?state.total_bytes, "progress");
                } else {
                    trace!(bytes = state.bytes_written, total = ?state.total_bytes, "progress");
                }
                events.send(event).await;
            }

            if end_of_stream {
                return Ok(());
            }
        }
    }
}

/// Parses and validates a download URL.
fn parse_url(raw: &str) -> Result<Url, DownloadError> {
    let url = Url::parse(raw).map_err(|e| DownloadError::invalid_url(raw, e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(DownloadError::invalid_url(
            raw,
            format!("unsupported scheme {other:?} (use http:// or https://)"),
        )),
    }
}

/// Whether a destination names a directory.
///
/// A destination written with a trailing separator names a directory even
/// when it does not exist yet; the engine creates it before requesting.
#[must_use]
pub fn names_directory(destination: &Path) -> bool {
    destination
        .as_os_str()
        .to_str()
        .is_some_and(|s| s.ends_with('/') || s.ends_with(std::path::MAIN_SEPARATOR))
}
