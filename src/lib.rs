//! Surge Core Library
//!
//! This library provides the download engine behind the `surge` tool: it
//! streams a resource over HTTP(S) into a staged file, atomically moves it
//! into place, and reports every step as a typed lifecycle event.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`download`] - HTTP download engine with staged writes and atomic finalize
//! - [`events`] - Lifecycle events and the bounded event pipeline
//! - [`progress`] - Per-download progress state and display renderers
//! - [`run`] - Run owner that drives concurrent downloads into one pipeline

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod download;
pub mod events;
pub mod progress;
pub mod run;
#[cfg(test)]
pub mod test_support;
pub(crate) mod user_agent;

// Re-export commonly used types
pub use download::{
    ChecksumAlgorithm, ChecksumError, DownloadError, DownloadRequest, DownloadedFile, Downloader,
    EngineOptions, ExpectedChecksum, FailureKind, FileMover, FsMover, HttpClient,
};
pub use events::{
    DownloadId, EventReceiver, EventSender, EventSink, LifecycleEvent, pipeline, spawn_consumer,
};
pub use progress::{
    CardState, DownloadCard, JsonLinesRenderer, ProgressModel, TerminalRenderer, TextRenderer,
    format_progress_line,
};
pub use run::{DownloadRun, RunOutcome};
