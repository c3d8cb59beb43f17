//! Per-download display state and the renderers that draw it.
//!
//! [`ProgressModel`] folds lifecycle events into one [`DownloadCard`] per
//! download id (`Pending -> Downloading -> Completed | Failed`). The
//! renderers in [`render`] are [`crate::events::EventSink`]s that keep a
//! model and draw it to a terminal, a plain text stream, or JSON lines.

mod render;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use tracing::trace;

use crate::events::{DownloadId, LifecycleEvent};

pub use render::{JsonLinesRenderer, TerminalRenderer, TextRenderer};

/// Visual state of one download.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardState {
    Pending,
    Downloading,
    Completed,
    Failed,
}

impl CardState {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Everything the display knows about one download.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadCard {
    pub id: DownloadId,
    pub url: String,
    pub state: CardState,
    pub bytes_written: u64,
    pub total_bytes: Option<u64>,
    pub elapsed: Duration,
    /// Final path once completed.
    pub path: Option<PathBuf>,
    /// Error text once failed.
    pub error: Option<String>,
}

impl DownloadCard {
    fn new(id: DownloadId, url: impl Into<String>) -> Self {
        Self {
            id,
            url: url.into(),
            state: CardState::Pending,
            bytes_written: 0,
            total_bytes: None,
            elapsed: Duration::ZERO,
            path: None,
            error: None,
        }
    }

    /// The progress line for this card's latest sample.
    #[must_use]
    pub fn progress_line(&self) -> String {
        format_progress_line(self.bytes_written, self.total_bytes, self.elapsed)
    }
}

/// Cards keyed by download id.
#[derive(Debug, Default)]
pub struct ProgressModel {
    cards: BTreeMap<DownloadId, DownloadCard>,
}

impl ProgressModel {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a pending card before its download starts.
    pub fn register(&mut self, id: DownloadId, url: impl Into<String>) {
        self.cards
            .entry(id)
            .or_insert_with(|| DownloadCard::new(id, url));
    }

    /// Folds one event into its card and returns the updated card.
    ///
    /// Events that arrive after a card reached a terminal state are ignored
    /// and yield `None`.
    pub fn apply(&mut self, event: &LifecycleEvent) -> Option<&DownloadCard> {
        let id = event.id();
        let card = self
            .cards
            .entry(id)
            .or_insert_with(|| DownloadCard::new(id, String::new()));
        if card.state.is_terminal() {
            trace!(id = %id, "ignoring event for finished download");
            return None;
        }

        match event {
            LifecycleEvent::Started { url, .. } => {
                card.url.clone_from(url);
                card.state = CardState::Downloading;
            }
            LifecycleEvent::Progress {
                bytes_written,
                total_bytes,
                elapsed,
                ..
            } => {
                card.state = CardState::Downloading;
                card.bytes_written = card.bytes_written.max(*bytes_written);
                card.total_bytes = *total_bytes;
                card.elapsed = *elapsed;
            }
            LifecycleEvent::Completed {
                path,
                bytes_written,
                ..
            } => {
                card.state = CardState::Completed;
                card.bytes_written = *bytes_written;
                card.path = Some(path.clone());
            }
            LifecycleEvent::Failed { error, .. } => {
                card.state = CardState::Failed;
                card.error = Some(error.clone());
            }
        }
        Some(card)
    }

    #[must_use]
    pub fn card(&self, id: DownloadId) -> Option<&DownloadCard> {
        self.cards.get(&id)
    }

    /// Cards in id order.
    pub fn cards(&self) -> impl Iterator<Item = &DownloadCard> {
        self.cards.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Number of cards in `state`.
    #[must_use]
    pub fn count(&self, state: CardState) -> usize {
        self.cards.values().filter(|c| c.state == state).count()
    }
}

/// Formats a progress sample for line-oriented output.
///
/// `"<percent>% <written>/<total> bytes (<speed> KiB/s)"` when the total is
/// known, `"<written> bytes (<speed> KiB/s)"` otherwise.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn format_progress_line(bytes_written: u64, total_bytes: Option<u64>, elapsed: Duration) -> String {
    let secs = elapsed.as_secs_f64();
    let speed_kib = if secs > 0.0 {
        bytes_written as f64 / 1024.0 / secs
    } else {
        0.0
    };
    match total_bytes {
        Some(total) if total > 0 => {
            let percent = bytes_written as f64 / total as f64 * 100.0;
            format!("{percent:.2}% {bytes_written}/{total} bytes ({speed_kib:.1} KiB/s)")
        }
        _ => format!("{bytes_written} bytes ({speed_kib:.1} KiB/s)"),
    }
}
