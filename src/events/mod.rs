//! Lifecycle events and the pipeline that carries them.
//!
//! Every engine invocation reports its progress as a sequence of
//! [`LifecycleEvent`]s tagged with the caller's [`DownloadId`]:
//!
//! ```text
//! Started -> Progress* -> (Completed | Failed)
//! ```
//!
//! Exactly one terminal event is emitted per id and nothing follows it.
//! `Progress::bytes_written` never decreases within one id. Events of
//! different ids interleave in channel arrival order only.

mod pipeline;

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Serialize, Serializer};

use crate::download::FailureKind;

pub use pipeline::{EventReceiver, EventSender, EventSink, pipeline, spawn_consumer};

/// Caller-assigned identifier distinguishing concurrent transfers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct DownloadId(pub u64);

impl fmt::Display for DownloadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One step in the life of a download.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LifecycleEvent {
    /// The engine accepted the request.
    Started {
        /// Download identifier.
        id: DownloadId,
        /// Requested URL.
        url: String,
    },
    /// Periodic transfer sample (at most every 200 ms, plus end of stream).
    Progress {
        /// Download identifier.
        id: DownloadId,
        /// Bytes persisted to the staging file so far.
        bytes_written: u64,
        /// Expected size from `Content-Length`, when the server sent one.
        total_bytes: Option<u64>,
        /// Time since the transfer started.
        #[serde(rename = "elapsed_secs", serialize_with = "serialize_secs")]
        elapsed: Duration,
    },
    /// The file is in place (and verified, when requested).
    Completed {
        /// Download identifier.
        id: DownloadId,
        /// Final destination path.
        path: PathBuf,
        /// Size of the finished file.
        bytes_written: u64,
    },
    /// The download ended with an error.
    Failed {
        /// Download identifier.
        id: DownloadId,
        /// Error classification.
        kind: FailureKind,
        /// Human-readable message.
        error: String,
    },
}

impl LifecycleEvent {
    /// The download this event belongs to.
    #[must_use]
    pub fn id(&self) -> DownloadId {
        match self {
            Self::Started { id, .. }
            | Self::Progress { id, .. }
            | Self::Completed { id, .. }
            | Self::Failed { id, .. } => *id,
        }
    }

    /// Whether this is the last event for its id.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed { .. } | Self::Failed { .. })
    }
}

fn serialize_secs<S: Serializer>(elapsed: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(elapsed.as_secs_f64())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_event_id_and_terminal() {
        let started = LifecycleEvent::Started {
            id: DownloadId(7),
            url: "https://example.com".to_string(),
        };
        let failed = LifecycleEvent::Failed {
            id: DownloadId(7),
            kind: FailureKind::Cancelled,
            error: "cancelled".to_string(),
        };
        assert_eq!(started.id(), DownloadId(7));
        assert!(!started.is_terminal());
        assert!(failed.is_terminal());
    }

    #[test]
    fn test_progress_serializes_elapsed_seconds() {
        let event = LifecycleEvent::Progress {
            id: DownloadId(1),
            bytes_written: 512,
            total_bytes: None,
            elapsed: Duration::from_millis(1500),
        };
        let json: serde_json::Value = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "progress");
        assert_eq!(json["id"], 1);
        assert_eq!(json["bytes_written"], 512);
        assert!(json["total_bytes"].is_null());
        assert_eq!(json["elapsed_secs"], 1.5);
    }

    #[test]
    fn test_failed_serializes_kind() {
        let event = LifecycleEvent::Failed {
            id: DownloadId(2),
            kind: FailureKind::BadStatus,
            error: "bad status code: 404".to_string(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""event":"failed""#), "got: {json}");
        assert!(json.contains(r#""kind":"bad_status""#), "got: {json}");
    }

    #[test]
    fn test_download_id_display() {
        assert_eq!(DownloadId(12).to_string(), "#12");
    }
}
