//! Constants for the download module (chunking, progress cadence, timeouts).

use std::time::Duration;

/// Size of each read from the response body (32 KiB).
///
/// Larger values reduce syscall overhead; smaller values reduce memory use
/// and shorten cancellation latency, which is bounded by one chunk.
pub const CHUNK_SIZE: usize = 32 * 1024;

/// Minimum wall-clock spacing between two `Progress` events of one download.
pub const PROGRESS_INTERVAL: Duration = Duration::from_millis(200);

/// Default HTTP connect timeout (30 seconds). There is no read timeout.
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default capacity of the shared lifecycle event channel.
pub const DEFAULT_EVENT_BUFFER: usize = 64;

/// Infix between the resolved filename and the random suffix of staging files.
pub const PART_SUFFIX: &str = ".part.";

/// Number of random characters appended to staging file names.
pub(crate) const PART_RANDOM_LEN: usize = 8;
