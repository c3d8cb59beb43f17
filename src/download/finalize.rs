//! Two-step finalize protocol: atomic rename, then copy fallback.
//!
//! The staged file normally lives next to its destination, so the rename is
//! atomic. When it still fails (a different volume, a filesystem that does
//! not support rename), the bytes are copied into a second staging file in
//! the destination directory, which is then renamed into place. The
//! destination is therefore never observed half-written on either path.
//!
//! The fallback copy is not interrupted by cancellation: it only runs once
//! the transfer has completed locally.

use std::fmt::Debug;
use std::io;
use std::path::Path;

use async_trait::async_trait;
use tempfile::TempPath;
use tracing::{debug, warn};

use super::constants::{PART_RANDOM_LEN, PART_SUFFIX};
use super::error::DownloadError;

/// File operations used to move a finished download into place.
///
/// The engine holds this as a trait object so tests can force either
/// finalize path (e.g. a rename that always reports a cross-device error).
#[async_trait]
pub trait FileMover: Send + Sync + Debug {
    /// Renames `from` to `to`, replacing `to` if it exists.
    async fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Copies the contents of `from` over `to`, returning bytes copied.
    async fn copy(&self, from: &Path, to: &Path) -> io::Result<u64>;
}

/// [`FileMover`] backed by the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsMover;

#[async_trait]
impl FileMover for FsMover {
    async fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        tokio::fs::rename(from, to).await
    }

    async fn copy(&self, from: &Path, to: &Path) -> io::Result<u64> {
        tokio::fs::copy(from, to).await
    }
}

/// Moves a sealed staging file to `destination`.
pub(crate) async fn finalize(
    mover: &dyn FileMover,
    staged: TempPath,
    destination: &Path,
) -> Result<(), DownloadError> {
    match try_atomic_replace(mover, &staged, destination).await {
        Ok(()) => {
            // Already moved; only the guard is left to disarm.
            let _ = staged.keep();
            Ok(())
        }
        Err(rename_error) => {
            warn!(
                from = %staged.display(),
                to = %destination.display(),
                error = %rename_error,
                "atomic rename failed, falling back to copy"
            );
            copy_and_delete_source(mover, staged, destination, &rename_error).await
        }
    }
}

async fn try_atomic_replace(
    mover: &dyn FileMover,
    staged: &Path,
    destination: &Path,
) -> io::Result<()> {
    mover.rename(staged, destination).await
}

async fn copy_and_delete_source(
    mover: &dyn FileMover,
    staged: TempPath,
    destination: &Path,
    rename_error: &io::Error,
) -> Result<(), DownloadError> {
    let copy_failed = |e| DownloadError::fallback_copy_failed(destination, rename_error, e);

    let landing_dir = match destination.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let prefix = destination
        .file_name()
        .map_or_else(|| "download".to_string(), |n| n.to_string_lossy().into_owned());
    let landing = tempfile::Builder::new()
        .prefix(&format!("{prefix}{PART_SUFFIX}"))
        .rand_bytes(PART_RANDOM_LEN)
        .tempfile_in(landing_dir)
        .map_err(copy_failed)?
        .into_temp_path();

    let copied = mover.copy(&staged, &landing).await.map_err(copy_failed)?;
    tokio::fs::File::open(&landing)
        .await
        .map_err(copy_failed)?
        .sync_all()
        .await
        .map_err(copy_failed)?;

    // Same directory as the destination, so this rename is atomic.
    tokio::fs::rename(&landing, destination)
        .await
        .map_err(|e| DownloadError::rename_failed(landing.to_path_buf(), destination, e))?;
    let _ = landing.keep();

    if let Err(e) = staged.close() {
        debug!(error = %e, "could not remove staging file after fallback copy");
    }
    debug!(bytes = copied, to = %destination.display(), "fallback copy complete");
    Ok(())
}
