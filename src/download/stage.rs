//! Staging file that receives transfer bytes before the final rename.

use std::path::Path;

use tempfile::TempPath;
use tokio::fs::File;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use super::constants::{PART_RANDOM_LEN, PART_SUFFIX};
use super::error::DownloadError;

/// An open `<filename>.part.<random>` file.
///
/// The path guard removes the file when dropped, so every early return
/// (including a dropped future) leaves no staging artifact behind.
#[derive(Debug)]
pub(crate) struct StagedFile {
    file: File,
    path: TempPath,
}

impl StagedFile {
    /// Creates a uniquely named staging file in `dir`.
    pub(crate) fn create(dir: &Path, filename: &str) -> Result<Self, DownloadError> {
        let named = tempfile::Builder::new()
            .prefix(&format!("{filename}{PART_SUFFIX}"))
            .rand_bytes(PART_RANDOM_LEN)
            .tempfile_in(dir)
            .map_err(|e| DownloadError::io(dir, e))?;
        let (file, path) = named.into_parts();
        Ok(Self {
            file: File::from_std(file),
            path,
        })
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Writes a whole chunk.
    pub(crate) async fn write_chunk(&mut self, chunk: &[u8]) -> Result<(), DownloadError> {
        write_all_checked(&mut self.file, chunk, &self.path).await
    }

    /// Flushes to stable storage and closes the handle.
    ///
    /// Returns the still-armed path guard; the caller disarms it once the
    /// file has been moved into place.
    pub(crate) async fn seal(mut self) -> Result<TempPath, DownloadError> {
        self.file
            .flush()
            .await
            .map_err(|e| DownloadError::io(self.path.to_path_buf(), e))?;
        self.file
            .sync_all()
            .await
            .map_err(|e| DownloadError::io(self.path.to_path_buf(), e))?;
        drop(self.file);
        Ok(self.path)
    }
}

/// Writes `chunk` in full to `writer`.
///
/// A writer that stops accepting bytes before the chunk is persisted is a
/// hard fault and is not retried.
async fn write_all_checked<W>(writer: &mut W, chunk: &[u8], path: &Path) -> Result<(), DownloadError>
where
    W: AsyncWrite + Unpin,
{
    let mut written = 0;
    while written < chunk.len() {
        let n = writer
            .write(&chunk[written..])
            .await
            .map_err(|e| DownloadError::io(path, e))?;
        if n == 0 {
            return Err(DownloadError::short_write(path, chunk.len(), written));
        }
        written += n;
    }
    Ok(())
}
