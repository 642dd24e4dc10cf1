//! Download bookkeeping and saving of downloaded files.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::fs;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

use pipestash_common::FileId;

/// Tracks which files have a download in flight.
///
/// Lets a presentation layer disable duplicate triggers for the same file.
/// Nothing is deduplicated or cancelled here.
#[derive(Debug, Default)]
pub struct DownloadTracker {
    in_progress: Mutex<HashMap<FileId, usize>>,
}

impl DownloadTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn in_progress(&self) -> MutexGuard<'_, HashMap<FileId, usize>> {
        self.in_progress.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Mark a download of `file_id` as started until the guard is dropped.
    pub fn begin(&self, file_id: &FileId) -> DownloadGuard<'_> {
        *self.in_progress().entry(file_id.clone()).or_insert(0) += 1;
        DownloadGuard {
            tracker: self,
            file_id: file_id.clone(),
        }
    }

    pub fn is_downloading(&self, file_id: &FileId) -> bool {
        self.in_progress().contains_key(file_id)
    }

    fn finish(&self, file_id: &FileId) {
        let mut in_progress = self.in_progress();
        if let Some(count) = in_progress.get_mut(file_id) {
            *count -= 1;
            if *count == 0 {
                in_progress.remove(file_id);
            }
        }
    }
}

/// Clears the in-progress mark when dropped, whatever the outcome.
pub struct DownloadGuard<'a> {
    tracker: &'a DownloadTracker,
    file_id: FileId,
}

impl Drop for DownloadGuard<'_> {
    fn drop(&mut self) {
        self.tracker.finish(&self.file_id);
    }
}

/// Name to try for the `attempt`-th save of `file_name`.
///
/// `photo.png` becomes `photo (1).png`, `photo (2).png`, and so on.
fn candidate_name(file_name: &str, attempt: usize) -> String {
    if attempt == 0 {
        return file_name.to_string();
    }
    match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{} ({}).{}", stem, attempt, ext),
        _ => format!("{} ({})", file_name, attempt),
    }
}

/// Write `data` to a new file named after `file_name` inside `dir`.
///
/// Never overwrites: an existing name gets a numbered suffix.
pub async fn save_artifact(dir: &Path, file_name: &str, data: &[u8]) -> std::io::Result<PathBuf> {
    fs::create_dir_all(dir).await?;

    let mut attempt = 0;
    loop {
        let path = dir.join(candidate_name(file_name, attempt));
        match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => {
                fill_or_remove(&path, file, data).await?;
                debug!("Saved {} bytes to {}", data.len(), path.display());
                return Ok(path);
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => attempt += 1,
            Err(e) => return Err(e),
        }
    }
}

/// Write `data` through `writer` into the freshly created file at `path`.
///
/// On failure the file is removed, so no truncated copy is left behind.
async fn fill_or_remove<W>(path: &Path, mut writer: W, data: &[u8]) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let written = async {
        writer.write_all(data).await?;
        writer.flush().await
    }
    .await;

    if let Err(e) = written {
        drop(writer);
        if let Err(cleanup) = fs::remove_file(path).await {
            warn!("Could not remove partial file {}: {}", path.display(), cleanup);
        }
        return Err(e);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tempfile::TempDir;

    /// Writer whose every write fails, as on a full disk.
    struct FullDisk;

    impl AsyncWrite for FullDisk {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &[u8],
        ) -> Poll<std::io::Result<usize>> {
            Poll::Ready(Err(std::io::Error::new(
                ErrorKind::Other,
                "no space left on device",
            )))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
        ) -> Poll<std::io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    #[test]
    fn test_guard_clears_on_drop() {
        let tracker = DownloadTracker::new();
        let id = FileId::new("f1");

        let first = tracker.begin(&id);
        let second = tracker.begin(&id);
        assert!(tracker.is_downloading(&id));

        drop(first);
        assert!(tracker.is_downloading(&id));
        drop(second);
        assert!(!tracker.is_downloading(&id));
    }

    #[test]
    fn test_candidate_names() {
        assert_eq!(candidate_name("photo.png", 0), "photo.png");
        assert_eq!(candidate_name("photo.png", 2), "photo (2).png");
        assert_eq!(candidate_name("README", 1), "README (1)");
        assert_eq!(candidate_name(".env", 1), ".env (1)");
    }

    #[tokio::test]
    async fn test_save_never_overwrites() {
        let dir = TempDir::new().unwrap();
        let first = save_artifact(dir.path(), "a.txt", b"one").await.unwrap();
        let second = save_artifact(dir.path(), "a.txt", b"two").await.unwrap();

        assert_eq!(first, dir.path().join("a.txt"));
        assert_eq!(second, dir.path().join("a (1).txt"));
        assert_eq!(std::fs::read(&first).unwrap(), b"one");
        assert_eq!(std::fs::read(&second).unwrap(), b"two");
    }

    #[tokio::test]
    async fn test_failed_write_removes_partial_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, b"on").unwrap();

        let err = fill_or_remove(&path, FullDisk, b"one").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Other);
        assert!(!path.exists());

        let saved = save_artifact(dir.path(), "a.txt", b"one").await.unwrap();
        assert_eq!(saved, path);
    }

    #[tokio::test]
    async fn test_successful_fill_keeps_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("b.txt");
        let file = fs::File::create(&path).await.unwrap();

        fill_or_remove(&path, file, b"two").await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"two");
    }
}
