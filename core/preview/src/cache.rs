//! Preview cache for image files.
//!
//! Rebuilt from the file listing on every reload. Each reload is a new
//! generation; handles from older generations are always released, including
//! the ones built by a reload that was overtaken by a newer one.

use futures::future::join_all;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

use crate::blob::{BlobArena, PreviewHandle};
use crate::image::image_mime;
use pipestash_common::{Account, FileId, FileRecord};
use pipestash_storage::RemoteStorageClient;

/// Outcome of one [`PreviewCache::reload`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReloadReport {
    pub generation: u64,
    /// Handles installed by this reload.
    pub materialized: usize,
    /// Image records whose content could not be fetched.
    pub failed: usize,
    /// Handles of the previous generation released by this reload.
    pub released: usize,
    /// A newer reload started first; everything built here was released.
    pub superseded: bool,
}

/// Ephemeral previews keyed by file id. Nothing here is persisted.
pub struct PreviewCache {
    client: Arc<dyn RemoteStorageClient>,
    arena: Arc<BlobArena>,
    handles: Mutex<HashMap<FileId, PreviewHandle>>,
    generation: AtomicU64,
}

impl PreviewCache {
    pub fn new(client: Arc<dyn RemoteStorageClient>) -> Self {
        Self {
            client,
            arena: Arc::new(BlobArena::new()),
            handles: Mutex::new(HashMap::new()),
            generation: AtomicU64::new(0),
        }
    }

    fn handles(&self) -> MutexGuard<'_, HashMap<FileId, PreviewHandle>> {
        self.handles.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The blob registry backing this cache.
    pub fn arena(&self) -> &Arc<BlobArena> {
        &self.arena
    }

    /// Current generation.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    fn bump_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Number of installed handles.
    pub fn len(&self) -> usize {
        self.handles().len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.handles().is_empty()
    }

    pub fn contains(&self, file_id: &FileId) -> bool {
        self.handles().contains_key(file_id)
    }

    /// Object URL of the preview for `file_id`.
    pub fn url(&self, file_id: &FileId) -> Option<String> {
        self.handles().get(file_id).map(|h| h.url().to_string())
    }

    /// `data:` URL of the preview for `file_id`.
    pub fn data_url(&self, file_id: &FileId) -> Option<String> {
        self.handles().get(file_id).and_then(|h| h.data_url())
    }

    /// Rebuild previews for `records`.
    ///
    /// The previous generation is released before any content is fetched,
    /// so handles for records missing from `records` never outlive this call
    /// even if it fails partway. Fetch failures are logged per file and
    /// skipped.
    pub async fn reload(&self, account: &Account, records: &[FileRecord]) -> ReloadReport {
        let generation = self.bump_generation();
        let previous: Vec<PreviewHandle> = self.handles().drain().map(|(_, h)| h).collect();

        let mut report = ReloadReport {
            generation,
            released: previous.len(),
            ..Default::default()
        };
        for handle in previous {
            handle.release();
        }

        let images: Vec<(&FileRecord, &'static str)> = records
            .iter()
            .filter_map(|r| image_mime(&r.file_name).map(|mime| (r, mime)))
            .collect();
        debug!(
            "Preview reload #{}: {} of {} records are images",
            generation,
            images.len(),
            records.len()
        );

        let fetches = images.into_iter().map(|(record, mime)| async move {
            let result = self.client.download_file(account, &record.file_name).await;
            (record, mime, result)
        });

        let mut built = Vec::new();
        for (record, mime, result) in join_all(fetches).await {
            match result {
                Ok(data) => built.push(PreviewHandle::materialize(
                    &self.arena,
                    record.file_id.clone(),
                    data,
                    mime,
                    generation,
                )),
                Err(e) => {
                    warn!("Preview for {} unavailable: {}", record.file_name, e);
                    report.failed += 1;
                }
            }
        }

        let mut handles = self.handles();
        if self.generation() != generation {
            drop(handles);
            debug!("Preview reload #{} superseded", generation);
            for handle in built {
                handle.release();
            }
            report.superseded = true;
            return report;
        }

        report.materialized = built.len();
        for handle in built {
            if let Some(stale) = handles.insert(handle.file_id().clone(), handle) {
                stale.release();
            }
        }
        report
    }

    /// Release the preview for `file_id`, if any.
    ///
    /// Also invalidates any reload still in flight, which may have been
    /// built from a listing that contained the file.
    pub fn remove(&self, file_id: &FileId) -> bool {
        self.bump_generation();
        match self.handles().remove(file_id) {
            Some(handle) => {
                handle.release();
                true
            }
            None => false,
        }
    }

    /// Release every preview.
    pub fn clear(&self) {
        self.bump_generation();
        let previous: Vec<PreviewHandle> = self.handles().drain().map(|(_, h)| h).collect();
        for handle in previous {
            handle.release();
        }
    }
}

impl Drop for PreviewCache {
    fn drop(&mut self) {
        self.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pipestash_common::{Balance, TransferError, UploadReceipt};
    use pipestash_storage::{MemoryBackend, ProgressFn};

    fn no_progress(_: u8) {}

    async fn setup(files: &[(&str, &str)]) -> (MemoryBackend, Account, Vec<FileRecord>) {
        let backend = MemoryBackend::new();
        let account = backend.create_account("alice123", "Passw0rd!1").await.unwrap();
        let mut records = Vec::new();
        for (name, data) in files {
            let receipt = backend
                .upload_file(&account, data.as_bytes().to_vec(), name, &no_progress)
                .await
                .unwrap();
            records.push(FileRecord::from_receipt(receipt, Utc::now()));
        }
        (backend, account, records)
    }

    #[tokio::test]
    async fn test_only_images_get_previews() {
        let (backend, account, records) =
            setup(&[("photo.png", "png"), ("notes.txt", "txt"), ("pic.JPG", "jpg")]).await;
        let cache = PreviewCache::new(Arc::new(backend));

        let report = cache.reload(&account, &records).await;
        assert_eq!(report.materialized, 2);
        assert_eq!(report.failed, 0);
        assert!(cache.contains(&records[0].file_id));
        assert!(!cache.contains(&records[1].file_id));
        assert!(cache.contains(&records[2].file_id));
        assert_eq!(cache.arena().live_count(), 2);
        assert_eq!(
            cache.data_url(&records[0].file_id).unwrap(),
            "data:image/png;base64,cG5n"
        );
    }

    #[tokio::test]
    async fn test_failure_is_isolated_per_file() {
        let (backend, account, records) =
            setup(&[("a.png", "a"), ("b.gif", "b"), ("c.webp", "c")]).await;
        backend.fail_downloads_of("b.gif");
        let cache = PreviewCache::new(Arc::new(backend));

        let report = cache.reload(&account, &records).await;
        assert_eq!(report.materialized, 2);
        assert_eq!(report.failed, 1);
        assert!(!cache.contains(&records[1].file_id));
        assert!(cache.contains(&records[2].file_id));
    }

    #[tokio::test]
    async fn test_reload_releases_previous_generation() {
        let (backend, account, records) = setup(&[("a.png", "a"), ("b.png", "b")]).await;
        let cache = PreviewCache::new(Arc::new(backend));

        cache.reload(&account, &records).await;
        let old_url = cache.url(&records[0].file_id).unwrap();

        let report = cache.reload(&account, &records[1..]).await;
        assert_eq!(report.released, 2);
        assert_eq!(report.materialized, 1);
        assert!(!cache.contains(&records[0].file_id));
        assert!(cache.arena().get(&old_url).is_none());
        assert_eq!(cache.arena().live_count(), 1);
    }

    #[tokio::test]
    async fn test_absent_record_released_even_when_reload_fails() {
        let (backend, account, records) = setup(&[("a.png", "a"), ("b.png", "b")]).await;
        let cache = PreviewCache::new(Arc::new(backend.clone()));
        cache.reload(&account, &records).await;

        backend.set_offline(true);
        let report = cache.reload(&account, &records[1..]).await;
        assert_eq!(report.failed, 1);
        assert!(cache.is_empty());
        assert_eq!(cache.arena().live_count(), 0);
    }

    #[tokio::test]
    async fn test_remove_releases_handle() {
        let (backend, account, records) = setup(&[("a.png", "a")]).await;
        let cache = PreviewCache::new(Arc::new(backend));
        cache.reload(&account, &records).await;

        assert!(cache.remove(&records[0].file_id));
        assert!(!cache.remove(&records[0].file_id));
        assert_eq!(cache.arena().live_count(), 0);

        cache.reload(&account, &[]).await;
        assert!(!cache.contains(&records[0].file_id));
    }

    /// Delegates to a [`MemoryBackend`] but suspends once before each
    /// download, so concurrent reloads interleave.
    struct YieldingClient(MemoryBackend);

    #[async_trait::async_trait]
    impl RemoteStorageClient for YieldingClient {
        fn name(&self) -> &str {
            "yielding"
        }

        async fn login(
            &self,
            username: &str,
            password: &str,
        ) -> Result<Account, pipestash_common::AuthError> {
            self.0.login(username, password).await
        }

        async fn create_account(
            &self,
            username: &str,
            password: &str,
        ) -> Result<Account, pipestash_common::AuthError> {
            self.0.create_account(username, password).await
        }

        async fn get_balance(&self, account: &Account) -> Result<Balance, TransferError> {
            self.0.get_balance(account).await
        }

        async fn upload_file(
            &self,
            account: &Account,
            data: Vec<u8>,
            file_name: &str,
            progress: ProgressFn<'_>,
        ) -> Result<UploadReceipt, TransferError> {
            self.0.upload_file(account, data, file_name, progress).await
        }

        async fn download_file(
            &self,
            account: &Account,
            file_name: &str,
        ) -> Result<Vec<u8>, TransferError> {
            tokio::task::yield_now().await;
            self.0.download_file(account, file_name).await
        }

        async fn delete_file(&self, account: &Account, file_name: &str) -> Result<(), TransferError> {
            self.0.delete_file(account, file_name).await
        }

        async fn create_public_link(
            &self,
            account: &Account,
            file_name: &str,
        ) -> Result<String, TransferError> {
            self.0.create_public_link(account, file_name).await
        }
    }

    #[tokio::test]
    async fn test_overtaken_reload_leaks_nothing() {
        let (backend, account, records) = setup(&[("a.png", "a"), ("b.png", "b")]).await;
        let cache = PreviewCache::new(Arc::new(YieldingClient(backend)));

        let (first, second) = tokio::join!(
            cache.reload(&account, &records),
            cache.reload(&account, &records[1..])
        );

        assert!(first.superseded);
        assert!(!second.superseded);
        assert_eq!(second.materialized, 1);
        assert!(!cache.contains(&records[0].file_id));
        assert!(cache.contains(&records[1].file_id));
        assert_eq!(cache.arena().live_count(), 1);
    }

    #[tokio::test]
    async fn test_clear_releases_everything() {
        let (backend, account, records) = setup(&[("a.png", "a"), ("b.svg", "b")]).await;
        let cache = PreviewCache::new(Arc::new(backend));
        cache.reload(&account, &records).await;

        let arena = cache.arena().clone();
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(arena.live_count(), 0);
    }
}
