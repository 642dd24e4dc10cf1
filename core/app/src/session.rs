//! Per-account session.
//!
//! An [`ActiveSession`] exists from login until logout or account switch. It
//! owns the account's file index, the change coordinator with its observers,
//! the preview cache and the download/share bookkeeping. Nothing here is
//! global; switching accounts means closing one session and opening another.

use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

use pipestash_common::validation::validate_file_name;
use pipestash_common::{Account, Balance, FileId, FileRecord, Result, ShareLink};
use pipestash_index::LocalFileIndex;
use pipestash_preview::PreviewCache;
use pipestash_storage::{KeyValueStore, RemoteStorageClient};
use pipestash_sync::{BroadcastReport, SubscriptionId, SyncCoordinator};

use crate::downloads::{save_artifact, DownloadTracker};
use crate::progress::ProgressTracker;
use crate::share::{ShareOutcome, ShareState};
use crate::views::{BalanceView, FileListView, PreviewLoader};

/// State and operations of the logged-in account.
pub struct ActiveSession {
    account: Account,
    client: Arc<dyn RemoteStorageClient>,
    index: Arc<LocalFileIndex>,
    coordinator: Arc<SyncCoordinator>,
    previews: Arc<PreviewCache>,
    file_list: Arc<FileListView>,
    balance: Arc<BalanceView>,
    preview_loader: Arc<PreviewLoader>,
    subscriptions: Vec<SubscriptionId>,
    downloads: DownloadTracker,
    share: ShareState,
    download_dir: PathBuf,
}

impl ActiveSession {
    /// Open a session for `account`.
    ///
    /// Loads the account's index, subscribes the file list, balance and
    /// preview observers (in that order) and runs an initial broadcast so
    /// they start populated.
    ///
    /// # Errors
    /// - The persisted index cannot be read
    pub async fn open(
        account: Account,
        client: Arc<dyn RemoteStorageClient>,
        store: Arc<dyn KeyValueStore>,
        download_dir: PathBuf,
    ) -> Result<Self> {
        let index = Arc::new(LocalFileIndex::open(store, &account.username)?);
        let coordinator = Arc::new(SyncCoordinator::new());
        let previews = Arc::new(PreviewCache::new(client.clone()));

        let file_list = Arc::new(FileListView::new(index.clone()));
        let balance = Arc::new(BalanceView::new(client.clone(), account.clone()));
        let preview_loader = Arc::new(PreviewLoader::new(
            index.clone(),
            previews.clone(),
            account.clone(),
        ));

        let subscriptions = vec![
            coordinator.subscribe(file_list.clone()),
            coordinator.subscribe(balance.clone()),
            coordinator.subscribe(preview_loader.clone()),
        ];

        let session = Self {
            account,
            client,
            index,
            coordinator,
            previews,
            file_list,
            balance,
            preview_loader,
            subscriptions,
            downloads: DownloadTracker::new(),
            share: ShareState::new(),
            download_dir,
        };

        session.coordinator.broadcast().await;
        info!("Session opened for {}", session.account.username);
        Ok(session)
    }

    pub fn account(&self) -> &Account {
        &self.account
    }

    pub fn index(&self) -> &Arc<LocalFileIndex> {
        &self.index
    }

    pub fn coordinator(&self) -> &Arc<SyncCoordinator> {
        &self.coordinator
    }

    pub fn previews(&self) -> &Arc<PreviewCache> {
        &self.previews
    }

    pub fn file_list(&self) -> &Arc<FileListView> {
        &self.file_list
    }

    pub fn balance_view(&self) -> &Arc<BalanceView> {
        &self.balance
    }

    pub fn preview_loader(&self) -> &Arc<PreviewLoader> {
        &self.preview_loader
    }

    /// Files in the local index, in upload order.
    pub fn files(&self) -> Vec<FileRecord> {
        self.index.list_files()
    }

    /// Re-run every observer without mutating anything.
    pub async fn refresh(&self) -> BroadcastReport {
        self.coordinator.broadcast().await
    }

    /// Upload a file and register it in the index.
    ///
    /// `on_progress` receives a strictly increasing percentage ending at 100.
    ///
    /// # Postconditions
    /// - On success the record is in the index and observers were notified
    /// - On failure the index is unchanged and nothing was broadcast
    ///
    /// # Errors
    /// - `ValidationError` for an unusable file name, before any network call
    /// - `TransferError` from the backend
    /// - `StoreError` if the index could not be persisted
    pub async fn upload_file<F>(
        &self,
        data: Vec<u8>,
        file_name: &str,
        on_progress: F,
    ) -> Result<FileRecord>
    where
        F: Fn(u8) + Send + Sync,
    {
        validate_file_name(file_name)?;

        let tracker = ProgressTracker::new(on_progress);
        debug!("Uploading {} ({} bytes)", file_name, data.len());
        let receipt = self
            .client
            .upload_file(&self.account, data, file_name, &|p| tracker.report(p))
            .await
            .map_err(|e| {
                warn!("Upload of {} failed: {}", file_name, e);
                e
            })?;
        tracker.finish();

        let record = FileRecord::from_receipt(receipt, chrono::Utc::now());
        self.index.add_file(record.clone())?;
        self.coordinator.broadcast().await;

        info!("Uploaded {} as {}", record.file_name, record.file_id);
        Ok(record)
    }

    /// Delete a file remotely and drop it from the index.
    ///
    /// # Postconditions
    /// - On success the record and its preview are gone and observers were
    ///   notified
    /// - On failure the index is unchanged and nothing was broadcast
    pub async fn delete_file(&self, record: &FileRecord) -> Result<()> {
        debug!("Deleting {}", record.file_name);
        self.client
            .delete_file(&self.account, &record.file_name)
            .await
            .map_err(|e| {
                warn!("Delete of {} failed: {}", record.file_name, e);
                e
            })?;

        self.index.remove_file(&record.file_id)?;
        self.previews.remove(&record.file_id);
        self.coordinator.broadcast().await;

        info!("Deleted {}", record.file_name);
        Ok(())
    }

    /// Download a file and save it to the download directory.
    ///
    /// Returns the path written. The index is never touched.
    pub async fn download_file(&self, record: &FileRecord) -> Result<PathBuf> {
        validate_file_name(&record.file_name)?;
        let _guard = self.downloads.begin(&record.file_id);

        let data = self
            .client
            .download_file(&self.account, &record.file_name)
            .await
            .map_err(|e| {
                warn!("Download of {} failed: {}", record.file_name, e);
                e
            })?;

        let path = save_artifact(&self.download_dir, &record.file_name, &data).await?;
        info!("Downloaded {} to {}", record.file_name, path.display());
        Ok(path)
    }

    /// Whether a download of `file_id` is in flight.
    pub fn is_downloading(&self, file_id: &FileId) -> bool {
        self.downloads.is_downloading(file_id)
    }

    /// Request a public link for `file_name`.
    ///
    /// Requesting a link hides the previously displayed one. A result that
    /// arrives after a newer request is returned as
    /// [`ShareOutcome::Superseded`] and not displayed.
    pub async fn create_public_link(&self, file_name: &str) -> Result<ShareOutcome> {
        let ticket = self.share.begin(file_name);
        let result = self
            .client
            .create_public_link(&self.account, file_name)
            .await;
        let outcome = self.share.complete(ticket, file_name, result)?;
        Ok(outcome)
    }

    /// Link currently on display.
    pub fn displayed_link(&self) -> Option<ShareLink> {
        self.share.displayed()
    }

    /// File whose link request is pending.
    pub fn pending_link(&self) -> Option<String> {
        self.share.pending()
    }

    /// Hide the displayed link.
    pub fn dismiss_link(&self) {
        self.share.dismiss();
    }

    /// Query the backend for the current balance.
    pub async fn balance(&self) -> Result<Balance> {
        Ok(self.client.get_balance(&self.account).await?)
    }

    /// End the session: unsubscribe observers and release all previews.
    pub fn close(self) {
        for id in &self.subscriptions {
            self.coordinator.unsubscribe(*id);
        }
        self.previews.clear();
        info!("Session closed for {}", self.account.username);
    }
}
