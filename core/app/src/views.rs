//! Observers that re-derive presentation state after each broadcast.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

use pipestash_common::{Account, Balance, FileRecord, Result};
use pipestash_index::LocalFileIndex;
use pipestash_preview::{PreviewCache, ReloadReport};
use pipestash_storage::RemoteStorageClient;
use pipestash_sync::SyncObserver;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The file listing as last rendered.
pub struct FileListView {
    index: Arc<LocalFileIndex>,
    files: Mutex<Vec<FileRecord>>,
    renders: AtomicUsize,
}

impl FileListView {
    pub fn new(index: Arc<LocalFileIndex>) -> Self {
        Self {
            index,
            files: Mutex::new(Vec::new()),
            renders: AtomicUsize::new(0),
        }
    }

    pub fn files(&self) -> Vec<FileRecord> {
        lock(&self.files).clone()
    }

    /// Number of completed reloads.
    pub fn renders(&self) -> usize {
        self.renders.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SyncObserver for FileListView {
    fn name(&self) -> &str {
        "file-list"
    }

    async fn on_sync(&self) -> Result<()> {
        let files = self.index.list_files();
        debug!("File list: {} records", files.len());
        *lock(&self.files) = files;
        self.renders.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Debug, Default)]
struct BalanceState {
    balance: Option<Balance>,
    error: Option<String>,
}

/// The account balance as last fetched.
///
/// A failed fetch keeps the previous balance and records the error.
pub struct BalanceView {
    client: Arc<dyn RemoteStorageClient>,
    account: Account,
    state: Mutex<BalanceState>,
    renders: AtomicUsize,
}

impl BalanceView {
    pub fn new(client: Arc<dyn RemoteStorageClient>, account: Account) -> Self {
        Self {
            client,
            account,
            state: Mutex::new(BalanceState::default()),
            renders: AtomicUsize::new(0),
        }
    }

    pub fn balance(&self) -> Option<Balance> {
        lock(&self.state).balance.clone()
    }

    /// Message of the last failed fetch, cleared by the next success.
    pub fn error(&self) -> Option<String> {
        lock(&self.state).error.clone()
    }

    /// Number of reload attempts, successful or not.
    pub fn renders(&self) -> usize {
        self.renders.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SyncObserver for BalanceView {
    fn name(&self) -> &str {
        "balance"
    }

    async fn on_sync(&self) -> Result<()> {
        let result = self.client.get_balance(&self.account).await;
        self.renders.fetch_add(1, Ordering::SeqCst);

        let mut state = lock(&self.state);
        match result {
            Ok(balance) => {
                state.balance = Some(balance);
                state.error = None;
                Ok(())
            }
            Err(e) => {
                state.error = Some(e.to_string());
                Err(e.into())
            }
        }
    }
}

/// Rebuilds image previews from the current listing.
pub struct PreviewLoader {
    index: Arc<LocalFileIndex>,
    cache: Arc<PreviewCache>,
    account: Account,
    last_report: Mutex<Option<ReloadReport>>,
}

impl PreviewLoader {
    pub fn new(index: Arc<LocalFileIndex>, cache: Arc<PreviewCache>, account: Account) -> Self {
        Self {
            index,
            cache,
            account,
            last_report: Mutex::new(None),
        }
    }

    pub fn last_report(&self) -> Option<ReloadReport> {
        lock(&self.last_report).clone()
    }
}

#[async_trait]
impl SyncObserver for PreviewLoader {
    fn name(&self) -> &str {
        "previews"
    }

    async fn on_sync(&self) -> Result<()> {
        let files = self.index.list_files();
        let report = self.cache.reload(&self.account, &files).await;
        *lock(&self.last_report) = Some(report);
        Ok(())
    }
}
