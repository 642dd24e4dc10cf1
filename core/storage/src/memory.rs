//! In-memory storage backend for testing.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;
use uuid::Uuid;

use crate::provider::{ProgressFn, RemoteStorageClient};
use pipestash_common::{Account, AuthError, Balance, FileId, TransferError, UploadReceipt};

/// A file held by the backend.
#[derive(Debug, Clone)]
struct StoredFile {
    id: FileId,
    data: Vec<u8>,
}

/// A registered backend user.
#[derive(Debug, Clone)]
struct RemoteUser {
    password: String,
    user_id: String,
    app_key: String,
    balance: Balance,
    files: BTreeMap<String, StoredFile>,
}

/// Number of calls the backend has received, per operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallLog {
    pub login: usize,
    pub create_account: usize,
    pub balance: usize,
    pub upload: usize,
    pub download: usize,
    pub delete: usize,
    pub share: usize,
}

impl CallLog {
    /// Total number of calls across all operations.
    pub fn total(&self) -> usize {
        self.login
            + self.create_account
            + self.balance
            + self.upload
            + self.download
            + self.delete
            + self.share
    }
}

#[derive(Debug, Default)]
struct BackendState {
    users: HashMap<String, RemoteUser>,
    offline: bool,
    failing_downloads: HashSet<String>,
    calls: CallLog,
}

/// In-memory storage backend.
///
/// Useful for testing and development. All data is stored in memory and
/// lost on drop. Supports simple fault injection: an offline switch and
/// per-file download failures.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    state: Arc<Mutex<BackendState>>,
}

impl MemoryBackend {
    /// Create a new empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, BackendState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Simulate losing (or regaining) network connectivity.
    pub fn set_offline(&self, offline: bool) {
        self.state().offline = offline;
    }

    /// Make every download of `file_name` fail with a network error.
    pub fn fail_downloads_of(&self, file_name: impl Into<String>) {
        self.state().failing_downloads.insert(file_name.into());
    }

    /// Set the balance reported for `username`.
    pub fn set_balance(&self, username: &str, pipe: f64, sol: f64) {
        if let Some(user) = self.state().users.get_mut(username) {
            user.balance.pipe = pipe;
            user.balance.sol = sol;
        }
    }

    /// Names of the files stored remotely for `username`, sorted.
    pub fn remote_file_names(&self, username: &str) -> Vec<String> {
        self.state()
            .users
            .get(username)
            .map(|u| u.files.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Snapshot of the calls received so far.
    pub fn calls(&self) -> CallLog {
        self.state().calls
    }

    fn to_account(username: &str, user: &RemoteUser) -> Account {
        Account::new(username, &user.password, &user.user_id, &user.app_key)
    }

    /// Resolve the caller's user record, checking connectivity and the app key.
    fn authorized<'a>(
        state: &'a mut BackendState,
        account: &Account,
    ) -> Result<&'a mut RemoteUser, TransferError> {
        if state.offline {
            return Err(TransferError::Network("backend unreachable".to_string()));
        }
        match state.users.get_mut(&account.username) {
            Some(user) if user.app_key == account.user_app_key => Ok(user),
            _ => Err(TransferError::Unauthorized),
        }
    }
}

#[async_trait]
impl RemoteStorageClient for MemoryBackend {
    fn name(&self) -> &str {
        "memory"
    }

    async fn login(&self, username: &str, password: &str) -> Result<Account, AuthError> {
        let mut state = self.state();
        state.calls.login += 1;
        if state.offline {
            return Err(AuthError::Network("backend unreachable".to_string()));
        }

        match state.users.get(username) {
            Some(user) if user.password == password => Ok(Self::to_account(username, user)),
            _ => Err(AuthError::InvalidCredentials),
        }
    }

    async fn create_account(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Account, AuthError> {
        let mut state = self.state();
        state.calls.create_account += 1;
        if state.offline {
            return Err(AuthError::Network("backend unreachable".to_string()));
        }
        if state.users.contains_key(username) {
            return Err(AuthError::UsernameExists {
                username: username.to_string(),
            });
        }

        let user_id = Uuid::new_v4().to_string();
        let user = RemoteUser {
            password: password.to_string(),
            app_key: Uuid::new_v4().simple().to_string(),
            balance: Balance {
                pipe: 0.0,
                sol: 0.0,
                public_key: format!("pk-{}", user_id),
            },
            user_id,
            files: BTreeMap::new(),
        };
        let account = Self::to_account(username, &user);
        state.users.insert(username.to_string(), user);

        debug!("Created remote account {}", username);
        Ok(account)
    }

    async fn get_balance(&self, account: &Account) -> Result<Balance, TransferError> {
        let mut state = self.state();
        state.calls.balance += 1;
        let user = Self::authorized(&mut state, account)?;
        Ok(user.balance.clone())
    }

    async fn upload_file(
        &self,
        account: &Account,
        data: Vec<u8>,
        file_name: &str,
        progress: ProgressFn<'_>,
    ) -> Result<UploadReceipt, TransferError> {
        let receipt = {
            let mut state = self.state();
            state.calls.upload += 1;
            let user = Self::authorized(&mut state, account)?;

            // Re-uploading a name overwrites the content but keeps its id.
            let id = user
                .files
                .get(file_name)
                .map(|f| f.id.clone())
                .unwrap_or_else(|| FileId::new(Uuid::new_v4().to_string()));
            let size = data.len() as u64;
            user.files.insert(
                file_name.to_string(),
                StoredFile {
                    id: id.clone(),
                    data,
                },
            );

            UploadReceipt {
                file_id: id,
                file_name: file_name.to_string(),
                size,
            }
        };

        for pct in [0, 25, 50, 75, 100] {
            progress(pct);
        }
        Ok(receipt)
    }

    async fn download_file(
        &self,
        account: &Account,
        file_name: &str,
    ) -> Result<Vec<u8>, TransferError> {
        let mut state = self.state();
        state.calls.download += 1;
        if state.failing_downloads.contains(file_name) {
            return Err(TransferError::Network(format!(
                "download of {} interrupted",
                file_name
            )));
        }
        let user = Self::authorized(&mut state, account)?;

        user.files
            .get(file_name)
            .map(|f| f.data.clone())
            .ok_or_else(|| TransferError::NotFound(file_name.to_string()))
    }

    async fn delete_file(&self, account: &Account, file_name: &str) -> Result<(), TransferError> {
        let mut state = self.state();
        state.calls.delete += 1;
        let user = Self::authorized(&mut state, account)?;

        user.files
            .remove(file_name)
            .map(|_| ())
            .ok_or_else(|| TransferError::NotFound(file_name.to_string()))
    }

    async fn create_public_link(
        &self,
        account: &Account,
        file_name: &str,
    ) -> Result<String, TransferError> {
        let mut state = self.state();
        state.calls.share += 1;
        let user = Self::authorized(&mut state, account)?;

        let file = user
            .files
            .get(file_name)
            .ok_or_else(|| TransferError::NotFound(file_name.to_string()))?;
        Ok(format!(
            "memory://share/{}/{}",
            user.user_id,
            file.id.as_str()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU8, Ordering};

    fn no_progress(_: u8) {}

    #[tokio::test]
    async fn test_create_and_login() {
        let backend = MemoryBackend::new();
        let created = backend.create_account("alice123", "Passw0rd!1").await.unwrap();
        let logged_in = backend.login("alice123", "Passw0rd!1").await.unwrap();
        assert_eq!(created, logged_in);

        let err = backend.login("alice123", "wrong").await.unwrap_err();
        assert_eq!(err, AuthError::InvalidCredentials);
    }

    #[tokio::test]
    async fn test_duplicate_username() {
        let backend = MemoryBackend::new();
        backend.create_account("alice123", "Passw0rd!1").await.unwrap();
        let err = backend.create_account("alice123", "Other0ne!").await.unwrap_err();
        assert!(matches!(err, AuthError::UsernameExists { .. }));
    }

    #[tokio::test]
    async fn test_upload_download_delete() {
        let backend = MemoryBackend::new();
        let account = backend.create_account("alice123", "Passw0rd!1").await.unwrap();

        let last = AtomicU8::new(0);
        let receipt = backend
            .upload_file(&account, b"hello".to_vec(), "a.txt", &|p| {
                last.store(p, Ordering::SeqCst)
            })
            .await
            .unwrap();
        assert_eq!(receipt.size, 5);
        assert_eq!(last.load(Ordering::SeqCst), 100);

        let data = backend.download_file(&account, "a.txt").await.unwrap();
        assert_eq!(data, b"hello");

        backend.delete_file(&account, "a.txt").await.unwrap();
        let err = backend.download_file(&account, "a.txt").await.unwrap_err();
        assert!(matches!(err, TransferError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_reupload_keeps_file_id() {
        let backend = MemoryBackend::new();
        let account = backend.create_account("alice123", "Passw0rd!1").await.unwrap();
        let first = backend
            .upload_file(&account, vec![1], "a.txt", &no_progress)
            .await
            .unwrap();
        let second = backend
            .upload_file(&account, vec![1, 2], "a.txt", &no_progress)
            .await
            .unwrap();
        assert_eq!(first.file_id, second.file_id);
        assert_eq!(second.size, 2);
    }

    #[tokio::test]
    async fn test_offline_and_unauthorized() {
        let backend = MemoryBackend::new();
        let account = backend.create_account("alice123", "Passw0rd!1").await.unwrap();

        let mut forged = account.clone();
        forged.user_app_key = "forged".to_string();
        assert_eq!(
            backend.get_balance(&forged).await.unwrap_err(),
            TransferError::Unauthorized
        );

        backend.set_offline(true);
        assert!(matches!(
            backend.get_balance(&account).await.unwrap_err(),
            TransferError::Network(_)
        ));
        assert!(matches!(
            backend.login("alice123", "Passw0rd!1").await.unwrap_err(),
            AuthError::Network(_)
        ));
    }

    #[tokio::test]
    async fn test_call_log() {
        let backend = MemoryBackend::new();
        let account = backend.create_account("alice123", "Passw0rd!1").await.unwrap();
        backend.get_balance(&account).await.unwrap();
        let calls = backend.calls();
        assert_eq!(calls.create_account, 1);
        assert_eq!(calls.balance, 1);
        assert_eq!(calls.total(), 2);
    }
}
