//! Remote storage client trait definition.

use async_trait::async_trait;

use pipestash_common::{Account, AuthError, Balance, TransferError, UploadReceipt};

/// Progress callback for uploads, called with a percentage in `0..=100`.
pub type ProgressFn<'a> = &'a (dyn Fn(u8) + Send + Sync);

/// Authenticated operations against the decentralized storage backend.
///
/// All operations are async and each call is treated as atomic by the
/// caller: it either fully succeeds or has no effect on local state.
/// Implementations own their transport, retries and timeouts.
#[async_trait]
pub trait RemoteStorageClient: Send + Sync {
    /// Get the backend name (e.g., "memory", "pipe").
    fn name(&self) -> &str;

    /// Authenticate an existing user.
    ///
    /// # Errors
    /// - `InvalidCredentials` when the username/password pair is rejected
    /// - `Network` when the backend cannot be reached
    async fn login(&self, username: &str, password: &str) -> Result<Account, AuthError>;

    /// Register a new user and return its credential bundle.
    ///
    /// # Errors
    /// - `UsernameExists` when the name is taken
    /// - `Network` when the backend cannot be reached
    async fn create_account(&self, username: &str, password: &str)
        -> Result<Account, AuthError>;

    /// Query the current balance for an account.
    async fn get_balance(&self, account: &Account) -> Result<Balance, TransferError>;

    /// Upload a file.
    ///
    /// # Postconditions
    /// - `progress` has been called with percentages ending at 100
    /// - Returns the backend's receipt for the stored object
    async fn upload_file(
        &self,
        account: &Account,
        data: Vec<u8>,
        file_name: &str,
        progress: ProgressFn<'_>,
    ) -> Result<UploadReceipt, TransferError>;

    /// Download the complete content of a file.
    ///
    /// # Errors
    /// - `NotFound` when no such file exists for the account
    async fn download_file(&self, account: &Account, file_name: &str)
        -> Result<Vec<u8>, TransferError>;

    /// Delete a file.
    ///
    /// # Errors
    /// - `NotFound` when no such file exists for the account
    async fn delete_file(&self, account: &Account, file_name: &str) -> Result<(), TransferError>;

    /// Issue a public link for a file.
    async fn create_public_link(
        &self,
        account: &Account,
        file_name: &str,
    ) -> Result<String, TransferError>;
}
