//! Account session management.
//!
//! Authenticates against the backend and keeps the single active identity in
//! the durable local store. Credential format is checked before any network
//! call.

use std::sync::Arc;
use tracing::{debug, info, warn};

use pipestash_common::validation::{
    validate_login_password, validate_new_password, validate_username,
};
use pipestash_common::{Account, Result, StoreError};
use pipestash_storage::{KeyValueStore, RemoteStorageClient};

/// Store key holding the active account.
pub const ACCOUNT_KEY: &str = "pipestash.account";

/// Login, account creation and persistence of the active account.
///
/// Only one account is persisted at a time. `login` and `create_account`
/// never touch the persisted value; callers persist on success.
pub struct AccountSession {
    client: Arc<dyn RemoteStorageClient>,
    store: Arc<dyn KeyValueStore>,
}

impl AccountSession {
    pub fn new(client: Arc<dyn RemoteStorageClient>, store: Arc<dyn KeyValueStore>) -> Self {
        Self { client, store }
    }

    /// Authenticate an existing user.
    ///
    /// # Errors
    /// - `ValidationError` for a malformed username or empty password; the
    ///   backend is not contacted
    /// - `AuthError` from the backend
    pub async fn login(&self, username: &str, password: &str) -> Result<Account> {
        validate_username(username)?;
        validate_login_password(password)?;

        debug!("Logging in {}", username);
        let account = self.client.login(username, password).await.map_err(|e| {
            warn!("Login failed for {}: {}", username, e);
            e
        })?;

        info!("Logged in {}", account.username);
        Ok(account)
    }

    /// Register a new user.
    ///
    /// # Errors
    /// - `ValidationError` when the username or password does not meet the
    ///   format rules; the backend is not contacted
    /// - `AuthError::UsernameExists` and other backend failures
    pub async fn create_account(&self, username: &str, password: &str) -> Result<Account> {
        validate_username(username)?;
        validate_new_password(password)?;

        debug!("Creating account {}", username);
        let account = self
            .client
            .create_account(username, password)
            .await
            .map_err(|e| {
                warn!("Account creation failed for {}: {}", username, e);
                e
            })?;

        info!("Created account {}", account.username);
        Ok(account)
    }

    /// Load the persisted account, if any.
    pub fn load_persisted(&self) -> Result<Option<Account>> {
        let Some(raw) = self.store.get(ACCOUNT_KEY)? else {
            return Ok(None);
        };
        let account = serde_json::from_str(&raw).map_err(StoreError::from)?;
        Ok(Some(account))
    }

    /// Persist `account` as the active account, replacing any previous one.
    pub fn persist(&self, account: &Account) -> Result<()> {
        let raw = serde_json::to_string(account).map_err(StoreError::from)?;
        self.store.put(ACCOUNT_KEY, &raw)?;
        debug!("Persisted account {}", account.username);
        Ok(())
    }

    /// Remove the persisted account unconditionally.
    pub fn clear(&self) -> Result<()> {
        self.store.remove(ACCOUNT_KEY)?;
        info!("Cleared persisted account");
        Ok(())
    }
}
