//! Application entry point: login, account creation, resume and logout.

use std::sync::Arc;
use tracing::info;

use pipestash_account::AccountSession;
use pipestash_common::{Account, Result};
use pipestash_storage::{KeyValueStore, RemoteStorageClient, SqliteStore};

use crate::config::ClientConfig;
use crate::session::ActiveSession;

/// Root object of a client installation.
///
/// Holds the configuration, the backend client and the durable store, and
/// hands out one [`ActiveSession`] per logged-in account.
pub struct PipeStash {
    config: ClientConfig,
    client: Arc<dyn RemoteStorageClient>,
    store: Arc<dyn KeyValueStore>,
    accounts: AccountSession,
}

impl PipeStash {
    /// Build from explicit parts.
    pub fn new(
        config: ClientConfig,
        client: Arc<dyn RemoteStorageClient>,
        store: Arc<dyn KeyValueStore>,
    ) -> Self {
        let accounts = AccountSession::new(client.clone(), store.clone());
        Self {
            config,
            client,
            store,
            accounts,
        }
    }

    /// Build with the on-disk store described by `config`.
    ///
    /// # Errors
    /// - Invalid configuration
    /// - Directories or database cannot be created
    pub fn open(config: ClientConfig, client: Arc<dyn RemoteStorageClient>) -> Result<Self> {
        config.validate()?;
        config.ensure_dirs()?;
        let store = Arc::new(SqliteStore::open(config.database_path())?);
        info!("Using backend {}", client.name());
        Ok(Self::new(config, client, store))
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn accounts(&self) -> &AccountSession {
        &self.accounts
    }

    /// Log in and open a session. The account is persisted only once the
    /// session is open.
    pub async fn login(&self, username: &str, password: &str) -> Result<ActiveSession> {
        let account = self.accounts.login(username, password).await?;
        self.start(account).await
    }

    /// Create an account, then open a session for it.
    pub async fn create_account(&self, username: &str, password: &str) -> Result<ActiveSession> {
        let account = self.accounts.create_account(username, password).await?;
        self.start(account).await
    }

    /// Open a session for the persisted account, if there is one.
    pub async fn resume(&self) -> Result<Option<ActiveSession>> {
        match self.accounts.load_persisted()? {
            Some(account) => {
                info!("Resuming session for {}", account.username);
                Ok(Some(self.open_session(account).await?))
            }
            None => Ok(None),
        }
    }

    /// Close `session` and forget the persisted account.
    pub fn logout(&self, session: ActiveSession) -> Result<()> {
        let username = session.account().username.clone();
        session.close();
        self.accounts.clear()?;
        info!("Logged out {}", username);
        Ok(())
    }

    async fn start(&self, account: Account) -> Result<ActiveSession> {
        let session = self.open_session(account).await?;
        self.accounts.persist(session.account())?;
        Ok(session)
    }

    async fn open_session(&self, account: Account) -> Result<ActiveSession> {
        ActiveSession::open(
            account,
            self.client.clone(),
            self.store.clone(),
            self.config.download_dir.clone(),
        )
        .await
    }
}
