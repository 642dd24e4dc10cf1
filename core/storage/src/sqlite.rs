//! SQLite-backed key-value store.
//!
//! Persists session and index state on the local device so they survive a
//! restart.

use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

use crate::kv::{KeyValueStore, StoreResult};
use pipestash_common::StoreError;

fn backend_err(e: rusqlite::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

/// Key-value store in a single SQLite table.
///
/// Thread-safe: the connection is protected by a `Mutex`.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Create or open a store database.
    ///
    /// # Errors
    /// - Database creation or schema initialization failure
    pub fn open(db_path: impl AsRef<Path>) -> StoreResult<Self> {
        let db_path = db_path.as_ref();
        let conn = Connection::open(db_path).map_err(backend_err)?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            "#,
        )
        .map_err(backend_err)?;

        info!("Local store opened at {}", db_path.display());
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory store (for testing).
    pub fn in_memory() -> StoreResult<Self> {
        Self::open(":memory:")
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        self.conn()
            .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()
            .map_err(backend_err)
    }

    fn put(&self, key: &str, value: &str) -> StoreResult<()> {
        debug!("Writing key {}", key);
        self.conn()
            .execute(
                "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
                params![key, value],
            )
            .map_err(backend_err)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        debug!("Removing key {}", key);
        self.conn()
            .execute("DELETE FROM kv WHERE key = ?1", params![key])
            .map_err(backend_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_store_operations() {
        let store = SqliteStore::in_memory().unwrap();

        store.put("pipestash.account", "{}").unwrap();
        assert_eq!(
            store.get("pipestash.account").unwrap().as_deref(),
            Some("{}")
        );

        store.put("pipestash.account", "[]").unwrap();
        assert_eq!(
            store.get("pipestash.account").unwrap().as_deref(),
            Some("[]")
        );

        store.remove("pipestash.account").unwrap();
        assert!(store.get("pipestash.account").unwrap().is_none());
    }

    #[test]
    fn test_values_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.db");

        {
            let store = SqliteStore::open(&path).unwrap();
            store.put("k", "v").unwrap();
        }

        let reopened = SqliteStore::open(&path).unwrap();
        assert_eq!(reopened.get("k").unwrap().as_deref(), Some("v"));
    }
}
