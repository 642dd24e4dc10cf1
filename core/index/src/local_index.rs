//! Account-scoped local index of uploaded files.
//!
//! Persists the ordered list of known uploads in the durable key-value store,
//! one entry per account, so the file list survives a restart. The index is a
//! presentation ledger only; the backend stays authoritative for existence.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

use pipestash_common::{FileId, FileRecord, Result, StoreError};
use pipestash_storage::KeyValueStore;

/// Prefix of the per-account store key.
const INDEX_KEY_PREFIX: &str = "pipestash.index.v1.";

/// Store key holding the index of `username`.
pub fn index_key(username: &str) -> String {
    format!("{}{}", INDEX_KEY_PREFIX, username)
}

/// Result of [`LocalFileIndex::add_file`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// A new record was appended.
    Inserted,
    /// A record with the same id existed and was replaced in place.
    Replaced,
}

/// Ordered, durable record store of one account's uploads.
///
/// Every mutation is written through to the store before it returns. If the
/// write fails the in-memory view is left as it was.
pub struct LocalFileIndex {
    store: Arc<dyn KeyValueStore>,
    username: String,
    key: String,
    records: Mutex<Vec<FileRecord>>,
}

impl LocalFileIndex {
    /// Open the index of `username`, loading any persisted records.
    ///
    /// A persisted value that cannot be decoded is discarded and the index
    /// starts empty; it is overwritten by the next mutation.
    ///
    /// # Errors
    /// - Store read failure
    pub fn open(store: Arc<dyn KeyValueStore>, username: &str) -> Result<Self> {
        let key = index_key(username);
        let records: Vec<FileRecord> = match store.get(&key)? {
            Some(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!("Discarding unreadable file index for {}: {}", username, e);
                Vec::new()
            }),
            None => Vec::new(),
        };

        info!("Opened file index for {} ({} records)", username, records.len());
        Ok(Self {
            store,
            username: username.to_string(),
            key,
            records: Mutex::new(records),
        })
    }

    fn records(&self) -> MutexGuard<'_, Vec<FileRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The account this index belongs to.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// All records in insertion order.
    pub fn list_files(&self) -> Vec<FileRecord> {
        self.records().clone()
    }

    /// Get a record by id.
    pub fn get(&self, file_id: &FileId) -> Option<FileRecord> {
        self.records()
            .iter()
            .find(|r| &r.file_id == file_id)
            .cloned()
    }

    /// Get the first record with the given file name.
    pub fn find_by_name(&self, file_name: &str) -> Option<FileRecord> {
        self.records()
            .iter()
            .find(|r| r.file_name == file_name)
            .cloned()
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records().len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.records().is_empty()
    }

    /// Append a record.
    ///
    /// A record whose id is already present replaces the existing one at the
    /// same position.
    pub fn add_file(&self, record: FileRecord) -> Result<AddOutcome> {
        let mut records = self.records();
        let mut next = records.clone();

        let outcome = match next.iter().position(|r| r.file_id == record.file_id) {
            Some(pos) => {
                next[pos] = record;
                AddOutcome::Replaced
            }
            None => {
                next.push(record);
                AddOutcome::Inserted
            }
        };

        self.persist(&next)?;
        *records = next;

        debug!("Index {}: add {:?}", self.username, outcome);
        Ok(outcome)
    }

    /// Remove the record with `file_id`, returning it if it was present.
    ///
    /// Removing an absent id is a no-op.
    pub fn remove_file(&self, file_id: &FileId) -> Result<Option<FileRecord>> {
        let mut records = self.records();
        let Some(pos) = records.iter().position(|r| &r.file_id == file_id) else {
            return Ok(None);
        };

        let mut next = records.clone();
        let removed = next.remove(pos);
        self.persist(&next)?;
        *records = next;

        debug!("Index {}: removed {}", self.username, file_id);
        Ok(Some(removed))
    }

    fn persist(&self, records: &[FileRecord]) -> Result<()> {
        let raw = serde_json::to_string(records).map_err(StoreError::from)?;
        self.store.put(&self.key, &raw)?;
        Ok(())
    }
}
