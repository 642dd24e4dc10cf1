//! Storage abstractions for PipeStash.
//!
//! Two kinds of storage live here:
//! - [`RemoteStorageClient`]: the authoritative decentralized backend, reached
//!   over the network. [`MemoryBackend`] implements it in memory.
//! - [`KeyValueStore`]: small durable local state (the active account and the
//!   per-account file index). [`SqliteStore`] persists to disk,
//!   [`MemoryStore`] does not.

pub mod kv;
pub mod memory;
pub mod provider;
pub mod sqlite;

pub use kv::{KeyValueStore, MemoryStore, StoreResult};
pub use memory::{CallLog, MemoryBackend};
pub use provider::{ProgressFn, RemoteStorageClient};
pub use sqlite::SqliteStore;
