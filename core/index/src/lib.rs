//! Local file index for PipeStash.
//!
//! Tracks which files the active account has pushed to the backend, in upload
//! order, scoped per account.

pub mod local_index;

pub use local_index::{index_key, AddOutcome, LocalFileIndex};
