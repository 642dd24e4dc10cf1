//! Common utilities and types shared across PipeStash modules.
//!
//! This module provides the data model (accounts, file records, balances),
//! credential validation and the error taxonomy used by every other crate.

pub mod error;
pub mod types;
pub mod validation;

pub use error::{AuthError, Error, Result, StoreError, TransferError, ValidationError};
pub use types::{Account, Balance, FileId, FileRecord, ShareLink, UploadReceipt};
