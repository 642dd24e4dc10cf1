//! Error taxonomy for PipeStash.
//!
//! Each failure class has its own enum so callers can match exhaustively at
//! the boundary. [`Error`] wraps all of them for code paths that can fail in
//! more than one way.

use thiserror::Error;

/// Client-side format violation, raised before any network call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Username is empty.
    #[error("Username is required")]
    EmptyUsername,

    /// Username length is outside the accepted range.
    #[error("Username must be {min}-{max} characters, got {actual}")]
    UsernameLength {
        min: usize,
        max: usize,
        actual: usize,
    },

    /// Username must start with a letter.
    #[error("Username must start with a letter")]
    UsernameStart,

    /// Username contains a character outside the accepted set.
    #[error("Username contains invalid character {0:?}")]
    UsernameCharacter(char),

    /// Password is empty.
    #[error("Password is required")]
    EmptyPassword,

    /// Password length is outside the accepted range.
    #[error("Password must be {min}-{max} characters, got {actual}")]
    PasswordLength {
        min: usize,
        max: usize,
        actual: usize,
    },

    /// Password lacks a required character class.
    #[error("Password must contain at least one {0}")]
    PasswordMissing(&'static str),

    /// File name cannot be used for upload or saving.
    #[error("Invalid file name: {0}")]
    FileName(String),
}

/// Authentication failure from login or account creation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// Username/password pair was rejected.
    #[error("Invalid username or password")]
    InvalidCredentials,

    /// Account creation hit an existing username.
    #[error("Username already exists: {username}")]
    UsernameExists { username: String },

    /// The backend refused the request for this identity.
    #[error("Not authorized")]
    Unauthorized,

    /// The backend could not be reached.
    #[error("Network error: {0}")]
    Network(String),
}

/// Failure of a remote transfer operation (upload, download, delete, share,
/// balance).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransferError {
    /// The remote object does not exist.
    #[error("Remote file not found: {0}")]
    NotFound(String),

    /// The backend refused the request for this identity.
    #[error("Not authorized")]
    Unauthorized,

    /// The backend could not be reached.
    #[error("Network error: {0}")]
    Network(String),

    /// The backend reached a decision and rejected the operation.
    #[error("Rejected by backend: {0}")]
    Rejected(String),
}

/// Failure of the durable local key-value store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The underlying storage engine failed.
    #[error("Store backend error: {0}")]
    Backend(String),

    /// A stored value could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Top-level error type for PipeStash operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Transfer(#[from] TransferError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration could not be loaded or is invalid.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias using the common Error.
pub type Result<T> = std::result::Result<T, Error>;
