//! Common types used throughout PipeStash.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Backend-assigned identifier of an uploaded file, unique within an account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(String);

impl FileId {
    /// Create a new FileId from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for FileId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Identity credential bundle for one storage-backend user.
///
/// The password and app key are zeroized when the account is dropped and
/// never appear in `Debug` output.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct Account {
    pub username: String,
    pub password: String,
    pub user_id: String,
    pub user_app_key: String,
}

impl Account {
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        user_id: impl Into<String>,
        user_app_key: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            user_id: user_id.into(),
            user_app_key: user_app_key.into(),
        }
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("username", &self.username)
            .field("user_id", &self.user_id)
            .field("password", &"[REDACTED]")
            .field("user_app_key", &"[REDACTED]")
            .finish()
    }
}

/// Local metadata entry for one file known to have been uploaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub file_id: FileId,
    pub file_name: String,
    pub size: u64,
    pub uploaded_at: DateTime<Utc>,
}

impl FileRecord {
    /// Build a record from a successful upload, stamped with `uploaded_at`.
    pub fn from_receipt(receipt: UploadReceipt, uploaded_at: DateTime<Utc>) -> Self {
        Self {
            file_id: receipt.file_id,
            file_name: receipt.file_name,
            size: receipt.size,
            uploaded_at,
        }
    }
}

/// What the backend reports after an upload completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadReceipt {
    pub file_id: FileId,
    pub file_name: String,
    pub size: u64,
}

/// Account balance. Recomputed on demand, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Balance {
    pub pipe: f64,
    pub sol: f64,
    pub public_key: String,
}

/// A public link issued for one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareLink {
    pub file_name: String,
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_debug_redacts_secrets() {
        let account = Account::new("alice123", "Passw0rd!1", "uid-1", "app-key-xyz");
        let rendered = format!("{:?}", account);
        assert!(rendered.contains("alice123"));
        assert!(!rendered.contains("Passw0rd!1"));
        assert!(!rendered.contains("app-key-xyz"));
    }

    #[test]
    fn test_account_serialization() {
        let account = Account::new("alice123", "Passw0rd!1", "uid-1", "key");
        let json = serde_json::to_string(&account).unwrap();
        let restored: Account = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, account);
    }

    #[test]
    fn test_file_id_serializes_as_string() {
        let id = FileId::new("abc");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"abc\"");
    }

    #[test]
    fn test_record_from_receipt() {
        let now = Utc::now();
        let record = FileRecord::from_receipt(
            UploadReceipt {
                file_id: FileId::new("f1"),
                file_name: "photo.png".to_string(),
                size: 42,
            },
            now,
        );
        assert_eq!(record.file_id.as_str(), "f1");
        assert_eq!(record.size, 42);
        assert_eq!(record.uploaded_at, now);
    }
}
