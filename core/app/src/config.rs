//! Client configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use pipestash_common::validation::validate_file_name;
use pipestash_common::{Error, Result};

/// Default name of the local state database.
pub const DEFAULT_DATABASE_FILE: &str = "pipestash.db";

/// Settings for one client installation.
///
/// Stored as JSON. Missing fields fall back to their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Directory holding the local state database.
    pub data_dir: PathBuf,
    /// Directory downloaded files are saved to.
    pub download_dir: PathBuf,
    /// File name of the state database inside `data_dir`.
    pub database_file: String,
    /// `tracing` filter used when `RUST_LOG` is not set.
    pub log_filter: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("pipestash");
        let download_dir = dirs::download_dir().unwrap_or_else(|| data_dir.join("downloads"));

        Self {
            data_dir,
            download_dir,
            database_file: DEFAULT_DATABASE_FILE.to_string(),
            log_filter: "info".to_string(),
        }
    }
}

impl ClientConfig {
    /// Configuration rooted at `data_dir`, with downloads inside it.
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            download_dir: data_dir.join("downloads"),
            data_dir,
            ..Self::default()
        }
    }

    /// Load configuration from a JSON file.
    ///
    /// # Errors
    /// - File cannot be read
    /// - Content is not valid configuration
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&raw)
            .map_err(|e| Error::Config(format!("{}: {}", path.as_ref().display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Write configuration to a JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let raw = serde_json::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))?;
        std::fs::write(path, raw)?;
        Ok(())
    }

    /// Check that the settings are usable.
    pub fn validate(&self) -> Result<()> {
        validate_file_name(&self.database_file)
            .map_err(|e| Error::Config(format!("database_file: {}", e)))?;
        if self.download_dir.as_os_str().is_empty() {
            return Err(Error::Config("download_dir cannot be empty".to_string()));
        }
        Ok(())
    }

    /// Full path of the state database.
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.database_file)
    }

    /// Create the data and download directories if missing.
    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir)?;
        std::fs::create_dir_all(&self.download_dir)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");

        let config = ClientConfig::with_data_dir(dir.path());
        config.save(&path).unwrap();

        let loaded = ClientConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.database_path(), dir.path().join("pipestash.db"));
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"log_filter": "debug"}"#).unwrap();

        let loaded = ClientConfig::load(&path).unwrap();
        assert_eq!(loaded.log_filter, "debug");
        assert_eq!(loaded.database_file, DEFAULT_DATABASE_FILE);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");

        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(ClientConfig::load(&path), Err(Error::Config(_))));

        std::fs::write(&path, r#"{"database_file": "../escape.db"}"#).unwrap();
        assert!(matches!(ClientConfig::load(&path), Err(Error::Config(_))));

        let missing = dir.path().join("absent.json");
        assert!(matches!(ClientConfig::load(&missing), Err(Error::Io(_))));
    }

    #[test]
    fn test_ensure_dirs() {
        let dir = TempDir::new().unwrap();
        let config = ClientConfig::with_data_dir(dir.path().join("nested"));
        config.ensure_dirs().unwrap();
        assert!(config.data_dir.is_dir());
        assert!(config.download_dir.is_dir());
    }
}
