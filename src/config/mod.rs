//! # Configuration Management Module
//!
//! TOML configuration for the civprogress binary and for embedders that want
//! the same defaults.
//!
//! ## Configuration Structure
//!
//! - [`StorageConfig`] - where the local key-value cache lives
//! - [`RemoteConfig`] - the file-backed remote profile store
//! - [`ProgressConfig`] - civilization whitelist, catalog seed, post-load steps
//! - [`LoggingConfig`] - log level and optional log file
//!
//! Every section is optional in the file; missing sections take their defaults.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use civprogress::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     Config::create_default("config.toml").await?;
//!     let config = Config::load("config.toml").await?;
//!     config.validate()?;
//!     println!("Cache: {}", config.kv_path().display());
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration File Format
//!
//! ```toml
//! [storage]
//! data_dir = "./data"
//!
//! [remote]
//! enabled = true
//! max_profile_bytes = 262144
//!
//! [progress]
//! civilizations = ["Sumerian", "Akkadian", "Babylonian", "Assyrian"]
//! migrate_legacy_on_login = true
//! sync_after_load = true
//!
//! [logging]
//! level = "info"
//! file = "civprogress.log"
//! ```

use std::collections::HashSet;
use std::path::PathBuf;

use anyhow::{anyhow, bail, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::progress::civilization::DEFAULT_CIVILIZATIONS;
use crate::progress::remote::DEFAULT_MAX_PROFILE_BYTES;
use crate::progress::unlock::UnlockOptions;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub progress: ProgressConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: "./data".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// When false every fetch/store fails and the local cache carries progress alone.
    pub enabled: bool,
    /// Defaults to `<data_dir>/profiles`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_dir: Option<String>,
    #[serde(default = "default_max_profile_bytes")]
    pub max_profile_bytes: usize,
}

fn default_max_profile_bytes() -> usize {
    DEFAULT_MAX_PROFILE_BYTES
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            profile_dir: None,
            max_profile_bytes: DEFAULT_MAX_PROFILE_BYTES,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressConfig {
    /// Whitelist in narrative order; the first entry is always open.
    #[serde(default = "default_civilizations")]
    pub civilizations: Vec<String>,
    #[serde(default = "default_true")]
    pub migrate_legacy_on_login: bool,
    #[serde(default = "default_true")]
    pub sync_after_load: bool,
    /// JSON catalog replacing the built-in achievements and artifacts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry_seed: Option<String>,
}

fn default_civilizations() -> Vec<String> {
    DEFAULT_CIVILIZATIONS.iter().map(|s| s.to_string()).collect()
}

fn default_true() -> bool {
    true
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            civilizations: default_civilizations(),
            migrate_legacy_on_login: true,
            sync_after_load: true,
            registry_seed: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: Some("civprogress.log".to_string()),
        }
    }
}

impl LoggingConfig {
    pub fn level_filter(&self) -> Option<log::LevelFilter> {
        self.level.parse().ok()
    }
}

impl Config {
    /// Load configuration from a file
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;

        Ok(config)
    }

    /// Create a default configuration file
    pub async fn create_default(path: &str) -> Result<()> {
        let content = toml::to_string_pretty(&Config::default())
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.storage.data_dir.trim().is_empty() {
            bail!("storage.data_dir must not be empty");
        }
        if self.remote.max_profile_bytes == 0 {
            bail!("remote.max_profile_bytes must be greater than zero");
        }
        if self.progress.civilizations.is_empty() {
            bail!("progress.civilizations must name at least one civilization");
        }
        let mut seen = HashSet::new();
        for name in &self.progress.civilizations {
            if name.trim().is_empty() || name.chars().any(char::is_whitespace) {
                bail!("invalid civilization name '{}'", name);
            }
            if !seen.insert(name.as_str()) {
                bail!("civilization '{}' listed twice", name);
            }
        }
        if self.logging.level_filter().is_none() {
            bail!("unknown logging.level '{}'", self.logging.level);
        }
        Ok(())
    }

    pub fn kv_path(&self) -> PathBuf {
        PathBuf::from(&self.storage.data_dir).join("progress.db")
    }

    pub fn profile_dir(&self) -> PathBuf {
        match &self.remote.profile_dir {
            Some(dir) => PathBuf::from(dir),
            None => PathBuf::from(&self.storage.data_dir).join("profiles"),
        }
    }

    pub fn unlock_options(&self) -> UnlockOptions {
        UnlockOptions {
            migrate_legacy_on_ready: self.progress.migrate_legacy_on_login,
            sync_after_load: self.progress.sync_after_load,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.progress.civilizations[0], "Sumerian");
        assert!(config.remote.enabled);
        assert_eq!(config.profile_dir(), PathBuf::from("./data").join("profiles"));
    }

    #[test]
    fn missing_sections_take_defaults() {
        let config: Config = toml::from_str("[storage]\ndata_dir = \"/tmp/civ\"\n").unwrap();
        assert_eq!(config.kv_path(), PathBuf::from("/tmp/civ/progress.db"));
        assert_eq!(config.remote.max_profile_bytes, DEFAULT_MAX_PROFILE_BYTES);
        assert!(config.progress.sync_after_load);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut config = Config::default();
        config.progress.civilizations.push("Sumerian".to_string());
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.logging.level = "loud".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.progress.civilizations.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn unlock_options_follow_progress_section() {
        let mut config = Config::default();
        config.progress.migrate_legacy_on_login = false;
        let options = config.unlock_options();
        assert!(!options.migrate_legacy_on_ready);
        assert!(options.sync_after_load);
    }

    #[tokio::test]
    async fn default_file_round_trips() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        let path = path.to_str().unwrap();
        Config::create_default(path).await.unwrap();
        let loaded = Config::load(path).await.unwrap();
        assert_eq!(loaded.progress.civilizations, default_civilizations());
        assert_eq!(loaded.logging.file.as_deref(), Some("civprogress.log"));
    }
}
