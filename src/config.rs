//! Configuration file handling.
//!
//! The configuration file is TOML and lives at:
//! - Linux: `~/.config/cvewatch/config.toml`
//! - macOS: `~/Library/Application Support/cvewatch/config.toml`
//! - Windows: `%APPDATA%\cvewatch\config.toml`
//!
//! # Example Configuration
//!
//! ```toml
//! query = "CVE-20"
//! enable_related_query = true
//! data_dir = "/var/lib/cvewatch"
//! blacklist_file = "blacklist.yaml"
//! cache_ttl_hours = 24
//! message_limit = 150
//!
//! [search]
//! api_url = "https://api.github.com/search/repositories"
//! token_env = "GITHUB_TOKEN"
//! per_page = 30
//!
//! [notify]
//! enabled = true
//! webhook_url = "https://oapi.dingtalk.com/robot/send"
//! token_env = "DING_TOKEN"
//! secret_env = "DING_SECRET"
//! ```
//!
//! Credentials are never stored in the file; only the names of the
//! environment variables that hold them.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::platform::config_dir;

/// Application configuration.
///
/// ```
/// use cvewatch::Config;
///
/// let config = Config::default();
/// assert_eq!(config.query, "CVE-20");
/// assert!(config.enable_related_query);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Keyword for the primary search.
    ///
    /// Default: "CVE-20"
    pub query: String,

    /// Whether every CVE found by the primary search gets its own search.
    ///
    /// Default: true
    pub enable_related_query: bool,

    /// Root directory for history files, dated logs and run result sets.
    ///
    /// Default: "." (the working directory)
    pub data_dir: PathBuf,

    /// Owner blacklist, relative to `data_dir` unless absolute.
    ///
    /// Default: "blacklist.yaml"
    pub blacklist_file: PathBuf,

    /// How long vulnerability descriptions are cached, in hours.
    ///
    /// Default: 24
    pub cache_ttl_hours: u64,

    /// Maximum characters of a repository description in a notification.
    ///
    /// Default: 150
    pub message_limit: usize,

    pub search: SearchConfig,

    pub notify: NotifyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Repository search endpoint.
    pub api_url: String,

    /// Environment variable holding an optional API token.
    pub token_env: String,

    /// Results requested per search.
    pub per_page: u32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.github.com/search/repositories".to_string(),
            token_env: "GITHUB_TOKEN".to_string(),
            per_page: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    pub enabled: bool,

    /// Robot webhook endpoint.
    pub webhook_url: String,

    /// Environment variable holding the robot access token.
    pub token_env: String,

    /// Environment variable holding the robot signing secret.
    pub secret_env: String,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            webhook_url: "https://oapi.dingtalk.com/robot/send".to_string(),
            token_env: "DING_TOKEN".to_string(),
            secret_env: "DING_SECRET".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            query: "CVE-20".to_string(),
            enable_related_query: true,
            data_dir: PathBuf::from("."),
            blacklist_file: PathBuf::from("blacklist.yaml"),
            cache_ttl_hours: 24,
            message_limit: 150,
            search: SearchConfig::default(),
            notify: NotifyConfig::default(),
        }
    }
}

impl Config {
    /// Loads configuration from the default config file.
    ///
    /// If the file doesn't exist, returns the default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Loads configuration from `path`, falling back to defaults if it doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content =
            fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        let config: Config =
            toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;
        Ok(config)
    }

    /// Saves the configuration to `path`, creating the parent directory if needed.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        config_dir().join("config.toml")
    }

    /// Path of the blacklist file, resolved against `data_dir`.
    pub fn blacklist_path(&self) -> PathBuf {
        if self.blacklist_file.is_absolute() {
            self.blacklist_file.clone()
        } else {
            self.data_dir.join(&self.blacklist_file)
        }
    }

    /// The default configuration as TOML.
    pub fn generate_default_config() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();

        assert_eq!(config.query, "CVE-20");
        assert!(config.enable_related_query);
        assert_eq!(config.cache_ttl_hours, 24);
        assert_eq!(config.message_limit, 150);
        assert_eq!(config.notify.token_env, "DING_TOKEN");
        assert_eq!(config.notify.secret_env, "DING_SECRET");
        assert_eq!(config.search.per_page, 30);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            enable_related_query = false
            data_dir = "/srv/cve"

            [notify]
            enabled = false
            "#,
        )
        .unwrap();

        assert!(!config.enable_related_query);
        assert_eq!(config.data_dir, PathBuf::from("/srv/cve"));
        assert!(!config.notify.enabled);
        assert_eq!(config.notify.token_env, "DING_TOKEN");
        assert_eq!(config.query, "CVE-20");
    }

    #[test]
    fn test_blacklist_path_resolution() {
        let mut config = Config {
            data_dir: PathBuf::from("/srv/cve"),
            ..Config::default()
        };
        assert_eq!(
            config.blacklist_path(),
            PathBuf::from("/srv/cve/blacklist.yaml")
        );

        config.blacklist_file = PathBuf::from("/etc/cvewatch/blacklist.yaml");
        assert_eq!(
            config.blacklist_path(),
            PathBuf::from("/etc/cvewatch/blacklist.yaml")
        );
    }

    #[test]
    fn test_load_from_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config.query, "CVE-20");
    }

    #[test]
    fn test_load_from_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "query = [").unwrap();
        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_save_to_then_load_from() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = Config {
            query: "CVE-2024".to_string(),
            message_limit: 80,
            ..Config::default()
        };

        config.save_to(&path).unwrap();
        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.query, "CVE-2024");
        assert_eq!(loaded.message_limit, 80);
    }

    #[test]
    fn test_default_config_round_trips() {
        let text = Config::generate_default_config();
        let config: Config = toml::from_str(&text).unwrap();
        assert_eq!(config.query, "CVE-20");
        assert_eq!(config.notify.webhook_url, "https://oapi.dingtalk.com/robot/send");
    }
}
