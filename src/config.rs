//! Configuration management for Roomlet
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::error::{Result, RoomletError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure for Roomlet
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// REST backend settings
    #[serde(default)]
    pub api: ApiConfig,
    /// Notification event stream settings
    #[serde(default)]
    pub stream: StreamConfig,
    /// Local persisted state settings
    #[serde(default)]
    pub storage: StorageConfig,
}

/// REST backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL every request path is resolved against
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout (seconds)
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_base_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_timeout_seconds() -> u64 {
    60
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl ApiConfig {
    /// Request timeout as a [`Duration`]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// Event stream configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Full WebSocket URL; derived from `api.base_url` and `path` when unset
    #[serde(default)]
    pub url: Option<String>,

    /// Stream path on the API host
    #[serde(default = "default_stream_path")]
    pub path: String,

    /// Delay before the first reconnect attempt (milliseconds)
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,

    /// Upper bound for the doubling reconnect delay (milliseconds)
    #[serde(default = "default_reconnect_delay_max_ms")]
    pub reconnect_delay_max_ms: u64,
}

fn default_stream_path() -> String {
    "/notifications".to_string()
}

fn default_reconnect_delay_ms() -> u64 {
    1_000
}

fn default_reconnect_delay_max_ms() -> u64 {
    5_000
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            url: None,
            path: default_stream_path(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
            reconnect_delay_max_ms: default_reconnect_delay_max_ms(),
        }
    }
}

impl StreamConfig {
    /// Resolve the WebSocket endpoint for the given API base URL
    ///
    /// An explicit `url` wins. Otherwise the API scheme is swapped for its
    /// WebSocket counterpart (`http` to `ws`, `https` to `wss`) and `path`
    /// replaces the base path.
    ///
    /// # Examples
    ///
    /// ```
    /// use roomlet::config::StreamConfig;
    ///
    /// let cfg = StreamConfig::default();
    /// let url = cfg.resolve_url("https://api.roomlet.test/v1").unwrap();
    /// assert_eq!(url.as_str(), "wss://api.roomlet.test/notifications");
    /// ```
    pub fn resolve_url(&self, api_base_url: &str) -> Result<url::Url> {
        if let Some(explicit) = &self.url {
            return Ok(url::Url::parse(explicit).map_err(RoomletError::from)?);
        }

        let mut url = url::Url::parse(api_base_url).map_err(RoomletError::from)?;
        let scheme = match url.scheme() {
            "https" => "wss",
            "http" => "ws",
            other => {
                return Err(RoomletError::Config(format!(
                    "cannot derive stream URL from scheme '{}'",
                    other
                ))
                .into())
            }
        };
        url.set_scheme(scheme)
            .map_err(|_| RoomletError::Config("failed to set stream URL scheme".to_string()))?;
        url.set_path(&self.path);
        url.set_query(None);
        Ok(url)
    }

    /// Initial reconnect delay
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    /// Maximum reconnect delay
    pub fn reconnect_delay_max(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_max_ms)
    }
}

/// Backend used for the local key-value store
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    /// OS credential store
    #[default]
    Keyring,
    /// JSON file on disk
    File,
    /// Process memory only
    Memory,
}

/// Local storage configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Which backend holds `userToken` and `hasOnboarded`
    #[serde(default)]
    pub backend: StorageBackend,

    /// File backend location; defaults to the platform data directory
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl StorageConfig {
    /// Resolve the file backend path
    pub fn file_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.path {
            return Ok(path.clone());
        }
        directories::ProjectDirs::from("com", "roomlet", "roomlet")
            .map(|dirs| dirs.data_dir().join("session.json"))
            .ok_or_else(|| {
                RoomletError::Config("could not determine a data directory".to_string()).into()
            })
    }
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// # Arguments
    ///
    /// * `path` - Path to configuration file
    /// * `cli` - CLI arguments for overrides
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| RoomletError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| RoomletError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(base_url) = std::env::var("ROOMLET_API_BASE_URL") {
            self.api.base_url = base_url;
        }

        if let Ok(timeout) = std::env::var("ROOMLET_API_TIMEOUT_SECONDS") {
            if let Ok(value) = timeout.parse() {
                self.api.timeout_seconds = value;
            } else {
                tracing::warn!("Invalid ROOMLET_API_TIMEOUT_SECONDS: {}", timeout);
            }
        }

        if let Ok(stream_url) = std::env::var("ROOMLET_STREAM_URL") {
            self.stream.url = Some(stream_url);
        }

        if let Ok(backend) = std::env::var("ROOMLET_STORAGE_BACKEND") {
            self.storage.backend = match backend.to_lowercase().as_str() {
                "keyring" => StorageBackend::Keyring,
                "file" => StorageBackend::File,
                "memory" => StorageBackend::Memory,
                _ => {
                    tracing::warn!("Invalid storage backend: {}, using default", backend);
                    StorageBackend::default()
                }
            };
        }

        if let Ok(path) = std::env::var("ROOMLET_STORAGE_PATH") {
            self.storage.path = Some(PathBuf::from(path));
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if let Some(base_url) = &cli.base_url {
            tracing::debug!(base_url = %base_url, "CLI override: --base-url");
            self.api.base_url = base_url.clone();
        }
    }

    /// Validate configuration
    ///
    /// # Errors
    ///
    /// Returns [`RoomletError::Config`] describing the first invalid field
    pub fn validate(&self) -> Result<()> {
        if self.api.base_url.trim().is_empty() {
            return Err(RoomletError::Config("api.base_url cannot be empty".to_string()).into());
        }

        let base = url::Url::parse(&self.api.base_url).map_err(|e| {
            RoomletError::Config(format!("api.base_url is not a valid URL: {}", e))
        })?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(RoomletError::Config(format!(
                "api.base_url must use http or https, got '{}'",
                base.scheme()
            ))
            .into());
        }

        if self.api.timeout_seconds == 0 {
            return Err(
                RoomletError::Config("api.timeout_seconds must be greater than 0".to_string())
                    .into(),
            );
        }

        if self.api.timeout_seconds > 600 {
            return Err(RoomletError::Config(
                "api.timeout_seconds must be 600 or less".to_string(),
            )
            .into());
        }

        if self.stream.reconnect_delay_ms == 0 {
            return Err(RoomletError::Config(
                "stream.reconnect_delay_ms must be greater than 0".to_string(),
            )
            .into());
        }

        if self.stream.reconnect_delay_max_ms < self.stream.reconnect_delay_ms {
            return Err(RoomletError::Config(
                "stream.reconnect_delay_max_ms must not be below stream.reconnect_delay_ms"
                    .to_string(),
            )
            .into());
        }

        self.stream.resolve_url(&self.api.base_url)?;

        if self.storage.backend == StorageBackend::File {
            self.storage.file_path()?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.api.base_url, "http://localhost:3000");
        assert_eq!(config.api.timeout_seconds, 60);
        assert_eq!(config.storage.backend, StorageBackend::Keyring);
        assert_eq!(config.stream.path, "/notifications");
    }

    #[test]
    fn test_config_validation_success() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_config_validation_empty_base_url() {
        let mut config = Config::default();
        config.api.base_url = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_rejects_non_http_scheme() {
        let mut config = Config::default();
        config.api.base_url = "ftp://example.com".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_zero_timeout() {
        let mut config = Config::default();
        config.api.timeout_seconds = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_timeout_too_large() {
        let mut config = Config::default();
        config.api.timeout_seconds = 601;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_reconnect_max_below_initial() {
        let mut config = Config::default();
        config.stream.reconnect_delay_ms = 2_000;
        config.stream.reconnect_delay_max_ms = 1_000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_from_yaml() {
        let yaml = r#"
api:
  base_url: https://api.roomlet.test
  timeout_seconds: 30
stream:
  path: /socket
storage:
  backend: file
  path: /tmp/roomlet-session.json
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.api.base_url, "https://api.roomlet.test");
        assert_eq!(config.api.timeout(), Duration::from_secs(30));
        assert_eq!(config.stream.path, "/socket");
        assert_eq!(config.stream.reconnect_delay_ms, 1_000);
        assert_eq!(config.storage.backend, StorageBackend::File);
        assert_eq!(
            config.storage.file_path().unwrap(),
            PathBuf::from("/tmp/roomlet-session.json")
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_yaml_uses_defaults() {
        let config: Config = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config.api.timeout_seconds, 60);
        assert_eq!(config.storage.backend, StorageBackend::Keyring);
    }

    #[test]
    fn test_resolve_stream_url_from_http_base() {
        let cfg = StreamConfig::default();
        let url = cfg.resolve_url("http://localhost:3000").unwrap();
        assert_eq!(url.as_str(), "ws://localhost:3000/notifications");
    }

    #[test]
    fn test_resolve_stream_url_prefers_explicit() {
        let cfg = StreamConfig {
            url: Some("wss://push.roomlet.test/ws".to_string()),
            ..StreamConfig::default()
        };
        let url = cfg.resolve_url("http://localhost:3000").unwrap();
        assert_eq!(url.as_str(), "wss://push.roomlet.test/ws");
    }

    #[test]
    #[serial]
    fn test_load_nonexistent_file_uses_defaults() {
        let cli = crate::cli::Cli::default();
        let config = Config::load("/nonexistent/roomlet.yaml", &cli).unwrap();
        assert_eq!(config.api.timeout_seconds, 60);
    }

    #[test]
    #[serial]
    fn test_env_overrides_applied() {
        std::env::set_var("ROOMLET_API_BASE_URL", "https://env.roomlet.test");
        std::env::set_var("ROOMLET_API_TIMEOUT_SECONDS", "15");
        std::env::set_var("ROOMLET_STORAGE_BACKEND", "memory");

        let cli = crate::cli::Cli::default();
        let config = Config::load("/nonexistent/roomlet.yaml", &cli).unwrap();

        std::env::remove_var("ROOMLET_API_BASE_URL");
        std::env::remove_var("ROOMLET_API_TIMEOUT_SECONDS");
        std::env::remove_var("ROOMLET_STORAGE_BACKEND");

        assert_eq!(config.api.base_url, "https://env.roomlet.test");
        assert_eq!(config.api.timeout_seconds, 15);
        assert_eq!(config.storage.backend, StorageBackend::Memory);
    }

    #[test]
    #[serial]
    fn test_cli_base_url_overrides_env() {
        std::env::set_var("ROOMLET_API_BASE_URL", "https://env.roomlet.test");
        let cli = crate::cli::Cli {
            base_url: Some("https://cli.roomlet.test".to_string()),
            ..crate::cli::Cli::default()
        };
        let config = Config::load("/nonexistent/roomlet.yaml", &cli).unwrap();
        std::env::remove_var("ROOMLET_API_BASE_URL");

        assert_eq!(config.api.base_url, "https://cli.roomlet.test");
    }
}
