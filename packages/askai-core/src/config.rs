//! Client configuration.
//!
//! Resolution order: built-in defaults, then the TOML file, then
//! environment variables. Callers apply command line flags on top.

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::Result;

pub const DEFAULT_ENDPOINT: &str = "http://localhost:8000/chat";
pub const DEFAULT_USER_ID: &str = "web_user_1";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_HEALTH_PATH: &str = "/health";

/// Settings for talking to the chat backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ClientConfig {
    /// Full URL of the chat route
    pub endpoint: String,
    /// Identifier sent with every message
    pub user_id: String,
    pub request_timeout_secs: u64,
    /// Health route, resolved against the endpoint
    pub health_path: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            user_id: DEFAULT_USER_ID.to_string(),
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            health_path: DEFAULT_HEALTH_PATH.to_string(),
        }
    }
}

impl ClientConfig {
    /// Load from the default path and apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from_path(&Self::default_path())?;
        config.apply_env();
        Ok(config)
    }

    /// Get the default config file path.
    ///
    /// Default: `<config dir>/askai/config.toml`.
    /// Can be overridden with the `ASKAI_CONFIG` environment variable.
    pub fn default_path() -> PathBuf {
        if let Some(path) = non_blank_var("ASKAI_CONFIG") {
            return PathBuf::from(path);
        }

        directories::ProjectDirs::from("", "", "askai")
            .map(|dirs| dirs.config_dir().join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("askai.toml"))
    }

    /// Load from a specific path. A missing file yields the defaults.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let config = toml::from_str(&content)?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Apply `ASKAI_ENDPOINT` and `ASKAI_USER_ID`, ignoring blank values.
    pub fn apply_env(&mut self) {
        if let Some(endpoint) = non_blank_var("ASKAI_ENDPOINT") {
            self.endpoint = endpoint;
        }
        if let Some(user_id) = non_blank_var("ASKAI_USER_ID") {
            self.user_id = user_id;
        }
    }
}

fn non_blank_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ClientConfig::load_from_path(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.endpoint, "http://localhost:8000/chat");
        assert_eq!(config.user_id, "web_user_1");
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "user_id = \"tab-42\"\nrequest_timeout_secs = 5\n").unwrap();

        let config = ClientConfig::load_from_path(&path).unwrap();
        assert_eq!(config.user_id, "tab-42");
        assert_eq!(config.request_timeout_secs, 5);
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
    }

    #[test]
    fn test_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "endpoint = [").unwrap();

        let result = ClientConfig::load_from_path(&path);
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
