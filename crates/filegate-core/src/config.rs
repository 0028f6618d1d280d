//! Application configuration management.
//!
//! This module handles loading and saving the client configuration, which
//! includes the server base URL, request timeout and last used username.
//!
//! Configuration is stored at `~/.config/filegate/config.json`; the
//! `FILEGATE_*` environment variables override whatever the file says.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Application name used for config/cache directory paths
const APP_NAME: &str = "filegate";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Where the file-browser service listens by default.
pub const DEFAULT_BASE_URL: &str = "http://localhost:3001";

/// HTTP request timeout in seconds.
/// 30s allows for large downloads on slow links while failing fast enough for good UX.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

pub const ENV_BASE_URL: &str = "FILEGATE_URL";
pub const ENV_USERNAME: &str = "FILEGATE_USERNAME";
pub const ENV_PASSWORD: &str = "FILEGATE_PASSWORD";
pub const ENV_TIMEOUT_SECS: &str = "FILEGATE_TIMEOUT_SECS";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub base_url: String,
    pub last_username: Option<String>,
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            last_username: None,
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl Config {
    /// Load the config file (or defaults) and apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Apply `FILEGATE_*` overrides, looking each variable up through `lookup`.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_BASE_URL).filter(|v| !v.is_empty()) {
            self.base_url = url;
        }
        if let Some(username) = lookup(ENV_USERNAME).filter(|v| !v.is_empty()) {
            self.last_username = Some(username);
        }
        if let Some(timeout) = lookup(ENV_TIMEOUT_SECS) {
            match timeout.parse::<u64>() {
                Ok(secs) if secs > 0 => self.request_timeout_secs = secs,
                _ => warn!(value = %timeout, "Ignoring invalid {}", ENV_TIMEOUT_SECS),
            }
        }
    }

    /// Password from the environment, if set. Never read from or written to the config file.
    pub fn env_password() -> Option<String> {
        std::env::var(ENV_PASSWORD).ok().filter(|v| !v.is_empty())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }
}
