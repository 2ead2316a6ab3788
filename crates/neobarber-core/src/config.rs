//! Application configuration management.
//!
//! This module handles loading and saving the application configuration:
//! the API base URL, which secret storage backend holds the token, the
//! request timeout, and the last email used to log in.
//!
//! Configuration is stored at `~/.config/neobarber/config.json`. The
//! `NEOBARBER_API_URL` and `NEOBARBER_STORAGE` environment variables
//! override the file.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::api::client::DEFAULT_REQUEST_TIMEOUT_SECS;
use crate::storage::StorageBackend;

/// Application name used for config/data directory paths
const APP_NAME: &str = "neobarber";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Backend URL used when nothing is configured
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api";

pub const ENV_API_URL: &str = "NEOBARBER_API_URL";
pub const ENV_STORAGE: &str = "NEOBARBER_STORAGE";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    pub storage_backend: StorageBackend,
    pub request_timeout_secs: u64,
    pub last_email: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            storage_backend: StorageBackend::default(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            last_email: None,
        }
    }
}

impl Config {
    /// Load the config file (defaults if absent), then apply environment overrides.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents).context("Failed to parse config file")?
        } else {
            Self::default()
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Apply overrides from `lookup` (the process environment in production).
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_API_URL).filter(|u| !u.trim().is_empty()) {
            self.api_base_url = url;
        }
        if let Some(backend) = lookup(ENV_STORAGE) {
            match backend.parse() {
                Ok(parsed) => self.storage_backend = parsed,
                Err(e) => warn!(error = %e, "Ignoring {}", ENV_STORAGE),
            }
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Directory for the file storage backend.
    pub fn data_dir(&self) -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME))
    }
}
