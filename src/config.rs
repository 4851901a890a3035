//! Configuration Management
//!
//! Handles persistent configuration storage for the resource-client CLI.
//! Effective values resolve as CLI flag > config file > environment > default.

use crate::transport::auth::{DEFAULT_SCOPES, TOKEN_ENV};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable holding the API base URL
pub const BASE_URL_ENV: &str = "RESOURCE_CLIENT_BASE_URL";

/// User configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// API base URL, e.g. `https://api.example.com/v1`
    #[serde(default)]
    pub base_url: Option<String>,
    /// Resource root path, e.g. `servers`
    #[serde(default)]
    pub root_path: Option<String>,
    /// Resource description used in error messages
    #[serde(default)]
    pub description: Option<String>,
    /// Static bearer token
    #[serde(default)]
    pub token: Option<String>,
    /// Use Application Default Credentials instead of a static token
    #[serde(default)]
    pub use_adc: bool,
    /// OAuth scopes requested with ADC
    #[serde(default)]
    pub scopes: Vec<String>,
    /// Per-request timeout in seconds
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Config {
    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("resource-client").join("config.json"))
    }

    /// Load configuration from disk
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// Load configuration from `path`, falling back to defaults
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Ignoring malformed config {:?}: {}", path, e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        let Some(path) = Self::config_path() else {
            return Ok(());
        };
        self.save_to(&path)
    }

    /// Save configuration to `path`
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create parent directory
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        Ok(())
    }

    /// Get effective base URL (CLI > config > environment)
    pub fn effective_base_url(&self, cli: Option<&str>) -> Option<String> {
        cli.map(str::to_string)
            .or_else(|| self.base_url.clone())
            .or_else(|| non_empty_env(BASE_URL_ENV))
    }

    /// Get effective root path (CLI > config)
    pub fn effective_root_path(&self, cli: Option<&str>) -> Option<String> {
        cli.map(str::to_string)
            .or_else(|| self.root_path.clone())
            .map(|root| root.trim_end_matches('/').to_string())
    }

    /// Get effective description (CLI > config > root path)
    pub fn effective_description(&self, cli: Option<&str>, root_path: &str) -> String {
        cli.map(str::to_string)
            .or_else(|| self.description.clone())
            .unwrap_or_else(|| root_path.to_string())
    }

    /// Get effective static token (CLI > config > environment)
    pub fn effective_token(&self, cli: Option<&str>) -> Option<String> {
        cli.map(str::to_string)
            .or_else(|| self.token.clone())
            .or_else(|| non_empty_env(TOKEN_ENV))
    }

    /// Get effective request timeout (CLI > config > none)
    pub fn effective_timeout(&self, cli_secs: Option<u64>) -> Option<Duration> {
        cli_secs
            .or(self.timeout_secs)
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    /// Get ADC scopes (config > default cloud-platform scope)
    pub fn effective_scopes(&self) -> Vec<String> {
        if self.scopes.is_empty() {
            DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect()
        } else {
            self.scopes.clone()
        }
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.trim().is_empty())
}
