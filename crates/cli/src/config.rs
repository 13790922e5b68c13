//! Configuration management for the CLI

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_API_URL: &str = "http://localhost:5000";

/// Defaults read from `~/.config/churnctl/config.json`; command-line
/// flags and environment variables take precedence
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// API endpoint URL
    pub api_url: Option<String>,
    /// Identity sent as `X-User-Id`
    pub user_id: Option<String>,
    /// Role sent as `X-User-Role`
    pub role: Option<String>,
}

impl Config {
    /// Load configuration from the default location, or defaults when
    /// there is no file
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).context("Failed to read config file")?;

        serde_json::from_str(&content).context("Failed to parse config file")
    }

    /// Flag value first, then the file, then the built-in default
    pub fn api_url(&self, flag: Option<String>) -> String {
        flag.or_else(|| self.api_url.clone())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
    }

    pub fn user_id(&self, flag: Option<String>) -> Option<String> {
        flag.or_else(|| self.user_id.clone())
    }

    pub fn role(&self, flag: Option<String>) -> Option<String> {
        flag.or_else(|| self.role.clone())
    }

    /// Get the configuration file path
    fn config_path() -> Result<PathBuf> {
        let home = dirs_next::home_dir().context("Could not determine home directory")?;
        Ok(home.join(".config").join("churnctl").join("config.json"))
    }
}
