//! Application configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/willdraft/config.toml)
//! 3. Environment variables (WILLDRAFT_* prefix)
//!
//! Environment variables take precedence over config file values.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::permissions::SubscriptionLevel;

/// Environment variable prefix
const ENV_PREFIX: &str = "WILLDRAFT";

/// Default autosave quiescence window, in milliseconds
pub const DEFAULT_AUTOSAVE_DELAY_MS: u64 = 1500;

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Directory for will files, photos and the log file
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Quiet period before an edited will is saved
    #[serde(default = "default_autosave_delay_ms")]
    pub autosave_delay_ms: u64,

    /// Plan of the local user; decides will limits and customizations
    #[serde(default)]
    pub subscription: SubscriptionLevel,

    /// Log file (defaults to `<data_dir>/willdraft.log`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            autosave_delay_ms: DEFAULT_AUTOSAVE_DELAY_MS,
            subscription: SubscriptionLevel::default(),
            log_file: None,
        }
    }
}

impl Config {
    /// Load configuration from default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (WILLDRAFT_DATA_DIR, WILLDRAFT_AUTOSAVE_DELAY_MS,
    ///    WILLDRAFT_SUBSCRIPTION)
    /// 2. Config file (~/.config/willdraft/config.toml or WILLDRAFT_CONFIG)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load configuration from a specific path
    ///
    /// Environment variables are still applied as overrides.
    /// If the file doesn't exist, defaults are used.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            Self::default()
        };

        config.apply_env_overrides()?;
        config.ensure_data_dir()?;
        Ok(config)
    }

    /// Load configuration from a TOML string (useful for testing)
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) -> Result<()> {
        // WILLDRAFT_DATA_DIR
        if let Ok(val) = std::env::var(format!("{}_DATA_DIR", ENV_PREFIX)) {
            self.data_dir = PathBuf::from(val);
        }

        // WILLDRAFT_AUTOSAVE_DELAY_MS
        if let Ok(val) = std::env::var(format!("{}_AUTOSAVE_DELAY_MS", ENV_PREFIX)) {
            self.autosave_delay_ms = val
                .trim()
                .parse()
                .with_context(|| format!("Invalid {}_AUTOSAVE_DELAY_MS: {:?}", ENV_PREFIX, val))?;
        }

        // WILLDRAFT_SUBSCRIPTION
        if let Ok(val) = std::env::var(format!("{}_SUBSCRIPTION", ENV_PREFIX)) {
            self.subscription = val
                .parse()
                .with_context(|| format!("Invalid {}_SUBSCRIPTION", ENV_PREFIX))?;
        }

        Ok(())
    }

    /// Ensure data directory exists
    fn ensure_data_dir(&self) -> Result<()> {
        if !self.data_dir.exists() {
            std::fs::create_dir_all(&self.data_dir)
                .with_context(|| format!("Failed to create data directory: {:?}", self.data_dir))?;
        }
        Ok(())
    }

    /// Save configuration to the default config file
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_file_path())
    }

    /// Save configuration to a specific file
    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(config_path, content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;
        Ok(())
    }

    /// Set a value by its config key, as used by `willdraft config set`
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "data_dir" => self.data_dir = PathBuf::from(value),
            "autosave_delay_ms" => {
                self.autosave_delay_ms = value
                    .parse()
                    .with_context(|| format!("Invalid autosave_delay_ms: {:?}", value))?;
            }
            "subscription" => self.subscription = value.parse()?,
            "log_file" => {
                self.log_file = if value.is_empty() {
                    None
                } else {
                    Some(PathBuf::from(value))
                };
            }
            _ => anyhow::bail!(
                "Unknown config key: {} (expected data_dir, autosave_delay_ms, subscription or log_file)",
                key
            ),
        }
        Ok(())
    }

    /// Get the config file path
    ///
    /// Can be overridden with WILLDRAFT_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("willdraft")
            .join("config.toml")
    }

    /// Autosave quiescence window
    pub fn autosave_delay(&self) -> Duration {
        Duration::from_millis(self.autosave_delay_ms)
    }

    /// Directory holding one JSON file per will
    pub fn wills_dir(&self) -> PathBuf {
        self.data_dir.join("wills")
    }

    /// Directory holding uploaded photos
    pub fn photos_dir(&self) -> PathBuf {
        self.data_dir.join("photos")
    }

    /// Log file path
    pub fn log_path(&self) -> PathBuf {
        self.log_file
            .clone()
            .unwrap_or_else(|| self.data_dir.join("willdraft.log"))
    }
}

/// Get the default data directory
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("willdraft")
}

fn default_autosave_delay_ms() -> u64 {
    DEFAULT_AUTOSAVE_DELAY_MS
}
