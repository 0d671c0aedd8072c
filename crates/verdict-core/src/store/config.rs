//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - The stable user id (supplied by the identity layer; a plain string here)
//! - Default timer duration and the one-time extension bonus
//! - The outcome-rating lock window
//! - Insight service settings
//!
//! Configuration is stored at `~/.config/verdict/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::data_dir;
use crate::error::ConfigError;

/// Insight service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsightConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Completion endpoint; the API key comes from VERDICT_INSIGHT_KEY.
    #[serde(default)]
    pub endpoint: String,
}

impl Default for InsightConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: String::new(),
        }
    }
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/verdict/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_user_id")]
    pub user_id: String,
    /// Default countdown length when `timer start` gives no duration.
    #[serde(default = "default_timer_secs")]
    pub default_timer_secs: u64,
    /// Bonus added by the one-time extension.
    #[serde(default = "default_extend_bonus_secs")]
    pub extend_bonus_secs: u64,
    /// Hours after finalization during which the outcome cannot be rated.
    #[serde(default = "default_rating_lock_hours")]
    pub rating_lock_hours: u64,
    #[serde(default)]
    pub insight: InsightConfig,
}

fn default_user_id() -> String {
    "local".into()
}
fn default_timer_secs() -> u64 {
    300
}
fn default_extend_bonus_secs() -> u64 {
    300
}
fn default_rating_lock_hours() -> u64 {
    24
}

impl Default for Config {
    fn default() -> Self {
        Self {
            user_id: default_user_id(),
            default_timer_secs: default_timer_secs(),
            extend_bonus_secs: default_extend_bonus_secs(),
            rating_lock_hours: default_rating_lock_hours(),
            insight: InsightConfig::default(),
        }
    }
}

impl Config {
    pub fn path() -> Result<PathBuf, ConfigError> {
        let dir = data_dir().map_err(|e| ConfigError::LoadFailed {
            path: PathBuf::from("~/.config/verdict"),
            message: e.to_string(),
        })?;
        Ok(dir.join("config.toml"))
    }

    /// Load the config, falling back to defaults when absent.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path()?;
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(&path).map_err(|e| ConfigError::LoadFailed {
            path: path.clone(),
            message: e.to_string(),
        })?;
        toml::from_str(&text).map_err(|e| ConfigError::ParseFailed(e.to_string()))
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::path()?;
        let text = toml::to_string_pretty(self).map_err(|e| ConfigError::SaveFailed {
            path: path.clone(),
            message: e.to_string(),
        })?;
        std::fs::write(&path, text).map_err(|e| ConfigError::SaveFailed {
            path,
            message: e.to_string(),
        })
    }

    /// Rating lock window in milliseconds.
    pub fn rating_lock_ms(&self) -> u64 {
        self.rating_lock_hours.saturating_mul(60 * 60 * 1000)
    }
}
