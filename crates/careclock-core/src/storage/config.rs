//! TOML-based application configuration.
//!
//! Stores operational settings:
//! - Background ticker cadence
//! - Schedule defaults applied to new profiles
//! - Adaptive analyzer toggles
//!
//! Configuration is stored at `~/.config/careclock/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::data_dir;
use crate::error::{ConfigError, CoreError};

/// Background ticker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickerConfig {
    /// Seconds between due-ness sweeps.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Run the adaptive analyzer during the daily rollover.
    #[serde(default = "default_true")]
    pub adaptive_enabled: bool,
}

/// Defaults applied when a profile omits a field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleDefaults {
    #[serde(default = "default_wake")]
    pub wake_time: String,
    #[serde(default = "default_sleep")]
    pub sleep_time: String,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/careclock/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub ticker: TickerConfig,
    #[serde(default)]
    pub schedule: ScheduleDefaults,
}

fn default_interval_secs() -> u64 {
    60
}
fn default_true() -> bool {
    true
}
fn default_wake() -> String {
    "07:00".into()
}
fn default_sleep() -> String {
    "22:00".into()
}

impl Default for TickerConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            adaptive_enabled: true,
        }
    }
}

impl Default for ScheduleDefaults {
    fn default() -> Self {
        Self {
            wake_time: default_wake(),
            sleep_time: default_sleep(),
        }
    }
}

impl Config {
    fn path() -> Result<PathBuf, CoreError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from disk or write and return the default.
    ///
    /// # Errors
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, CoreError> {
        let path = Self::path()?;
        match std::fs::read_to_string(&path) {
            Ok(content) => {
                let cfg: Config = toml::from_str(&content).map_err(|e| {
                    CoreError::Config(ConfigError::ParseFailed(e.to_string()))
                })?;
                Ok(cfg)
            }
            Err(_) => {
                let cfg = Self::default();
                cfg.save()?;
                Ok(cfg)
            }
        }
    }

    /// Persist to disk.
    pub fn save(&self) -> Result<(), CoreError> {
        let path = Self::path()?;
        let content = toml::to_string_pretty(self).map_err(|e| {
            CoreError::Config(ConfigError::SaveFailed {
                path: path.clone(),
                message: e.to_string(),
            })
        })?;
        std::fs::write(&path, content)?;
        Ok(())
    }

    /// Load from disk, returning default on error.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.ticker.interval_secs, 60);
        assert!(parsed.ticker.adaptive_enabled);
        assert_eq!(parsed.schedule.wake_time, "07:00");
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let parsed: Config = toml::from_str("[ticker]\ninterval_secs = 15\n").unwrap();
        assert_eq!(parsed.ticker.interval_secs, 15);
        assert!(parsed.ticker.adaptive_enabled);
        assert_eq!(parsed.schedule.sleep_time, "22:00");
    }
}
