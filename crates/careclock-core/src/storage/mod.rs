mod config;
pub mod health_db;

pub use config::{Config, TickerConfig};
pub use health_db::HealthDb;

use std::path::PathBuf;

use crate::error::CoreError;

/// Returns `~/.config/careclock[-dev]/` based on CARECLOCK_ENV.
///
/// Set CARECLOCK_ENV=dev to use a development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, CoreError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("CARECLOCK_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("careclock-dev")
    } else {
        base_dir.join("careclock")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
