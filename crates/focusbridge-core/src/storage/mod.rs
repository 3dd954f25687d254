mod config;
pub mod session_log;

pub use config::{Config, SyncConfig, TimerConfig};
pub use session_log::JsonFileLedger;

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns `~/.config/focusbridge[-dev]/` based on FOCUSBRIDGE_ENV.
///
/// Set FOCUSBRIDGE_ENV=dev to use development data directory.
/// FOCUSBRIDGE_DATA_DIR overrides the location entirely.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    if let Some(dir) = std::env::var_os("FOCUSBRIDGE_DATA_DIR") {
        let dir = PathBuf::from(dir);
        std::fs::create_dir_all(&dir)
            .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
        return Ok(dir);
    }

    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("FOCUSBRIDGE_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("focusbridge-dev")
    } else {
        base_dir.join("focusbridge")
    };

    std::fs::create_dir_all(&dir).map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
