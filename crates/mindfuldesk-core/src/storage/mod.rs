mod cache;
mod config;
pub mod database;
pub mod migrations;
mod persistence;
mod settings_store;

pub use cache::LocalCache;
pub use config::{Config, LoggingConfig, NotificationsConfig, RuntimeConfig, StorageConfig};
pub use database::{Database, SessionLog, SessionRecord, Stats};
pub use persistence::{Persistence, StoreJob};
pub use settings_store::{
    LoadSource, Loaded, LoadedSettings, MemoryBackend, SettingsAggregate, SettingsBackend,
    SettingsKey, SettingsStore,
};

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns `~/.config/mindfuldesk[-dev]/` based on MINDFULDESK_ENV.
///
/// Set MINDFULDESK_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("MINDFULDESK_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("mindfuldesk-dev")
    } else {
        base_dir.join("mindfuldesk")
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
