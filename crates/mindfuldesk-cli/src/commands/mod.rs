pub mod blocker;
pub mod config;
pub mod focus;
pub mod reminder;
pub mod run;
pub mod stats;

use std::path::PathBuf;

use mindfuldesk_core::engine::{Committed, EngineOptions};
use mindfuldesk_core::storage::data_dir;
use mindfuldesk_core::{
    Config, Database, LocalCache, LocalGate, LogNotifier, SchedulingEngine, SettingsStore,
    SystemClock,
};
use serde::Serialize;

pub type CliResult = Result<(), Box<dyn std::error::Error>>;

pub fn database_path(config: &Config) -> Result<PathBuf, Box<dyn std::error::Error>> {
    Ok(config.storage.database_path(&data_dir()?))
}

/// Build an engine over the configured SQLite store and local cache.
///
/// When the database cannot be opened the engine still starts: it serves the
/// cache and warns on every write.
pub fn open_engine(config: &Config) -> Result<SchedulingEngine, Box<dyn std::error::Error>> {
    let base = data_dir()?;
    let cache = LocalCache::new(config.storage.cache_path(&base));
    let db_path = config.storage.database_path(&base);

    let store = match Database::open(&db_path) {
        Ok(db) => SettingsStore::new(Box::new(db), cache),
        Err(e) => {
            tracing::warn!(error = %e, "database unavailable, running from cache");
            SettingsStore::new(Box::new(Unreachable(e.to_string())), cache)
        }
    };

    let engine = SchedulingEngine::new(
        store,
        Box::new(LocalGate::new()),
        Box::new(LogNotifier),
        Box::new(SystemClock),
        EngineOptions::from_config(config),
    );
    if engine.sources().degraded() {
        eprintln!("warning: settings not loaded from the database");
    }

    Ok(match Database::open(&db_path) {
        Ok(log) => engine.with_session_log(Box::new(log)),
        Err(_) => engine,
    })
}

struct Unreachable(String);

impl mindfuldesk_core::storage::SettingsBackend for Unreachable {
    fn read(
        &mut self,
        _key: mindfuldesk_core::SettingsKey,
    ) -> Result<Option<String>, mindfuldesk_core::StoreError> {
        Err(mindfuldesk_core::StoreError::Unavailable(self.0.clone()))
    }

    fn write(
        &mut self,
        _key: mindfuldesk_core::SettingsKey,
        _payload: &str,
    ) -> Result<(), mindfuldesk_core::StoreError> {
        Err(mindfuldesk_core::StoreError::Unavailable(self.0.clone()))
    }
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print the committed value; a failed authoritative write becomes a warning.
pub fn print_committed<T: Serialize>(committed: &Committed<T>) -> CliResult {
    if let Some(warning) = &committed.warning {
        eprintln!("warning: {warning}");
    }
    print_json(&committed.value)
}
