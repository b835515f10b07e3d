//! Authoritative store + local cache for the settings aggregates.
//!
//! - `load` tries the authoritative backend, then the cache, then the
//!   aggregate's default. It never fails.
//! - `save` writes the authoritative backend and then the cache, whatever the
//!   authoritative outcome was. Only the authoritative failure is reported.
//! - A successful authoritative read overwrites the cache. No merging.

use std::sync::{Arc, Mutex};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use super::cache::LocalCache;
use super::database::Database;
use crate::blocker::BlockerSettings;
use crate::error::{CoreError, Result, StoreError};
use crate::reminders::ReminderSettings;
use crate::timer::FocusSettings;

/// Logical names shared by the authoritative store and the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SettingsKey {
    Blocker,
    Reminder,
    Focus,
}

impl SettingsKey {
    pub const ALL: [SettingsKey; 3] = [
        SettingsKey::Blocker,
        SettingsKey::Reminder,
        SettingsKey::Focus,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SettingsKey::Blocker => "mindfuldesk_blocker_settings",
            SettingsKey::Reminder => "mindfuldesk_reminder_settings",
            SettingsKey::Focus => "mindfuldesk_focus_settings",
        }
    }
}

impl std::fmt::Display for SettingsKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// System of record for settings payloads.
pub trait SettingsBackend: Send {
    /// `Ok(None)` when nothing has been stored under `key` yet.
    fn read(&mut self, key: SettingsKey) -> Result<Option<String>, StoreError>;
    fn write(&mut self, key: SettingsKey, payload: &str) -> Result<(), StoreError>;
}

impl SettingsBackend for Database {
    fn read(&mut self, key: SettingsKey) -> Result<Option<String>, StoreError> {
        Ok(self.kv_get(key.as_str())?)
    }

    fn write(&mut self, key: SettingsKey, payload: &str) -> Result<(), StoreError> {
        Ok(self.kv_set(key.as_str(), payload)?)
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    values: std::collections::HashMap<SettingsKey, String>,
    fail_reads: bool,
    fail_writes: bool,
}

/// In-memory backend whose reads and writes can be made to fail.
///
/// Clones share state, so a test can keep a handle after moving one into a
/// [`SettingsStore`].
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.state().fail_reads = fail;
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.state().fail_writes = fail;
    }

    /// Raw payload, bypassing failure switches.
    pub fn raw(&self, key: SettingsKey) -> Option<String> {
        self.state().values.get(&key).cloned()
    }

    pub fn put_raw(&self, key: SettingsKey, payload: &str) {
        self.state().values.insert(key, payload.to_string());
    }
}

impl SettingsBackend for MemoryBackend {
    fn read(&mut self, key: SettingsKey) -> Result<Option<String>, StoreError> {
        let state = self.state();
        if state.fail_reads {
            return Err(StoreError::Unavailable("read refused".into()));
        }
        Ok(state.values.get(&key).cloned())
    }

    fn write(&mut self, key: SettingsKey, payload: &str) -> Result<(), StoreError> {
        let mut state = self.state();
        if state.fail_writes {
            return Err(StoreError::Unavailable("write refused".into()));
        }
        state.values.insert(key, payload.to_string());
        Ok(())
    }
}

/// A settings aggregate persisted under one logical key.
pub trait SettingsAggregate: Serialize + DeserializeOwned + Default {
    const KEY: SettingsKey;
}

impl SettingsAggregate for BlockerSettings {
    const KEY: SettingsKey = SettingsKey::Blocker;
}

impl SettingsAggregate for ReminderSettings {
    const KEY: SettingsKey = SettingsKey::Reminder;
}

impl SettingsAggregate for FocusSettings {
    const KEY: SettingsKey = SettingsKey::Focus;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LoadSource {
    Authoritative,
    Cache,
    Default,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Loaded<T> {
    pub value: T,
    pub source: LoadSource,
    /// The authoritative read errored or returned an unreadable payload.
    pub authoritative_failed: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadedSettings {
    pub blocker: Loaded<BlockerSettings>,
    pub reminder: Loaded<ReminderSettings>,
    pub focus: Loaded<FocusSettings>,
}

pub struct SettingsStore {
    backend: Box<dyn SettingsBackend>,
    cache: LocalCache,
}

impl SettingsStore {
    pub fn new(backend: Box<dyn SettingsBackend>, cache: LocalCache) -> Self {
        Self { backend, cache }
    }

    pub fn cache(&self) -> &LocalCache {
        &self.cache
    }

    pub fn load<T: SettingsAggregate>(&mut self) -> Loaded<T> {
        let key = T::KEY;
        let mut authoritative_failed = true;

        match self.backend.read(key) {
            Ok(Some(raw)) => match decode::<T>(key, &raw) {
                Ok(value) => {
                    self.mirror(key, &value);
                    return Loaded {
                        value,
                        source: LoadSource::Authoritative,
                        authoritative_failed: false,
                    };
                }
                Err(e) => warn!(%key, error = %e, "authoritative payload unreadable, using cache"),
            },
            Ok(None) => {
                authoritative_failed = false;
                debug!(%key, "no authoritative value, using cache");
            }
            Err(e) => warn!(%key, error = %e, "authoritative read failed, using cache"),
        }

        match self.cache.read(key.as_str()) {
            Ok(Some(raw)) => match decode::<T>(key, &raw) {
                Ok(value) => {
                    return Loaded {
                        value,
                        source: LoadSource::Cache,
                        authoritative_failed,
                    }
                }
                Err(e) => warn!(%key, error = %e, "cached payload unreadable"),
            },
            Ok(None) => {}
            Err(e) => warn!(%key, error = %e, "cache read failed"),
        }

        debug!(%key, "using default settings");
        Loaded {
            value: T::default(),
            source: LoadSource::Default,
            authoritative_failed,
        }
    }

    /// Persist `value`. The cache is written even when the authoritative
    /// write fails; that failure comes back as [`CoreError::StoreUnavailable`].
    pub fn save<T: SettingsAggregate>(&mut self, value: &T) -> Result<()> {
        let payload = serde_json::to_string(value)?;
        self.save_payload(T::KEY, &payload)
    }

    /// [`save`](Self::save) for an already encoded aggregate.
    pub fn save_payload(&mut self, key: SettingsKey, payload: &str) -> Result<()> {
        let authoritative = self.backend.write(key, payload);
        if let Err(e) = self.cache.write(key.as_str(), payload) {
            warn!(%key, error = %e, "cache write failed");
        }

        authoritative.map_err(|e| {
            warn!(%key, error = %e, "authoritative write failed, kept in cache");
            CoreError::StoreUnavailable {
                key: key.as_str().to_string(),
                message: e.to_string(),
            }
        })
    }

    /// Load, and persist the default when nothing was stored anywhere.
    ///
    /// Seeded aggregates (e.g. built-in reminders with generated ids) must be
    /// stable across restarts.
    pub fn load_or_seed<T: SettingsAggregate>(&mut self) -> Loaded<T> {
        let loaded = self.load::<T>();
        if loaded.source == LoadSource::Default {
            if let Err(e) = self.save(&loaded.value) {
                let key = T::KEY;
                debug!(%key, error = %e, "seeding default settings deferred");
            }
        }
        loaded
    }

    /// Every aggregate, reminders seeded on first use.
    pub fn load_all(&mut self) -> LoadedSettings {
        LoadedSettings {
            blocker: self.get_blocker_settings(),
            reminder: self.get_reminder_settings(),
            focus: self.get_focus_settings(),
        }
    }

    pub fn get_blocker_settings(&mut self) -> Loaded<BlockerSettings> {
        self.load()
    }

    pub fn update_blocker_settings(&mut self, settings: &BlockerSettings) -> Result<()> {
        self.save(settings)
    }

    pub fn get_reminder_settings(&mut self) -> Loaded<ReminderSettings> {
        self.load_or_seed()
    }

    pub fn update_reminder_settings(&mut self, settings: &ReminderSettings) -> Result<()> {
        self.save(settings)
    }

    pub fn get_focus_settings(&mut self) -> Loaded<FocusSettings> {
        self.load()
    }

    pub fn update_focus_settings(&mut self, settings: &FocusSettings) -> Result<()> {
        self.save(settings)
    }

    fn mirror<T: SettingsAggregate>(&self, key: SettingsKey, value: &T) {
        let result = serde_json::to_string(value)
            .map_err(StoreError::from)
            .and_then(|payload| self.cache.write(key.as_str(), &payload));
        match result {
            Ok(()) => debug!(%key, "cache reconciled from authoritative store"),
            Err(e) => warn!(%key, error = %e, "cache reconciliation failed"),
        }
    }
}

fn decode<T: DeserializeOwned>(key: SettingsKey, raw: &str) -> Result<T, StoreError> {
    serde_json::from_str(raw).map_err(|source| StoreError::Corrupt {
        key: key.as_str().to_string(),
        source,
    })
}
