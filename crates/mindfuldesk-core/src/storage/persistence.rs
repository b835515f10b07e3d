//! Settings writes and session history expressed as jobs.
//!
//! The engine either runs a [`StoreJob`] inline or queues it for a worker
//! that owns the [`Persistence`]. Jobs run strictly in the order they were
//! queued, so the last settings write always wins.

use tracing::warn;

use super::database::{SessionLog, SessionRecord};
use super::settings_store::{LoadedSettings, SettingsAggregate, SettingsKey, SettingsStore};
use crate::error::Result;

#[derive(Debug, Clone, PartialEq)]
pub enum StoreJob {
    Save { key: SettingsKey, payload: String },
    RecordSession(SessionRecord),
}

impl StoreJob {
    pub fn save<T: SettingsAggregate>(value: &T) -> Result<Self> {
        Ok(StoreJob::Save {
            key: T::KEY,
            payload: serde_json::to_string(value)?,
        })
    }
}

/// The settings store plus the optional session history sink.
pub struct Persistence {
    store: SettingsStore,
    session_log: Option<Box<dyn SessionLog>>,
}

impl Persistence {
    pub fn new(store: SettingsStore) -> Self {
        Self {
            store,
            session_log: None,
        }
    }

    pub fn set_session_log(&mut self, log: Box<dyn SessionLog>) {
        self.session_log = Some(log);
    }

    pub fn store_mut(&mut self) -> &mut SettingsStore {
        &mut self.store
    }

    pub fn load_all(&mut self) -> LoadedSettings {
        self.store.load_all()
    }

    /// Run one job. Only an authoritative settings write failure is returned;
    /// history failures are logged.
    pub fn run(&mut self, job: StoreJob) -> Result<()> {
        match job {
            StoreJob::Save { key, payload } => self.store.save_payload(key, &payload),
            StoreJob::RecordSession(record) => {
                if let Some(log) = self.session_log.as_mut() {
                    if let Err(e) = log.record(&record) {
                        warn!(error = %e, "failed to record session history");
                    }
                }
                Ok(())
            }
        }
    }
}
