//! Shared fixtures for engine integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{Duration, TimeZone, Utc};
use mindfuldesk_core::storage::{MemoryBackend, SettingsBackend};
use mindfuldesk_core::{
    EngineOptions, Event, FocusSettings, LocalCache, LocalGate, ManualClock, Notifier,
    ReminderType, SchedulingEngine, SettingsKey, SettingsStore, StoreError,
};
use tempfile::TempDir;

/// Notifier whose delivery outcome can be flipped from the test.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    pub sent: Arc<Mutex<Vec<(String, String)>>>,
    pub failing: Arc<Mutex<bool>>,
}

impl RecordingNotifier {
    pub fn titles(&self) -> Vec<String> {
        self.sent.lock().unwrap().iter().map(|(t, _)| t.clone()).collect()
    }

    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock().unwrap() = failing;
    }
}

impl Notifier for RecordingNotifier {
    fn permission_granted(&mut self) -> bool {
        true
    }

    fn notify(&mut self, title: &str, body: &str) -> bool {
        if *self.failing.lock().unwrap() {
            return false;
        }
        self.sent
            .lock()
            .unwrap()
            .push((title.to_string(), body.to_string()));
        true
    }
}

/// Backend whose writes wait while `held` is set.
#[derive(Clone)]
pub struct HeldBackend {
    pub inner: MemoryBackend,
    pub held: Arc<AtomicBool>,
}

impl HeldBackend {
    pub fn new(inner: MemoryBackend) -> Self {
        Self {
            inner,
            held: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn hold(&self, held: bool) {
        self.held.store(held, Ordering::SeqCst);
    }
}

impl SettingsBackend for HeldBackend {
    fn read(&mut self, key: SettingsKey) -> Result<Option<String>, StoreError> {
        self.inner.read(key)
    }

    fn write(&mut self, key: SettingsKey, payload: &str) -> Result<(), StoreError> {
        while self.held.load(Ordering::SeqCst) {
            std::thread::sleep(std::time::Duration::from_millis(1));
        }
        self.inner.write(key, payload)
    }
}

pub struct Harness {
    pub engine: SchedulingEngine,
    pub clock: ManualClock,
    pub backend: MemoryBackend,
    pub gate: LocalGate,
    pub notifier: RecordingNotifier,
    pub dir: TempDir,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_focus(FocusSettings::default())
    }

    /// Engine whose authoritative store already holds `focus`.
    pub fn with_focus(focus: FocusSettings) -> Self {
        let backend = MemoryBackend::new();
        backend.put_raw(
            mindfuldesk_core::SettingsKey::Focus,
            &serde_json::to_string(&focus).unwrap(),
        );
        Self::with_backend(backend)
    }

    pub fn with_backend(backend: MemoryBackend) -> Self {
        Self::with_store_backend(backend.clone(), Box::new(backend))
    }

    /// `backend` is kept for inspection; the store talks to `store_backend`.
    pub fn with_store_backend(
        backend: MemoryBackend,
        store_backend: Box<dyn SettingsBackend>,
    ) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(store_backend, LocalCache::new(dir.path().join("cache")));
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2026, 6, 1, 8, 0, 0).unwrap());
        let gate = LocalGate::new();
        let notifier = RecordingNotifier::default();
        let engine = SchedulingEngine::new(
            store,
            Box::new(gate.clone()),
            Box::new(notifier.clone()),
            Box::new(clock.clone()),
            EngineOptions {
                rng_seed: Some(7),
                ..EngineOptions::default()
            },
        );
        Self {
            engine,
            clock,
            backend,
            gate,
            notifier,
            dir,
        }
    }

    pub fn reminder_id(&self, reminder_type: ReminderType) -> String {
        self.engine
            .reminder_settings()
            .reminders
            .iter()
            .find(|r| r.reminder_type == reminder_type)
            .unwrap()
            .id
            .clone()
    }

    pub fn remaining(&self, reminder_id: &str) -> Option<u64> {
        self.engine
            .reminder_countdowns()
            .into_iter()
            .find(|c| c.reminder_id == reminder_id)
            .map(|c| c.remaining_seconds)
    }

    /// Advance the clock and tick `seconds` times.
    pub fn run(&mut self, seconds: u32) -> Vec<Event> {
        let mut events = Vec::new();
        for _ in 0..seconds {
            self.clock.advance(Duration::seconds(1));
            events.extend(self.engine.tick());
        }
        events
    }
}

pub fn count_session_ended(events: &[Event]) -> usize {
    events.iter().filter(|e| e.is_session_ended()).count()
}

pub fn count_reminders(events: &[Event]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, Event::ReminderFired { .. }))
        .count()
}

pub fn short_focus(minutes: u32) -> FocusSettings {
    FocusSettings {
        work_duration: minutes,
        short_break: 1,
        long_break: 2,
        ..FocusSettings::default()
    }
}
