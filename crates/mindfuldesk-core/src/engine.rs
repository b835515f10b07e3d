//! Composition root for the scheduling engine.
//!
//! [`SchedulingEngine`] owns the focus session machine, the blocker with its
//! override window and the reminder scheduler, plus the timer registry that
//! drives them. Every operation decides the state transition first and then
//! attempts persistence and notification; neither side effect can undo a
//! transition.
//!
//! Events are queued in an outbox and handed out by [`SchedulingEngine::tick`]
//! and [`SchedulingEngine::drain_events`].
//!
//! Settings writes and session history run inline until
//! [`SchedulingEngine::detach_persistence`] hands the store to a worker;
//! from then on they are queued as [`StoreJob`]s and drained with
//! [`SchedulingEngine::drain_store_jobs`].

use chrono::{DateTime, Utc};
use rand::SeedableRng;
use rand_pcg::Pcg64;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::blocker::{
    BlockItemType, BlockMode, Blocker, BlockerSettings, EnforcementGate, OverrideWindow,
};
use crate::clock::Clock;
use crate::driver::{TimerRegistry, TimerSlot, TimerToken};
use crate::error::{CoreError, Result};
use crate::events::Event;
use crate::notify::{Notification, Notifier, NotifierGateway};
use crate::reminders::{ReminderCountdown, ReminderEdit, ReminderScheduler, ReminderSettings};
use crate::storage::{
    Config, LoadSource, LoadedSettings, NotificationsConfig, Persistence, SessionLog,
    SessionRecord, SettingsAggregate, SettingsStore, StoreJob,
};
use crate::timer::{
    pick_motivation, FocusSession, FocusSessionMachine, FocusSettings, SessionState, SessionType,
};

/// Process-level knobs that are not part of the persisted aggregates.
#[derive(Debug, Clone, Default)]
pub struct EngineOptions {
    pub notifications: NotificationsConfig,
    pub rng_seed: Option<u64>,
}

impl EngineOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            notifications: config.notifications.clone(),
            rng_seed: config.runtime.rng_seed,
        }
    }
}

/// Result of a mutation that was applied in memory.
///
/// `warning` is set when the authoritative write failed; the value is still
/// applied and mirrored to the local cache. Once persistence is detached the
/// write outcome arrives later as [`Event::StoreWriteFailed`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Committed<T> {
    pub value: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Where each aggregate came from at the last (re)load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SettingsSources {
    pub blocker: LoadSource,
    pub reminder: LoadSource,
    pub focus: LoadSource,
    /// Some authoritative read failed during the (re)load.
    pub authoritative_failed: bool,
}

impl SettingsSources {
    fn from_loaded(loaded: &LoadedSettings) -> Self {
        Self {
            blocker: loaded.blocker.source,
            reminder: loaded.reminder.source,
            focus: loaded.focus.source,
            authoritative_failed: loaded.blocker.authoritative_failed
                || loaded.reminder.authoritative_failed
                || loaded.focus.authoritative_failed,
        }
    }

    /// True when the authoritative store could not be read or an aggregate
    /// is being served from the local cache. A fresh install is not degraded.
    pub fn degraded(&self) -> bool {
        self.authoritative_failed
            || [self.blocker, self.reminder, self.focus].contains(&LoadSource::Cache)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EngineSnapshot {
    pub session: FocusSession,
    pub completed_sessions_today: u32,
    pub next_session_type: SessionType,
    pub focus_settings: FocusSettings,
    pub override_window: OverrideWindow,
    pub blocker: BlockerSettings,
    pub reminders: ReminderSettings,
    pub reminder_countdowns: Vec<ReminderCountdown>,
    pub armed_timers: Vec<TimerSlot>,
    pub sources: SettingsSources,
}

/// A blocker mutation, for callers that route operations through a driver.
#[derive(Debug, Clone, PartialEq)]
pub enum BlockerOp {
    SetEnabled(bool),
    SetMode(BlockMode),
    AddItem {
        name: String,
        url_pattern: String,
        item_type: BlockItemType,
    },
    AddPopular(String),
    RemoveItem(String),
    ToggleItem(String),
    SetItemActive {
        id: String,
        active: bool,
    },
    SetOverridePolicy {
        allow_override: bool,
        timeout_secs: u32,
    },
}

/// A reminder mutation, for callers that route operations through a driver.
#[derive(Debug, Clone, PartialEq)]
pub enum ReminderOp {
    SetEnabled(bool),
    SetOnlyDuringFocus(bool),
    Toggle(String),
    SetReminderEnabled { id: String, enabled: bool },
    Edit { id: String, edit: ReminderEdit },
    AddCustom { interval_minutes: u32, message: String },
    Delete(String),
}

pub struct SchedulingEngine {
    focus: FocusSessionMachine,
    blocker: Blocker,
    reminders: ReminderScheduler,
    timers: TimerRegistry,
    /// `None` once detached; writes then collect in `store_jobs`.
    persistence: Option<Persistence>,
    store_jobs: Vec<StoreJob>,
    notifier: NotifierGateway,
    clock: Box<dyn Clock>,
    options: EngineOptions,
    rng: Pcg64,
    sources: SettingsSources,
    outbox: Vec<Event>,
}

impl SchedulingEngine {
    /// Load every aggregate from `store` and build the machines.
    pub fn new(
        mut store: SettingsStore,
        gate: Box<dyn EnforcementGate>,
        notifier: Box<dyn Notifier>,
        clock: Box<dyn Clock>,
        options: EngineOptions,
    ) -> Self {
        let loaded = store.load_all();
        let sources = SettingsSources::from_loaded(&loaded);
        let LoadedSettings {
            blocker,
            reminder,
            focus,
        } = loaded;
        if sources.degraded() {
            warn!(?sources, "settings not loaded from authoritative store");
        }

        let rng = match options.rng_seed {
            Some(seed) => Pcg64::seed_from_u64(seed),
            None => Pcg64::from_entropy(),
        };

        let mut engine = Self {
            focus: FocusSessionMachine::new(focus.value),
            blocker: Blocker::new(blocker.value, gate),
            reminders: ReminderScheduler::new(reminder.value),
            timers: TimerRegistry::new(),
            persistence: Some(Persistence::new(store)),
            store_jobs: Vec::new(),
            notifier: NotifierGateway::new(notifier),
            clock,
            options,
            rng,
            sources,
            outbox: Vec::new(),
        };
        let at = engine.clock.now();
        let today = engine.clock.today();
        engine.focus.observe_day(today, at);
        engine
    }

    pub fn with_session_log(mut self, log: Box<dyn SessionLog>) -> Self {
        if let Some(persistence) = self.persistence.as_mut() {
            persistence.set_session_log(log);
        }
        self
    }

    /// Hand persistence to a worker. Later writes are queued as jobs.
    pub fn detach_persistence(&mut self) -> Option<Persistence> {
        self.persistence.take()
    }

    /// Resume inline persistence. Queued jobs run first, in order.
    pub fn attach_persistence(&mut self, mut persistence: Persistence) {
        for job in self.store_jobs.drain(..) {
            if let Err(e) = persistence.run(job) {
                warn!(error = %e, "queued settings write failed");
            }
        }
        self.persistence = Some(persistence);
    }

    pub fn drain_store_jobs(&mut self) -> Vec<StoreJob> {
        std::mem::take(&mut self.store_jobs)
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn session(&self) -> &FocusSession {
        self.focus.session()
    }

    pub fn completed_sessions_today(&self) -> u32 {
        self.focus.completed_sessions_today()
    }

    pub fn focus_settings(&self) -> &FocusSettings {
        self.focus.settings()
    }

    pub fn blocker_settings(&self) -> &BlockerSettings {
        self.blocker.settings()
    }

    pub fn override_window(&self) -> &OverrideWindow {
        self.blocker.override_window()
    }

    pub fn reminder_settings(&self) -> &ReminderSettings {
        self.reminders.settings()
    }

    pub fn reminder_countdowns(&self) -> Vec<ReminderCountdown> {
        self.reminders.countdowns()
    }

    pub fn is_url_blocked(&self, url: &str) -> bool {
        self.blocker.is_url_blocked(url)
    }

    pub fn sources(&self) -> SettingsSources {
        self.sources
    }

    pub fn notifications(&self) -> impl Iterator<Item = &Notification> {
        self.notifier.history()
    }

    /// Current registration for `slot`, if armed.
    pub fn timer_token(&self, slot: TimerSlot) -> Option<TimerToken> {
        self.timers.token(slot)
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            session: self.focus.session().clone(),
            completed_sessions_today: self.focus.completed_sessions_today(),
            next_session_type: self.focus.next_session_type(),
            focus_settings: self.focus.settings().clone(),
            override_window: self.blocker.override_window().clone(),
            blocker: self.blocker.settings().clone(),
            reminders: self.reminders.settings().clone(),
            reminder_countdowns: self.reminders.countdowns(),
            armed_timers: self.timers.armed().iter().map(|t| t.slot()).collect(),
            sources: self.sources,
        }
    }

    pub fn drain_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.outbox)
    }

    // ── Driver ───────────────────────────────────────────────────────

    /// Advance every countdown by one second and return all queued events.
    ///
    /// Reminders see the focus state as it was at the start of the second.
    pub fn tick(&mut self) -> Vec<Event> {
        let at = self.clock.now();
        if let Some(event) = self.focus.observe_day(self.clock.today(), at) {
            info!("new day, daily session counter reset");
            self.outbox.push(event);
        }

        let fired = self.reminders.tick(&self.focus, at);
        if !fired.is_empty() {
            self.on_reminders_fired(fired, at);
        }

        for token in self.timers.armed() {
            self.dispatch_at(token, at);
        }
        self.drain_events()
    }

    /// Deliver one tick to the registration identified by `token`. A token
    /// from a cancelled or re-armed slot is ignored.
    pub fn dispatch(&mut self, token: TimerToken) -> Vec<Event> {
        let at = self.clock.now();
        self.dispatch_at(token, at);
        self.drain_events()
    }

    fn dispatch_at(&mut self, token: TimerToken, at: DateTime<Utc>) {
        if !self.timers.is_live(token) {
            debug!(slot = ?token.slot(), "stale tick suppressed");
            return;
        }
        match token.slot() {
            TimerSlot::FocusSession => {
                if let Some(ended) = self.focus.tick(at) {
                    self.on_session_ended(ended, at);
                }
            }
            TimerSlot::OverrideWindow => {
                if let Some(ended) = self.blocker.tick_override(at) {
                    self.timers.cancel(TimerSlot::OverrideWindow);
                    info!("override window expired");
                    self.outbox.push(ended);
                }
            }
        }
    }

    /// End the override window and the live session, and disarm everything.
    pub fn shutdown(&mut self) -> Vec<Event> {
        let at = self.clock.now();
        self.close_override(at);
        self.timers.cancel(TimerSlot::FocusSession);
        if let Some(ended) = self.focus.stop(at) {
            self.on_session_ended(ended, at);
        }
        self.drain_events()
    }

    // ── Focus session ────────────────────────────────────────────────

    pub fn start_session(&mut self, session_type: SessionType) -> Result<FocusSession> {
        let at = self.clock.now();
        let event = self.focus.start(session_type, at)?;
        self.timers.arm(TimerSlot::FocusSession);
        info!(%session_type, "session started");
        self.outbox.push(event);
        Ok(self.focus.session().clone())
    }

    /// Start whichever type the last session implies.
    pub fn start_next_session(&mut self) -> Result<FocusSession> {
        self.start_session(self.focus.next_session_type())
    }

    pub fn pause_session(&mut self) -> Result<FocusSession> {
        let at = self.clock.now();
        if let Some(event) = self.focus.pause(at)? {
            self.timers.cancel(TimerSlot::FocusSession);
            self.outbox.push(event);
        }
        Ok(self.focus.session().clone())
    }

    pub fn resume_session(&mut self) -> Result<FocusSession> {
        let at = self.clock.now();
        if let Some(event) = self.focus.resume(at)? {
            self.timers.arm(TimerSlot::FocusSession);
            self.outbox.push(event);
        }
        Ok(self.focus.session().clone())
    }

    pub fn toggle_pause(&mut self) -> Result<FocusSession> {
        match self.focus.state() {
            SessionState::Paused => self.resume_session(),
            _ => self.pause_session(),
        }
    }

    /// Always succeeds. The registration is cancelled before the machine
    /// stops, so a tick queued in the same quantum cannot complete it.
    pub fn stop_session(&mut self) -> FocusSession {
        let at = self.clock.now();
        self.timers.cancel(TimerSlot::FocusSession);
        if let Some(ended) = self.focus.stop(at) {
            info!("session stopped");
            self.on_session_ended(ended, at);
        }
        self.focus.session().clone()
    }

    pub fn save_focus_settings(&mut self, settings: FocusSettings) -> Result<Committed<FocusSettings>> {
        settings.validate()?;
        self.focus.set_settings(settings);
        Ok(self.commit(self.focus.settings().clone()))
    }

    // ── Blocker ──────────────────────────────────────────────────────

    pub fn request_override(&mut self, duration_secs: u32) -> Result<OverrideWindow> {
        let at = self.clock.now();
        let event = self.blocker.request_override(duration_secs, at)?;
        self.timers.arm(TimerSlot::OverrideWindow);
        info!(
            seconds = self.blocker.override_window().remaining_seconds,
            "override window opened"
        );
        self.outbox.push(event);
        Ok(self.blocker.override_window().clone())
    }

    /// Idempotent.
    pub fn end_override(&mut self) -> OverrideWindow {
        let at = self.clock.now();
        self.close_override(at);
        self.blocker.override_window().clone()
    }

    pub fn set_blocker_enabled(&mut self, enabled: bool) -> Committed<BlockerSettings> {
        let at = self.clock.now();
        let ended = self.blocker.set_enabled(enabled, at);
        self.after_override_change(ended);
        self.commit_blocker()
    }

    pub fn set_block_mode(&mut self, mode: BlockMode) -> Committed<BlockerSettings> {
        self.blocker.set_mode(mode);
        self.commit_blocker()
    }

    pub fn add_blocked_item(
        &mut self,
        name: &str,
        url_pattern: &str,
        item_type: BlockItemType,
    ) -> Result<Committed<BlockerSettings>> {
        self.blocker.add_item(name, url_pattern, item_type)?;
        Ok(self.commit_blocker())
    }

    pub fn add_popular_site(&mut self, url_pattern: &str) -> Result<Committed<BlockerSettings>> {
        self.blocker.add_popular(url_pattern)?;
        Ok(self.commit_blocker())
    }

    pub fn remove_blocked_item(&mut self, id: &str) -> Result<Committed<BlockerSettings>> {
        self.blocker.remove_item(id)?;
        Ok(self.commit_blocker())
    }

    pub fn toggle_blocked_item(&mut self, id: &str) -> Result<Committed<BlockerSettings>> {
        self.blocker.toggle_item(id)?;
        Ok(self.commit_blocker())
    }

    pub fn set_blocked_item_active(
        &mut self,
        id: &str,
        active: bool,
    ) -> Result<Committed<BlockerSettings>> {
        self.blocker.set_item_active(id, active)?;
        Ok(self.commit_blocker())
    }

    pub fn set_override_policy(
        &mut self,
        allow_override: bool,
        timeout_secs: u32,
    ) -> Result<Committed<BlockerSettings>> {
        let at = self.clock.now();
        let ended = self
            .blocker
            .set_override_policy(allow_override, timeout_secs, at)?;
        self.after_override_change(ended);
        Ok(self.commit_blocker())
    }

    pub fn apply_blocker_op(&mut self, op: BlockerOp) -> Result<Committed<BlockerSettings>> {
        match op {
            BlockerOp::SetEnabled(enabled) => Ok(self.set_blocker_enabled(enabled)),
            BlockerOp::SetMode(mode) => Ok(self.set_block_mode(mode)),
            BlockerOp::AddItem {
                name,
                url_pattern,
                item_type,
            } => self.add_blocked_item(&name, &url_pattern, item_type),
            BlockerOp::AddPopular(url_pattern) => self.add_popular_site(&url_pattern),
            BlockerOp::RemoveItem(id) => self.remove_blocked_item(&id),
            BlockerOp::ToggleItem(id) => self.toggle_blocked_item(&id),
            BlockerOp::SetItemActive { id, active } => self.set_blocked_item_active(&id, active),
            BlockerOp::SetOverridePolicy {
                allow_override,
                timeout_secs,
            } => self.set_override_policy(allow_override, timeout_secs),
        }
    }

    // ── Reminders ────────────────────────────────────────────────────

    pub fn apply_reminder_op(&mut self, op: ReminderOp) -> Result<Committed<ReminderSettings>> {
        match op {
            ReminderOp::SetEnabled(enabled) => Ok(self.set_reminders_enabled(enabled)),
            ReminderOp::SetOnlyDuringFocus(only) => Ok(self.set_only_during_focus(only)),
            ReminderOp::Toggle(id) => self.toggle_reminder(&id),
            ReminderOp::SetReminderEnabled { id, enabled } => {
                self.set_reminder_enabled(&id, enabled)
            }
            ReminderOp::Edit { id, edit } => self.edit_reminder(&id, edit),
            ReminderOp::AddCustom {
                interval_minutes,
                message,
            } => self.add_custom_reminder(interval_minutes, &message),
            ReminderOp::Delete(id) => self.delete_reminder(&id),
        }
    }

    pub fn set_reminders_enabled(&mut self, enabled: bool) -> Committed<ReminderSettings> {
        self.reminders.set_enabled(enabled);
        self.commit_reminders()
    }

    pub fn set_only_during_focus(&mut self, only_during_focus: bool) -> Committed<ReminderSettings> {
        self.reminders.set_only_during_focus(only_during_focus);
        self.commit_reminders()
    }

    pub fn toggle_reminder(&mut self, id: &str) -> Result<Committed<ReminderSettings>> {
        self.reminders.toggle(id)?;
        Ok(self.commit_reminders())
    }

    pub fn set_reminder_enabled(
        &mut self,
        id: &str,
        enabled: bool,
    ) -> Result<Committed<ReminderSettings>> {
        self.reminders.set_reminder_enabled(id, enabled)?;
        Ok(self.commit_reminders())
    }

    pub fn edit_reminder(
        &mut self,
        id: &str,
        edit: ReminderEdit,
    ) -> Result<Committed<ReminderSettings>> {
        self.reminders.edit(id, edit)?;
        Ok(self.commit_reminders())
    }

    pub fn add_custom_reminder(
        &mut self,
        interval_minutes: u32,
        message: &str,
    ) -> Result<Committed<ReminderSettings>> {
        self.reminders.add_custom(interval_minutes, message)?;
        Ok(self.commit_reminders())
    }

    pub fn delete_reminder(&mut self, id: &str) -> Result<Committed<ReminderSettings>> {
        self.reminders.delete(id)?;
        Ok(self.commit_reminders())
    }

    // ── Settings ─────────────────────────────────────────────────────

    /// Re-read every aggregate. Authoritative data replaces in-memory state.
    ///
    /// With persistence detached this only reports the last sources; the
    /// worker loads and the result goes through [`apply_settings`](Self::apply_settings).
    pub fn reload_settings(&mut self) -> SettingsSources {
        let Some(persistence) = self.persistence.as_mut() else {
            debug!("persistence detached, reload must go through the store worker");
            return self.sources;
        };
        let loaded = persistence.load_all();
        self.apply_settings(loaded)
    }

    /// Adopt freshly loaded aggregates. Reminder countdowns whose schedule
    /// did not change keep running.
    pub fn apply_settings(&mut self, loaded: LoadedSettings) -> SettingsSources {
        let at = self.clock.now();
        self.sources = SettingsSources::from_loaded(&loaded);

        let ended = self.blocker.replace_settings(loaded.blocker.value, at);
        self.after_override_change(ended);
        self.reminders.replace_settings(loaded.reminder.value);
        self.focus.set_settings(loaded.focus.value);
        debug!(sources = ?self.sources, "settings reloaded");
        self.sources
    }

    /// Surface a write that failed after the caller was answered.
    pub fn record_store_failure(&mut self, error: CoreError) {
        let at = self.clock.now();
        warn!(error = %error, "queued settings write failed");
        let key = match &error {
            CoreError::StoreUnavailable { key, .. } => Some(key.clone()),
            _ => None,
        };
        self.outbox.push(Event::StoreWriteFailed {
            key,
            message: error.to_string(),
            at,
        });
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn close_override(&mut self, at: DateTime<Utc>) {
        let ended = self.blocker.end_override(at);
        self.after_override_change(ended);
    }

    fn after_override_change(&mut self, ended: Option<Event>) {
        if let Some(event) = ended {
            self.timers.cancel(TimerSlot::OverrideWindow);
            info!("override window closed");
            self.outbox.push(event);
        }
    }

    fn on_session_ended(&mut self, mut event: Event, at: DateTime<Utc>) {
        self.timers.cancel(TimerSlot::FocusSession);

        let ended = match &event {
            Event::SessionEnded {
                session_type,
                completed,
                remaining_seconds,
                total_seconds,
                started_at,
                ..
            } => Some((
                *session_type,
                *completed,
                *remaining_seconds,
                *total_seconds,
                *started_at,
            )),
            _ => None,
        };
        let Some((session_type, completed, remaining_seconds, total_seconds, started_at)) = ended
        else {
            self.outbox.push(event);
            return;
        };

        if completed {
            if session_type == SessionType::Focus {
                if let Event::SessionEnded { motivation, .. } = &mut event {
                    *motivation = Some(pick_motivation(&mut self.rng).to_string());
                }
            }
            info!(%session_type, "session completed");
            self.notify_session_complete(session_type, at);
        }

        self.log_session(SessionRecord {
            session_type,
            completed,
            planned_secs: total_seconds,
            elapsed_secs: total_seconds.saturating_sub(remaining_seconds),
            started_at: started_at.unwrap_or(at),
            ended_at: at,
        });
        self.outbox.push(event);

        if completed {
            let next = self.focus.next_session_type();
            if self.focus.settings().auto_starts(next) {
                match self.focus.start(next, at) {
                    Ok(started) => {
                        self.timers.arm(TimerSlot::FocusSession);
                        info!(session_type = %next, "session auto-started");
                        self.outbox.push(started);
                    }
                    Err(e) => warn!(error = %e, "auto-start failed"),
                }
            }
        }
    }

    fn notify_session_complete(&mut self, session_type: SessionType, at: DateTime<Utc>) {
        if !self.options.notifications.enabled || !self.focus.settings().notifications_enabled {
            return;
        }
        let texts = &self.options.notifications;
        let (title, body) = if session_type.is_break() {
            (texts.break_complete_title.clone(), texts.break_complete_body.clone())
        } else {
            (texts.focus_complete_title.clone(), texts.focus_complete_body.clone())
        };
        // Delivery failure is logged by the gateway.
        let _ = self.notifier.deliver(&title, &body, at);
    }

    fn on_reminders_fired(&mut self, fired: Vec<Event>, at: DateTime<Utc>) {
        for event in fired {
            if let Event::ReminderFired { message, .. } = &event {
                info!(%message, "reminder fired");
                if self.options.notifications.enabled {
                    let title = self.options.notifications.reminder_title.clone();
                    let _ = self.notifier.deliver(&title, message, at);
                }
            }
            self.outbox.push(event);
        }
        // Persist lastTriggeredAt.
        let settings = self.reminders.settings().clone();
        self.persist(&settings);
    }

    fn log_session(&mut self, record: SessionRecord) {
        let job = StoreJob::RecordSession(record);
        match self.persistence.as_mut() {
            // History failures are logged by the runner.
            Some(persistence) => {
                let _ = persistence.run(job);
            }
            None => self.store_jobs.push(job),
        }
    }

    /// Write `value` inline, or queue it when detached. Returns the inline
    /// authoritative failure.
    fn persist<T: SettingsAggregate>(&mut self, value: &T) -> Option<String> {
        let Some(persistence) = self.persistence.as_mut() else {
            return match StoreJob::save(value) {
                Ok(job) => {
                    self.store_jobs.push(job);
                    None
                }
                Err(e) => Some(e.to_string()),
            };
        };
        persistence.store_mut().save(value).err().map(|e| e.to_string())
    }

    fn commit<T: SettingsAggregate>(&mut self, value: T) -> Committed<T> {
        let warning = self.persist(&value);
        Committed { value, warning }
    }

    fn commit_blocker(&mut self) -> Committed<BlockerSettings> {
        self.commit(self.blocker.settings().clone())
    }

    fn commit_reminders(&mut self) -> Committed<ReminderSettings> {
        self.commit(self.reminders.settings().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocker::LocalGate;
    use crate::clock::ManualClock;
    use crate::notify::LogNotifier;
    use crate::storage::{LocalCache, MemoryBackend, SettingsKey};
    use chrono::{Duration, TimeZone};

    fn engine(focus: FocusSettings) -> (SchedulingEngine, ManualClock, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let backend = MemoryBackend::new();
        let mut store = SettingsStore::new(Box::new(backend), LocalCache::new(dir.path()));
        store.update_focus_settings(&focus).unwrap();
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2026, 5, 4, 9, 0, 0).unwrap());
        let engine = SchedulingEngine::new(
            store,
            Box::new(LocalGate::new()),
            Box::new(LogNotifier),
            Box::new(clock.clone()),
            EngineOptions {
                rng_seed: Some(1),
                ..EngineOptions::default()
            },
        );
        (engine, clock, dir)
    }

    fn one_minute_focus() -> FocusSettings {
        FocusSettings {
            work_duration: 1,
            short_break: 1,
            ..FocusSettings::default()
        }
    }

    fn run(engine: &mut SchedulingEngine, clock: &ManualClock, ticks: u32) -> Vec<Event> {
        let mut events = Vec::new();
        for _ in 0..ticks {
            clock.advance(Duration::seconds(1));
            events.extend(engine.tick());
        }
        events
    }

    #[test]
    fn stale_token_after_stop_is_ignored() {
        let (mut engine, _clock, _dir) = engine(one_minute_focus());
        engine.start_session(SessionType::Focus).unwrap();
        let token = engine.timer_token(TimerSlot::FocusSession).unwrap();
        engine.drain_events();

        engine.stop_session();
        engine.start_session(SessionType::Focus).unwrap();
        engine.drain_events();

        assert!(engine.dispatch(token).is_empty());
        assert_eq!(engine.session().remaining_seconds, 60);
    }

    #[test]
    fn completed_focus_carries_motivation_and_notifies() {
        let (mut engine, clock, _dir) = engine(one_minute_focus());
        engine.start_session(SessionType::Focus).unwrap();

        let events = run(&mut engine, &clock, 60);
        let ended: Vec<_> = events.iter().filter(|e| e.is_session_ended()).collect();
        assert_eq!(ended.len(), 1);
        assert!(matches!(
            ended[0],
            Event::SessionEnded { completed: true, motivation: Some(_), .. }
        ));
        assert_eq!(engine.completed_sessions_today(), 1);
        assert_eq!(engine.session().state, SessionState::Completed);
        assert!(engine.timer_token(TimerSlot::FocusSession).is_none());
        assert_eq!(engine.notifications().count(), 1);
    }

    #[test]
    fn auto_start_break_follows_completed_focus() {
        let (mut engine, clock, _dir) = engine(FocusSettings {
            auto_start_breaks: true,
            ..one_minute_focus()
        });
        engine.start_session(SessionType::Focus).unwrap();
        let events = run(&mut engine, &clock, 60);

        assert!(matches!(
            events.last(),
            Some(Event::SessionStarted { session_type: SessionType::ShortBreak, .. })
        ));
        assert_eq!(engine.session().state, SessionState::Running);
        assert!(engine.timer_token(TimerSlot::FocusSession).is_some());
    }

    #[test]
    fn pause_disarms_and_resume_rearms() {
        let (mut engine, clock, _dir) = engine(one_minute_focus());
        engine.start_session(SessionType::Focus).unwrap();
        run(&mut engine, &clock, 10);

        engine.pause_session().unwrap();
        run(&mut engine, &clock, 30);
        assert_eq!(engine.session().remaining_seconds, 50);

        engine.toggle_pause().unwrap();
        run(&mut engine, &clock, 5);
        assert_eq!(engine.session().remaining_seconds, 45);
    }

    #[test]
    fn detached_engine_queues_writes_in_order() {
        let (mut engine, _clock, _dir) = engine(one_minute_focus());
        let mut persistence = engine.detach_persistence().unwrap();

        let committed = engine.set_blocker_enabled(true);
        assert!(committed.warning.is_none());
        engine.apply_reminder_op(ReminderOp::SetOnlyDuringFocus(true)).unwrap();
        engine.start_session(SessionType::Focus).unwrap();
        engine.stop_session();

        let jobs = engine.drain_store_jobs();
        assert!(matches!(
            jobs.as_slice(),
            [
                StoreJob::Save { key: SettingsKey::Blocker, .. },
                StoreJob::Save { key: SettingsKey::Reminder, .. },
                StoreJob::RecordSession(_),
            ]
        ));
        for job in jobs {
            persistence.run(job).unwrap();
        }
        engine.attach_persistence(persistence);

        let sources = engine.reload_settings();
        assert_eq!(sources.blocker, LoadSource::Authoritative);
        assert!(engine.blocker_settings().enabled);
        assert!(engine.reminder_settings().only_during_focus);
    }

    #[test]
    fn blocker_op_reports_missing_item() {
        let (mut engine, _clock, _dir) = engine(one_minute_focus());
        assert!(matches!(
            engine.apply_blocker_op(BlockerOp::ToggleItem("nope".into())),
            Err(CoreError::NotFound { .. })
        ));
    }

    #[test]
    fn day_rollover_resets_counter() {
        let (mut engine, clock, _dir) = engine(one_minute_focus());
        engine.start_session(SessionType::Focus).unwrap();
        run(&mut engine, &clock, 60);
        assert_eq!(engine.completed_sessions_today(), 1);

        clock.advance(Duration::days(1));
        let events = engine.tick();
        assert!(events
            .iter()
            .any(|e| matches!(e, Event::DayRolledOver { previous_count: 1, .. })));
        assert_eq!(engine.completed_sessions_today(), 0);
    }
}
