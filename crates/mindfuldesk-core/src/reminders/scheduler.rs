//! Independent countdowns for health reminders.
//!
//! Reminders are scheduled on a gated clock: `active_seconds` only advances
//! on ticks where the scheduler is enabled and (when `only_during_focus` is
//! set) a Focus session is running. Each enabled reminder holds a deadline on
//! that clock in a [`DeadlineQueue`], so suspension keeps partial progress
//! while disabling drops it.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use super::settings::{HealthReminder, ReminderEdit, ReminderSettings};
use crate::driver::DeadlineQueue;
use crate::error::{CoreError, Result};
use crate::events::Event;
use crate::timer::FocusStatus;

/// Seconds until a reminder fires, on the gated clock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReminderCountdown {
    pub reminder_id: String,
    pub remaining_seconds: u64,
}

pub struct ReminderScheduler {
    settings: ReminderSettings,
    queue: DeadlineQueue<String>,
    active_seconds: u64,
}

impl ReminderScheduler {
    pub fn new(settings: ReminderSettings) -> Self {
        let mut scheduler = Self {
            settings,
            queue: DeadlineQueue::new(),
            active_seconds: 0,
        };
        scheduler.rearm_all();
        scheduler
    }

    pub fn settings(&self) -> &ReminderSettings {
        &self.settings
    }

    pub fn is_armed(&self, id: &str) -> bool {
        self.queue.contains(&id.to_string())
    }

    pub fn remaining_seconds(&self, id: &str) -> Option<u64> {
        self.queue
            .deadline(&id.to_string())
            .map(|deadline| deadline.saturating_sub(self.active_seconds))
    }

    /// Armed reminders in list order.
    pub fn countdowns(&self) -> Vec<ReminderCountdown> {
        self.settings
            .reminders
            .iter()
            .filter_map(|r| {
                self.remaining_seconds(&r.id).map(|remaining_seconds| ReminderCountdown {
                    reminder_id: r.id.clone(),
                    remaining_seconds,
                })
            })
            .collect()
    }

    // ── Master switch ────────────────────────────────────────────────

    pub fn enable_all(&mut self) {
        self.set_enabled(true);
    }

    pub fn disable_all(&mut self) {
        self.set_enabled(false);
    }

    /// Re-enabling restarts every enabled reminder from its full interval.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.settings.enabled = enabled;
        self.rearm_all();
    }

    /// Changing the gate never resets countdowns.
    pub fn set_only_during_focus(&mut self, only_during_focus: bool) {
        self.settings.only_during_focus = only_during_focus;
    }

    /// Adopt reloaded settings. Countdowns are matched by id: a reminder
    /// whose `enabled` flag and interval are unchanged keeps its deadline,
    /// changed or new ones restart, removed ones are cancelled. Flipping the
    /// master switch restarts everything.
    pub fn replace_settings(&mut self, settings: ReminderSettings) {
        let previous = std::mem::replace(&mut self.settings, settings);
        if previous.enabled != self.settings.enabled {
            self.rearm_all();
            return;
        }

        for old in &previous.reminders {
            if self.settings.reminder(&old.id).is_none() {
                self.queue.cancel(&old.id);
            }
        }
        let changed: Vec<HealthReminder> = self
            .settings
            .reminders
            .iter()
            .filter(|r| match previous.reminder(&r.id) {
                Some(old) => old.enabled != r.enabled || old.interval_minutes != r.interval_minutes,
                None => true,
            })
            .cloned()
            .collect();
        for reminder in &changed {
            self.rearm(reminder);
        }
    }

    // ── List mutations ───────────────────────────────────────────────

    pub fn toggle(&mut self, id: &str) -> Result<HealthReminder> {
        let enabled = !self.reminder(id)?.enabled;
        self.set_reminder_enabled(id, enabled)
    }

    pub fn set_reminder_enabled(&mut self, id: &str, enabled: bool) -> Result<HealthReminder> {
        let reminder = self.reminder_mut(id)?;
        reminder.enabled = enabled;
        let reminder = reminder.clone();
        self.rearm(&reminder);
        Ok(reminder)
    }

    /// A new interval restarts the countdown; a message-only edit does not.
    pub fn edit(&mut self, id: &str, edit: ReminderEdit) -> Result<HealthReminder> {
        edit.validate()?;
        let reminder = self.reminder_mut(id)?;
        let interval_changed = edit
            .interval_minutes
            .is_some_and(|interval| interval != reminder.interval_minutes);
        if let Some(interval) = edit.interval_minutes {
            reminder.interval_minutes = interval;
        }
        if let Some(message) = edit.message {
            reminder.message = message.trim().to_string();
        }
        let reminder = reminder.clone();
        if interval_changed {
            self.rearm(&reminder);
        }
        Ok(reminder)
    }

    pub fn add_custom(&mut self, interval_minutes: u32, message: &str) -> Result<HealthReminder> {
        let reminder = HealthReminder::custom(interval_minutes, message)?;
        self.settings.reminders.push(reminder.clone());
        self.rearm(&reminder);
        Ok(reminder)
    }

    /// Only custom reminders can be deleted.
    pub fn delete(&mut self, id: &str) -> Result<HealthReminder> {
        let reminder = self.reminder(id)?;
        if reminder.reminder_type.is_builtin() {
            return Err(CoreError::NotPermitted(format!(
                "built-in {:?} reminder cannot be deleted",
                reminder.reminder_type
            )));
        }
        self.queue.cancel(&id.to_string());
        let index = self
            .settings
            .reminders
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| not_found(id))?;
        Ok(self.settings.reminders.remove(index))
    }

    // ── Driver ───────────────────────────────────────────────────────

    /// Advance one second. Returns the reminders that fired, each already
    /// re-armed for its next full period.
    pub fn tick(&mut self, focus: &dyn FocusStatus, at: DateTime<Utc>) -> Vec<Event> {
        if !self.settings.enabled {
            return Vec::new();
        }
        if self.settings.only_during_focus && !focus.focus_running() {
            return Vec::new();
        }
        self.active_seconds += 1;

        let mut fired = Vec::new();
        for id in self.queue.pop_due(self.active_seconds) {
            let Some(reminder) = self.settings.reminders.iter_mut().find(|r| r.id == id) else {
                debug!(reminder_id = %id, "dropping countdown for removed reminder");
                continue;
            };
            reminder.last_triggered = Some(at);
            let event = Event::ReminderFired {
                reminder_id: reminder.id.clone(),
                reminder_type: reminder.reminder_type,
                message: reminder.message.clone(),
                at,
            };
            let next = self.active_seconds + reminder.period_secs();
            self.queue.schedule(id, next);
            fired.push(event);
        }
        fired
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn reminder(&self, id: &str) -> Result<&HealthReminder> {
        self.settings.reminder(id).ok_or_else(|| not_found(id))
    }

    fn reminder_mut(&mut self, id: &str) -> Result<&mut HealthReminder> {
        self.settings
            .reminders
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| not_found(id))
    }

    fn rearm(&mut self, reminder: &HealthReminder) {
        if self.settings.enabled && reminder.enabled {
            self.queue
                .schedule(reminder.id.clone(), self.active_seconds + reminder.period_secs());
        } else {
            self.queue.cancel(&reminder.id);
        }
    }

    fn rearm_all(&mut self) {
        self.queue.clear();
        if !self.settings.enabled {
            return;
        }
        for reminder in self.settings.reminders.iter().filter(|r| r.enabled) {
            self.queue
                .schedule(reminder.id.clone(), self.active_seconds + reminder.period_secs());
        }
    }
}

fn not_found(id: &str) -> CoreError {
    CoreError::NotFound {
        kind: "reminder",
        id: id.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reminders::ReminderType;

    struct FixedFocus(bool);

    impl FocusStatus for FixedFocus {
        fn focus_running(&self) -> bool {
            self.0
        }
    }

    fn single(interval_minutes: u32, only_during_focus: bool) -> (ReminderScheduler, String) {
        let reminder = HealthReminder::custom(interval_minutes, "Walk").unwrap();
        let id = reminder.id.clone();
        let scheduler = ReminderScheduler::new(ReminderSettings {
            reminders: vec![reminder],
            enabled: true,
            only_during_focus,
        });
        (scheduler, id)
    }

    fn advance(scheduler: &mut ReminderScheduler, focus: bool, ticks: u32) -> Vec<Event> {
        let mut events = Vec::new();
        for _ in 0..ticks {
            events.extend(scheduler.tick(&FixedFocus(focus), Utc::now()));
        }
        events
    }

    #[test]
    fn fires_every_period_and_records_trigger_time() {
        let (mut scheduler, id) = single(1, false);
        assert!(advance(&mut scheduler, false, 59).is_empty());
        assert_eq!(advance(&mut scheduler, false, 1).len(), 1);
        assert!(scheduler.settings().reminder(&id).unwrap().last_triggered.is_some());
        assert_eq!(scheduler.remaining_seconds(&id), Some(60));
        assert_eq!(advance(&mut scheduler, false, 60).len(), 1);
    }

    #[test]
    fn reminders_tick_independently() {
        let mut settings = ReminderSettings::default();
        settings.reminders.truncate(0);
        settings.reminders.push(HealthReminder::custom(1, "one").unwrap());
        settings.reminders.push(HealthReminder::custom(3, "three").unwrap());
        let mut scheduler = ReminderScheduler::new(settings);

        let events = advance(&mut scheduler, false, 180);
        let messages: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                Event::ReminderFired { message, .. } => Some(message.as_str()),
                _ => None,
            })
            .collect();
        // Equal deadlines fire in the order they were armed.
        assert_eq!(messages, vec!["one", "one", "three", "one"]);
    }

    #[test]
    fn focus_gate_suspends_without_reset() {
        let (mut scheduler, id) = single(1, true);
        assert!(advance(&mut scheduler, true, 30).is_empty());
        assert!(advance(&mut scheduler, false, 500).is_empty());
        assert_eq!(scheduler.remaining_seconds(&id), Some(30));
        assert_eq!(advance(&mut scheduler, true, 30).len(), 1);
    }

    #[test]
    fn disable_then_enable_restarts_full_interval() {
        let (mut scheduler, id) = single(2, false);
        advance(&mut scheduler, false, 100);
        assert_eq!(scheduler.remaining_seconds(&id), Some(20));

        scheduler.disable_all();
        assert!(!scheduler.is_armed(&id));
        assert!(advance(&mut scheduler, false, 200).is_empty());

        scheduler.enable_all();
        assert_eq!(scheduler.remaining_seconds(&id), Some(120));
    }

    #[test]
    fn interval_edit_restarts_countdown() {
        let (mut scheduler, id) = single(1, false);
        advance(&mut scheduler, false, 45);

        scheduler
            .edit(&id, ReminderEdit { interval_minutes: None, message: Some("Stand up".into()) })
            .unwrap();
        assert_eq!(scheduler.remaining_seconds(&id), Some(15));

        let edited = scheduler
            .edit(&id, ReminderEdit { interval_minutes: Some(5), message: None })
            .unwrap();
        assert_eq!(edited.message, "Stand up");
        assert_eq!(scheduler.remaining_seconds(&id), Some(300));
    }

    #[test]
    fn toggle_off_cancels_countdown() {
        let (mut scheduler, id) = single(1, false);
        let toggled = scheduler.toggle(&id).unwrap();
        assert!(!toggled.enabled);
        assert!(advance(&mut scheduler, false, 120).is_empty());

        scheduler.toggle(&id).unwrap();
        assert_eq!(scheduler.remaining_seconds(&id), Some(60));
    }

    #[test]
    fn builtins_cannot_be_deleted() {
        let mut scheduler = ReminderScheduler::new(ReminderSettings::default());
        let hydration = scheduler.settings().reminders[0].clone();
        assert_eq!(hydration.reminder_type, ReminderType::Hydration);
        assert!(matches!(scheduler.delete(&hydration.id), Err(CoreError::NotPermitted(_))));
        assert!(scheduler.is_armed(&hydration.id));
    }

    #[test]
    fn deleted_custom_reminder_never_fires() {
        let (mut scheduler, id) = single(1, false);
        scheduler.delete(&id).unwrap();
        assert!(scheduler.settings().reminders.is_empty());
        assert!(advance(&mut scheduler, false, 120).is_empty());
        assert!(matches!(scheduler.delete(&id), Err(CoreError::NotFound { .. })));
    }

    #[test]
    fn replacing_settings_keeps_unchanged_countdowns() {
        let mut settings = ReminderSettings::default();
        settings.reminders.truncate(0);
        settings.reminders.push(HealthReminder::custom(10, "water").unwrap());
        settings.reminders.push(HealthReminder::custom(20, "eyes").unwrap());
        settings.reminders.push(HealthReminder::custom(30, "walk").unwrap());
        let ids: Vec<String> = settings.reminders.iter().map(|r| r.id.clone()).collect();
        let mut scheduler = ReminderScheduler::new(settings);
        advance(&mut scheduler, false, 300);

        let mut reloaded = scheduler.settings().clone();
        reloaded.reminders[0].message = "drink".into();
        reloaded.reminders[1].interval_minutes = 2;
        reloaded.reminders.remove(2);
        reloaded.reminders.push(HealthReminder::custom(1, "new").unwrap());
        let new_id = reloaded.reminders[2].id.clone();
        scheduler.replace_settings(reloaded);

        assert_eq!(scheduler.remaining_seconds(&ids[0]), Some(300));
        assert_eq!(scheduler.remaining_seconds(&ids[1]), Some(120));
        assert!(!scheduler.is_armed(&ids[2]));
        assert_eq!(scheduler.remaining_seconds(&new_id), Some(60));
        assert_eq!(scheduler.settings().reminders[0].message, "drink");
    }

    #[test]
    fn replacing_settings_with_master_off_cancels_all() {
        let (mut scheduler, id) = single(1, false);
        let mut reloaded = scheduler.settings().clone();
        reloaded.enabled = false;
        scheduler.replace_settings(reloaded);
        assert!(!scheduler.is_armed(&id));
    }

    #[test]
    fn toggling_while_master_off_does_not_arm() {
        let (mut scheduler, id) = single(1, false);
        scheduler.disable_all();
        scheduler.toggle(&id).unwrap();
        scheduler.toggle(&id).unwrap();
        assert!(!scheduler.is_armed(&id));
    }
}
