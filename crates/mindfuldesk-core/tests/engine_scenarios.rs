//! End-to-end scenarios against a fully wired engine.
//!
//! Each test drives the engine with a manual clock and inspects the emitted
//! events, the enforcement gate and the persisted aggregates.

mod common;

use common::{count_reminders, count_session_ended, short_focus, Harness};
use mindfuldesk_core::{
    BlockItemType, CoreError, Database, Event, ReminderEdit, ReminderType, SessionState,
    SessionType, SettingsKey, TimerSlot,
};

// ============================================================================
// Focus sessions
// ============================================================================

#[test]
fn natural_completion_emits_one_event_and_counts() {
    let mut h = Harness::with_focus(short_focus(1));
    h.engine.start_session(SessionType::Focus).unwrap();

    let events = h.run(60);

    assert_eq!(count_session_ended(&events), 1);
    assert_eq!(h.engine.session().state, SessionState::Completed);
    assert_eq!(h.engine.session().remaining_seconds, 0);
    assert_eq!(h.engine.completed_sessions_today(), 1);
    assert_eq!(h.notifier.titles(), vec!["Focus Session Complete! 🎉".to_string()]);

    // No further ticks reach the finished session.
    assert_eq!(count_session_ended(&h.run(5)), 0);
}

#[test]
fn stop_twice_emits_single_event() {
    let mut h = Harness::with_focus(short_focus(1));
    h.engine.start_session(SessionType::Focus).unwrap();
    h.run(10);

    let first = h.engine.stop_session();
    let second = h.engine.stop_session();
    let events = h.engine.drain_events();

    assert_eq!(count_session_ended(&events), 1);
    assert!(matches!(
        events.iter().find(|e| e.is_session_ended()),
        Some(Event::SessionEnded { completed: false, remaining_seconds: 50, .. })
    ));
    assert_eq!(first.state, SessionState::Idle);
    assert_eq!(second.state, SessionState::Idle);
    assert_eq!(h.engine.completed_sessions_today(), 0);
    assert!(h.notifier.titles().is_empty());
}

#[test]
fn stop_in_final_quantum_beats_completion() {
    let mut h = Harness::with_focus(short_focus(1));
    h.engine.start_session(SessionType::Focus).unwrap();
    let token = h.engine.timer_token(TimerSlot::FocusSession).unwrap();
    let mut events = h.run(59);

    // Stop lands before the tick that would have reached zero.
    h.engine.stop_session();
    events.extend(h.engine.dispatch(token));
    events.extend(h.run(1));

    assert_eq!(count_session_ended(&events), 1);
    assert_eq!(h.engine.completed_sessions_today(), 0);
}

#[test]
fn pause_and_resume_rules() {
    let mut h = Harness::with_focus(short_focus(1));
    assert!(matches!(
        h.engine.pause_session(),
        Err(CoreError::InvalidTransition { .. })
    ));

    h.engine.start_session(SessionType::Focus).unwrap();
    assert!(matches!(
        h.engine.start_session(SessionType::ShortBreak),
        Err(CoreError::InvalidTransition { .. })
    ));

    h.engine.pause_session().unwrap();
    h.engine.pause_session().unwrap();
    let paused: Vec<_> = h
        .engine
        .drain_events()
        .into_iter()
        .filter(|e| matches!(e, Event::SessionPaused { .. }))
        .collect();
    assert_eq!(paused.len(), 1);

    h.run(30);
    assert_eq!(h.engine.session().remaining_seconds, 60);
    h.engine.resume_session().unwrap();
    h.run(30);
    assert_eq!(h.engine.session().remaining_seconds, 30);
}

#[test]
fn long_break_after_configured_focus_count() {
    let mut h = Harness::with_focus(short_focus(1));
    for round in 0..4 {
        h.engine.start_next_session().unwrap();
        assert_eq!(h.engine.session().session_type, SessionType::Focus, "round {round}");
        h.run(60);
        if round < 3 {
            h.engine.start_next_session().unwrap();
            assert_eq!(h.engine.session().session_type, SessionType::ShortBreak);
            h.run(60);
        }
    }
    assert_eq!(h.engine.completed_sessions_today(), 4);

    let started = h.engine.start_next_session().unwrap();
    assert_eq!(started.session_type, SessionType::LongBreak);
    assert_eq!(started.total_seconds, 120);
}

#[test]
fn notifier_failure_does_not_block_transition() {
    let mut h = Harness::with_focus(short_focus(1));
    h.notifier.set_failing(true);
    h.engine.start_session(SessionType::Focus).unwrap();

    let events = h.run(60);

    assert_eq!(count_session_ended(&events), 1);
    assert_eq!(h.engine.session().state, SessionState::Completed);
    let last = h.engine.notifications().last().unwrap();
    assert!(!last.delivered);
}

#[test]
fn ended_sessions_are_recorded() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("history.db");
    let h = Harness::with_focus(short_focus(1));
    let Harness {
        engine,
        clock,
        dir: _cache_dir,
        ..
    } = h;
    let mut engine = engine.with_session_log(Box::new(Database::open(&db_path).unwrap()));

    engine.start_session(SessionType::Focus).unwrap();
    for _ in 0..60 {
        clock.advance(chrono::Duration::seconds(1));
        engine.tick();
    }
    engine.start_session(SessionType::ShortBreak).unwrap();
    engine.stop_session();

    let stats = Database::open(&db_path).unwrap().stats_all().unwrap();
    assert_eq!(stats.total_sessions, 2);
    assert_eq!(stats.completed_focus_sessions, 1);
    assert_eq!(stats.stopped_sessions, 1);
    assert_eq!(stats.focus_min, 1);
}

// ============================================================================
// Blocker and override window
// ============================================================================

#[test]
fn youtube_toggled_off_is_not_engaged() {
    let mut h = Harness::new();
    h.engine.set_blocker_enabled(true);
    let added = h
        .engine
        .add_blocked_item("YouTube", "youtube.com", BlockItemType::Website)
        .unwrap();
    let id = added.value.blocked_items[0].id.clone();
    assert!(h.gate.is_engaged("youtube.com"));

    let toggled = h.engine.toggle_blocked_item(&id).unwrap();

    assert!(!toggled.value.blocked_items[0].is_active);
    assert!(toggled.warning.is_none());
    assert!(!h.gate.is_engaged("youtube.com"));
    assert!(!h.engine.is_url_blocked("https://www.youtube.com/watch"));
}

#[test]
fn override_is_capped_and_expires() {
    let mut h = Harness::new();
    h.engine.set_blocker_enabled(true);
    h.engine.set_override_policy(true, 200).unwrap();

    let window = h.engine.request_override(300).unwrap();
    assert!(window.active);
    assert_eq!(window.remaining_seconds, 200);
    assert!(h.gate.is_bypass_open());

    let events = h.run(199);
    assert!(h.engine.override_window().active);
    assert!(!events.iter().any(|e| matches!(e, Event::OverrideEnded { .. })));

    let events = h.run(1);
    assert!(events
        .iter()
        .any(|e| matches!(e, Event::OverrideEnded { expired: true, .. })));
    assert!(!h.engine.override_window().active);
    assert_eq!(h.engine.override_window().remaining_seconds, 0);
    assert!(!h.gate.is_bypass_open());
    assert!(h.engine.timer_token(TimerSlot::OverrideWindow).is_none());
}

#[test]
fn override_requires_enabled_blocker_and_permission() {
    let mut h = Harness::new();
    assert!(matches!(
        h.engine.request_override(60),
        Err(CoreError::NotPermitted(_))
    ));

    h.engine.set_blocker_enabled(true);
    h.engine.set_override_policy(false, 300).unwrap();
    assert!(matches!(
        h.engine.request_override(60),
        Err(CoreError::NotPermitted(_))
    ));
    assert!(!h.gate.is_bypass_open());
}

#[test]
fn end_override_is_idempotent_and_independent_of_session() {
    let mut h = Harness::with_focus(short_focus(1));
    h.engine.set_blocker_enabled(true);
    h.engine.start_session(SessionType::Focus).unwrap();
    h.engine.request_override(30).unwrap();

    h.engine.stop_session();
    assert!(h.engine.override_window().active);

    let first = h.engine.end_override();
    let second = h.engine.end_override();
    assert!(!first.active && !second.active);
    let ended = h
        .engine
        .drain_events()
        .into_iter()
        .filter(|e| matches!(e, Event::OverrideEnded { .. }))
        .count();
    assert_eq!(ended, 1);
}

// ============================================================================
// Reminders
// ============================================================================

#[test]
fn focus_gated_reminder_waits_for_running_focus() {
    let mut h = Harness::new();
    h.engine.set_only_during_focus(true);
    h.engine.add_custom_reminder(1, "Look away").unwrap();
    h.engine.start_session(SessionType::Focus).unwrap();
    h.engine.pause_session().unwrap();

    assert_eq!(count_reminders(&h.run(59)), 0);

    h.engine.resume_session().unwrap();
    let events = h.run(60);
    assert_eq!(count_reminders(&events), 1);
    assert_eq!(h.notifier.titles(), vec!["Health Reminder".to_string()]);
}

#[test]
fn master_switch_restarts_full_intervals() {
    let mut h = Harness::new();
    let posture = h
        .engine
        .reminder_settings()
        .reminders
        .iter()
        .find(|r| r.reminder_type == ReminderType::Posture)
        .unwrap()
        .id
        .clone();
    h.engine.set_reminder_enabled(&posture, false).unwrap();
    h.run(600);
    assert_eq!(h.engine.reminder_countdowns().len(), 3);

    h.engine.set_reminders_enabled(false);
    assert!(h.engine.reminder_countdowns().is_empty());
    h.run(300);
    h.engine.set_reminders_enabled(true);

    let settings = h.engine.reminder_settings().clone();
    for countdown in h.engine.reminder_countdowns() {
        let reminder = settings
            .reminders
            .iter()
            .find(|r| r.id == countdown.reminder_id)
            .unwrap();
        assert_eq!(
            countdown.remaining_seconds,
            u64::from(reminder.interval_minutes) * 60
        );
    }
    assert_eq!(h.engine.reminder_countdowns().len(), 3);
}

#[test]
fn fired_reminder_persists_last_triggered() {
    let mut h = Harness::new();
    let added = h.engine.add_custom_reminder(1, "Walk").unwrap();
    let id = added.value.reminders.last().unwrap().id.clone();

    h.run(60);

    let stored = h.backend.raw(SettingsKey::Reminder).unwrap();
    let stored: mindfuldesk_core::ReminderSettings = serde_json::from_str(&stored).unwrap();
    assert!(stored.reminder(&id).unwrap().last_triggered.is_some());
}

#[test]
fn reload_keeps_countdowns_of_unchanged_reminders() {
    let mut live = Harness::new();
    let mut other = Harness::with_backend(live.backend.clone());
    let hydration = live.reminder_id(ReminderType::Hydration);
    let eye_rest = live.reminder_id(ReminderType::EyeRest);
    let posture = live.reminder_id(ReminderType::Posture);

    live.run(600);
    assert_eq!(live.remaining(&hydration), Some(1200));

    other
        .engine
        .edit_reminder(
            &eye_rest,
            ReminderEdit {
                interval_minutes: None,
                message: Some("Look out the window".into()),
            },
        )
        .unwrap();
    other
        .engine
        .edit_reminder(
            &posture,
            ReminderEdit {
                interval_minutes: Some(5),
                message: None,
            },
        )
        .unwrap();
    live.engine.reload_settings();

    assert_eq!(live.remaining(&hydration), Some(1200));
    assert_eq!(live.remaining(&eye_rest), Some(600));
    assert_eq!(live.remaining(&posture), Some(300));
    assert_eq!(
        live.engine.reminder_settings().reminder(&eye_rest).unwrap().message,
        "Look out the window"
    );
}

#[test]
fn reminder_list_mutations() {
    let mut h = Harness::new();
    let builtin = h.engine.reminder_settings().reminders[0].id.clone();
    assert!(matches!(
        h.engine.delete_reminder(&builtin),
        Err(CoreError::NotPermitted(_))
    ));
    assert!(matches!(
        h.engine.toggle_reminder("missing"),
        Err(CoreError::NotFound { .. })
    ));
    assert!(matches!(
        h.engine.add_custom_reminder(0, "bad"),
        Err(CoreError::Validation(_))
    ));

    let edited = h
        .engine
        .edit_reminder(
            &builtin,
            ReminderEdit {
                interval_minutes: Some(10),
                message: Some("Drink water".into()),
            },
        )
        .unwrap();
    let hydration = edited.value.reminder(&builtin).unwrap();
    assert_eq!(hydration.interval_minutes, 10);
    assert_eq!(hydration.message, "Drink water");

    let custom = h.engine.add_custom_reminder(15, "Breathe").unwrap();
    let custom_id = custom.value.reminders.last().unwrap().id.clone();
    let after = h.engine.delete_reminder(&custom_id).unwrap();
    assert!(after.value.reminder(&custom_id).is_none());
}

// ============================================================================
// Persistence failures
// ============================================================================

#[test]
fn write_failure_keeps_update_and_warns() {
    let mut h = Harness::new();
    h.backend.set_fail_writes(true);

    let committed = h.engine.set_blocker_enabled(true);

    assert!(committed.value.enabled);
    assert!(committed.warning.is_some());
    assert!(h.engine.blocker_settings().enabled);
    assert!(h.engine.snapshot().blocker.enabled);
    assert!(h
        .dir
        .path()
        .join("cache")
        .join("mindfuldesk_blocker_settings.json")
        .exists());
}

#[test]
fn focus_settings_validation_and_idle_refresh() {
    let mut h = Harness::new();
    let mut settings = h.engine.focus_settings().clone();
    settings.work_duration = 0;
    assert!(matches!(
        h.engine.save_focus_settings(settings.clone()),
        Err(CoreError::Validation(_))
    ));

    settings.work_duration = 50;
    h.engine.save_focus_settings(settings).unwrap();
    assert_eq!(h.engine.session().total_seconds, 3000);
    assert_eq!(h.engine.session().state, SessionState::Idle);
}
