//! Focus session state machine.
//!
//! The machine has no internal thread. The driver calls `tick()` once per
//! elapsed second while the session is running.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running <-> Paused -> Completed -> Idle(next)
//! ```
//!
//! Natural completion leaves the machine in `Completed` with zero seconds
//! remaining until the next `start()`. `stop()` passes through `Completed`
//! and lands on a fresh `Idle` session in the same call.
//!
//! ## Usage
//!
//! ```ignore
//! let mut machine = FocusSessionMachine::new(FocusSettings::default());
//! machine.start(SessionType::Focus, now)?;
//! // Once per second:
//! machine.tick(now); // Returns Some(Event::SessionEnded) on completion
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::settings::{FocusSettings, SessionType};
use crate::error::{CoreError, Result};
use crate::events::Event;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Idle,
    Running,
    Paused,
    Completed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Running => "running",
            SessionState::Paused => "paused",
            SessionState::Completed => "completed",
        };
        f.write_str(name)
    }
}

/// The single active focus/break session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FocusSession {
    pub state: SessionState,
    pub session_type: SessionType,
    pub remaining_seconds: u32,
    pub total_seconds: u32,
}

impl FocusSession {
    fn idle(session_type: SessionType, settings: &FocusSettings) -> Self {
        let total = settings.duration_secs(session_type);
        Self {
            state: SessionState::Idle,
            session_type,
            remaining_seconds: total,
            total_seconds: total,
        }
    }

    pub fn elapsed_seconds(&self) -> u32 {
        self.total_seconds.saturating_sub(self.remaining_seconds)
    }

    /// 0.0 .. 1.0 progress within the session.
    pub fn progress(&self) -> f64 {
        if self.total_seconds == 0 {
            return 0.0;
        }
        1.0 - (self.remaining_seconds as f64 / self.total_seconds as f64)
    }
}

/// Read-only view of the focus machine used for reminder gating.
pub trait FocusStatus {
    /// True while a Focus (not break) session is Running.
    fn focus_running(&self) -> bool;
}

#[derive(Debug, Clone)]
pub struct FocusSessionMachine {
    settings: FocusSettings,
    session: FocusSession,
    completed_today: u32,
    /// Focus sessions completed since the last long break started.
    focus_streak: u32,
    day: Option<NaiveDate>,
    started_at: Option<DateTime<Utc>>,
}

impl FocusSessionMachine {
    /// Starts `Idle` with a Focus session ready.
    pub fn new(settings: FocusSettings) -> Self {
        let session = FocusSession::idle(SessionType::Focus, &settings);
        Self {
            settings,
            session,
            completed_today: 0,
            focus_streak: 0,
            day: None,
            started_at: None,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn session(&self) -> &FocusSession {
        &self.session
    }

    pub fn state(&self) -> SessionState {
        self.session.state
    }

    pub fn settings(&self) -> &FocusSettings {
        &self.settings
    }

    pub fn completed_sessions_today(&self) -> u32 {
        self.completed_today
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    /// Type the next session defaults to once the current one ends.
    pub fn next_session_type(&self) -> SessionType {
        match self.session.state {
            SessionState::Completed => self.after_completion(self.session.session_type),
            _ => self.session.session_type,
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn start(&mut self, session_type: SessionType, at: DateTime<Utc>) -> Result<Event> {
        match self.session.state {
            SessionState::Idle | SessionState::Completed => {
                let total = self.settings.duration_secs(session_type);
                if session_type == SessionType::LongBreak {
                    self.focus_streak = 0;
                }
                self.session = FocusSession {
                    state: SessionState::Running,
                    session_type,
                    remaining_seconds: total,
                    total_seconds: total,
                };
                self.started_at = Some(at);
                Ok(Event::SessionStarted {
                    session_type,
                    total_seconds: total,
                    at,
                })
            }
            state => Err(CoreError::invalid_transition("start", state)),
        }
    }

    /// Pausing an already paused session is a no-op.
    pub fn pause(&mut self, at: DateTime<Utc>) -> Result<Option<Event>> {
        match self.session.state {
            SessionState::Running => {
                self.session.state = SessionState::Paused;
                Ok(Some(Event::SessionPaused {
                    remaining_seconds: self.session.remaining_seconds,
                    at,
                }))
            }
            SessionState::Paused => Ok(None),
            state => Err(CoreError::invalid_transition("pause", state)),
        }
    }

    /// Resuming a running session is a no-op.
    pub fn resume(&mut self, at: DateTime<Utc>) -> Result<Option<Event>> {
        match self.session.state {
            SessionState::Paused => {
                self.session.state = SessionState::Running;
                Ok(Some(Event::SessionResumed {
                    remaining_seconds: self.session.remaining_seconds,
                    at,
                }))
            }
            SessionState::Running => Ok(None),
            state => Err(CoreError::invalid_transition("resume", state)),
        }
    }

    pub fn toggle_pause(&mut self, at: DateTime<Utc>) -> Result<Option<Event>> {
        match self.session.state {
            SessionState::Running => self.pause(at),
            SessionState::Paused => self.resume(at),
            state => Err(CoreError::invalid_transition("toggle pause", state)),
        }
    }

    /// Call once per elapsed second. Returns `Some(Event::SessionEnded)` on the
    /// tick that reaches zero; later ticks are ignored until the next start.
    pub fn tick(&mut self, at: DateTime<Utc>) -> Option<Event> {
        if self.session.state != SessionState::Running {
            return None;
        }
        self.session.remaining_seconds = self.session.remaining_seconds.saturating_sub(1);
        if self.session.remaining_seconds == 0 {
            return Some(self.finish(true, at));
        }
        None
    }

    /// End the session early. Always succeeds; only a Running or Paused
    /// session produces an event, so repeated stops never duplicate it.
    pub fn stop(&mut self, at: DateTime<Utc>) -> Option<Event> {
        match self.session.state {
            SessionState::Running | SessionState::Paused => {
                let event = self.finish(false, at);
                self.session = FocusSession::idle(SessionType::Focus, &self.settings);
                Some(event)
            }
            SessionState::Completed => {
                let next = self.next_session_type();
                self.session = FocusSession::idle(next, &self.settings);
                None
            }
            SessionState::Idle => None,
        }
    }

    /// Replace durations. An Idle session picks up the new length at once;
    /// a live session keeps its countdown.
    pub fn set_settings(&mut self, settings: FocusSettings) {
        self.settings = settings;
        if self.session.state == SessionState::Idle {
            self.session = FocusSession::idle(self.session.session_type, &self.settings);
        }
    }

    /// Reset the daily counter when `today` differs from the last observed day.
    pub fn observe_day(&mut self, today: NaiveDate, at: DateTime<Utc>) -> Option<Event> {
        match self.day.replace(today) {
            Some(previous) if previous != today => {
                let previous_count = std::mem::take(&mut self.completed_today);
                Some(Event::DayRolledOver { previous_count, at })
            }
            _ => None,
        }
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn finish(&mut self, completed: bool, at: DateTime<Utc>) -> Event {
        let session_type = self.session.session_type;
        self.session.state = SessionState::Completed;
        if completed && session_type == SessionType::Focus {
            self.completed_today += 1;
            self.focus_streak += 1;
        }
        Event::SessionEnded {
            session_type,
            completed,
            remaining_seconds: self.session.remaining_seconds,
            total_seconds: self.session.total_seconds,
            completed_sessions_today: self.completed_today,
            started_at: self.started_at.take(),
            motivation: None,
            at,
        }
    }

    fn after_completion(&self, finished: SessionType) -> SessionType {
        match finished {
            SessionType::Focus if self.focus_streak >= self.settings.sessions_before_long_break => {
                SessionType::LongBreak
            }
            SessionType::Focus => SessionType::ShortBreak,
            SessionType::ShortBreak | SessionType::LongBreak => SessionType::Focus,
        }
    }
}

impl FocusStatus for FocusSessionMachine {
    fn focus_running(&self) -> bool {
        self.session.state == SessionState::Running
            && self.session.session_type == SessionType::Focus
    }
}
