use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::reminders::ReminderType;
use crate::timer::SessionType;

/// Every state change in the engine produces an Event.
/// The presentation layer drains them after each command or tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    SessionStarted {
        session_type: SessionType,
        total_seconds: u32,
        at: DateTime<Utc>,
    },
    SessionPaused {
        remaining_seconds: u32,
        at: DateTime<Utc>,
    },
    SessionResumed {
        remaining_seconds: u32,
        at: DateTime<Utc>,
    },
    /// Emitted exactly once per session, on natural completion or stop.
    SessionEnded {
        session_type: SessionType,
        /// True only when the countdown reached zero.
        completed: bool,
        remaining_seconds: u32,
        total_seconds: u32,
        completed_sessions_today: u32,
        started_at: Option<DateTime<Utc>>,
        /// Rotating encouragement shown after a completed focus session.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        motivation: Option<String>,
        at: DateTime<Utc>,
    },
    /// The local day changed and the daily counter was reset.
    DayRolledOver {
        previous_count: u32,
        at: DateTime<Utc>,
    },
    OverrideStarted {
        duration_seconds: u32,
        at: DateTime<Utc>,
    },
    OverrideEnded {
        /// True when the countdown ran out rather than being ended explicitly.
        expired: bool,
        at: DateTime<Utc>,
    },
    ReminderFired {
        reminder_id: String,
        reminder_type: ReminderType,
        message: String,
        at: DateTime<Utc>,
    },
    /// A queued settings write did not reach the authoritative store. The
    /// value is applied in memory and held in the local cache.
    StoreWriteFailed {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        key: Option<String>,
        message: String,
        at: DateTime<Utc>,
    },
}

impl Event {
    pub fn at(&self) -> DateTime<Utc> {
        match self {
            Event::SessionStarted { at, .. }
            | Event::SessionPaused { at, .. }
            | Event::SessionResumed { at, .. }
            | Event::SessionEnded { at, .. }
            | Event::DayRolledOver { at, .. }
            | Event::OverrideStarted { at, .. }
            | Event::OverrideEnded { at, .. }
            | Event::ReminderFired { at, .. }
            | Event::StoreWriteFailed { at, .. } => *at,
        }
    }

    pub fn is_session_ended(&self) -> bool {
        matches!(self, Event::SessionEnded { .. })
    }
}
