use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionType {
    Focus,
    ShortBreak,
    LongBreak,
}

impl SessionType {
    pub fn is_break(self) -> bool {
        !matches!(self, SessionType::Focus)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SessionType::Focus => "focus",
            SessionType::ShortBreak => "short_break",
            SessionType::LongBreak => "long_break",
        }
    }
}

impl fmt::Display for SessionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "focus" => Ok(SessionType::Focus),
            "short" | "short_break" | "shortbreak" => Ok(SessionType::ShortBreak),
            "long" | "long_break" | "longbreak" => Ok(SessionType::LongBreak),
            other => Err(ValidationError::InvalidValue {
                field: "sessionType".into(),
                message: format!("unknown session type '{other}'"),
            }),
        }
    }
}

/// Focus/break durations and session behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FocusSettings {
    /// Focus length in minutes.
    #[serde(default = "default_work_duration")]
    pub work_duration: u32,
    #[serde(default = "default_short_break")]
    pub short_break: u32,
    #[serde(default = "default_long_break")]
    pub long_break: u32,
    #[serde(default = "default_sessions_before_long_break")]
    pub sessions_before_long_break: u32,
    #[serde(default)]
    pub auto_start_breaks: bool,
    #[serde(default)]
    pub auto_start_focus: bool,
    #[serde(default = "default_true")]
    pub notifications_enabled: bool,
    #[serde(default = "default_true")]
    pub sound_enabled: bool,
}

fn default_work_duration() -> u32 {
    25
}
fn default_short_break() -> u32 {
    5
}
fn default_long_break() -> u32 {
    15
}
fn default_sessions_before_long_break() -> u32 {
    4
}
fn default_true() -> bool {
    true
}

impl Default for FocusSettings {
    fn default() -> Self {
        Self {
            work_duration: default_work_duration(),
            short_break: default_short_break(),
            long_break: default_long_break(),
            sessions_before_long_break: default_sessions_before_long_break(),
            auto_start_breaks: false,
            auto_start_focus: false,
            notifications_enabled: true,
            sound_enabled: true,
        }
    }
}

impl FocusSettings {
    pub fn validate(&self) -> Result<(), ValidationError> {
        ValidationError::check_min("workDuration", self.work_duration, 1)?;
        ValidationError::check_min("shortBreak", self.short_break, 1)?;
        ValidationError::check_min("longBreak", self.long_break, 1)?;
        ValidationError::check_min(
            "sessionsBeforeLongBreak",
            self.sessions_before_long_break,
            1,
        )?;
        Ok(())
    }

    /// Configured duration for `session_type` in seconds.
    ///
    /// Uses saturating arithmetic so oversized minute values cannot overflow.
    pub fn duration_secs(&self, session_type: SessionType) -> u32 {
        let minutes = match session_type {
            SessionType::Focus => self.work_duration,
            SessionType::ShortBreak => self.short_break,
            SessionType::LongBreak => self.long_break,
        };
        minutes.saturating_mul(60)
    }

    /// Whether a session of `session_type` should start by itself.
    pub fn auto_starts(&self, session_type: SessionType) -> bool {
        if session_type.is_break() {
            self.auto_start_breaks
        } else {
            self.auto_start_focus
        }
    }
}
