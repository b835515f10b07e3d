use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReminderType {
    Hydration,
    Stretching,
    EyeRest,
    Posture,
    Custom,
}

impl ReminderType {
    /// Built-in reminders are seeded once and can only be toggled or edited.
    pub fn is_builtin(self) -> bool {
        !matches!(self, ReminderType::Custom)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReminder {
    pub id: String,
    pub reminder_type: ReminderType,
    pub interval_minutes: u32,
    pub message: String,
    pub enabled: bool,
    #[serde(default)]
    pub last_triggered: Option<DateTime<Utc>>,
}

impl HealthReminder {
    fn seeded(reminder_type: ReminderType, interval_minutes: u32, message: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            reminder_type,
            interval_minutes,
            message: message.to_string(),
            enabled: true,
            last_triggered: None,
        }
    }

    pub fn custom(interval_minutes: u32, message: &str) -> Result<Self> {
        ValidationError::check_min("intervalMinutes", interval_minutes, 1)?;
        ValidationError::check_not_empty("message", message)?;
        Ok(Self::seeded(ReminderType::Custom, interval_minutes, message.trim()))
    }

    pub fn period_secs(&self) -> u64 {
        u64::from(self.interval_minutes) * 60
    }
}

/// Partial update for a reminder; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderEdit {
    pub interval_minutes: Option<u32>,
    pub message: Option<String>,
}

impl ReminderEdit {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(interval) = self.interval_minutes {
            ValidationError::check_min("intervalMinutes", interval, 1)?;
        }
        if let Some(message) = &self.message {
            ValidationError::check_not_empty("message", message)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderSettings {
    pub reminders: Vec<HealthReminder>,
    /// Master switch.
    pub enabled: bool,
    /// Only count down while a Focus session is running.
    pub only_during_focus: bool,
}

impl Default for ReminderSettings {
    fn default() -> Self {
        Self {
            reminders: vec![
                HealthReminder::seeded(
                    ReminderType::Hydration,
                    30,
                    "💧 Time to hydrate! Drink some water.",
                ),
                HealthReminder::seeded(
                    ReminderType::Stretching,
                    60,
                    "🧘 Take a moment to stretch your body!",
                ),
                HealthReminder::seeded(
                    ReminderType::EyeRest,
                    20,
                    "👁️ Follow the 20-20-20 rule: Look 20 feet away for 20 seconds.",
                ),
                HealthReminder::seeded(
                    ReminderType::Posture,
                    45,
                    "🪑 Check your posture! Sit up straight.",
                ),
            ],
            enabled: true,
            only_during_focus: false,
        }
    }
}

impl ReminderSettings {
    pub fn reminder(&self, id: &str) -> Option<&HealthReminder> {
        self.reminders.iter().find(|r| r.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeds_four_builtins() {
        let s = ReminderSettings::default();
        assert!(s.enabled);
        assert!(!s.only_during_focus);
        let intervals: Vec<_> = s.reminders.iter().map(|r| r.interval_minutes).collect();
        assert_eq!(intervals, vec![30, 60, 20, 45]);
        assert!(s.reminders.iter().all(|r| r.reminder_type.is_builtin() && r.enabled));
    }

    #[test]
    fn custom_reminder_validation() {
        assert!(HealthReminder::custom(0, "Walk").is_err());
        assert!(HealthReminder::custom(10, "").is_err());
        let r = HealthReminder::custom(10, "  Walk around  ").unwrap();
        assert_eq!(r.message, "Walk around");
        assert_eq!(r.period_secs(), 600);
    }

    #[test]
    fn edit_validation() {
        let bad = ReminderEdit {
            interval_minutes: Some(0),
            message: None,
        };
        assert!(bad.validate().is_err());
        assert!(ReminderEdit::default().validate().is_ok());
    }
}
