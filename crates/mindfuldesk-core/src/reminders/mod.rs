mod scheduler;
mod settings;

pub use scheduler::{ReminderCountdown, ReminderScheduler};
pub use settings::{HealthReminder, ReminderEdit, ReminderSettings, ReminderType};
