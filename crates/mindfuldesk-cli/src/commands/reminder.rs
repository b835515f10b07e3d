use clap::Subcommand;
use mindfuldesk_core::{Config, ReminderEdit};

use super::{open_engine, print_committed, print_json, CliResult};

#[derive(Subcommand)]
pub enum ReminderAction {
    /// List reminders
    List,
    /// Turn all reminders on (countdowns restart from their full interval)
    Enable,
    /// Turn all reminders off
    Disable,
    /// Only count down while a focus session is running
    OnlyDuringFocus {
        #[arg(action = clap::ArgAction::Set)]
        value: bool,
    },
    /// Toggle a single reminder
    Toggle { id: String },
    /// Change a reminder's interval or message
    Edit {
        id: String,
        /// New interval in minutes
        #[arg(long)]
        interval: Option<u32>,
        /// New message
        #[arg(long)]
        message: Option<String>,
    },
    /// Add a custom reminder
    Add {
        /// Interval in minutes
        interval: u32,
        message: String,
    },
    /// Delete a custom reminder
    Delete { id: String },
}

pub fn run(action: ReminderAction, config: &Config) -> CliResult {
    let mut engine = open_engine(config)?;
    match action {
        ReminderAction::List => print_json(engine.reminder_settings())?,
        ReminderAction::Enable => print_committed(&engine.set_reminders_enabled(true))?,
        ReminderAction::Disable => print_committed(&engine.set_reminders_enabled(false))?,
        ReminderAction::OnlyDuringFocus { value } => {
            print_committed(&engine.set_only_during_focus(value))?
        }
        ReminderAction::Toggle { id } => print_committed(&engine.toggle_reminder(&id)?)?,
        ReminderAction::Edit {
            id,
            interval,
            message,
        } => {
            let edit = ReminderEdit {
                interval_minutes: interval,
                message,
            };
            print_committed(&engine.edit_reminder(&id, edit)?)?
        }
        ReminderAction::Add { interval, message } => {
            print_committed(&engine.add_custom_reminder(interval, &message)?)?
        }
        ReminderAction::Delete { id } => print_committed(&engine.delete_reminder(&id)?)?,
    }
    Ok(())
}
