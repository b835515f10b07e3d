use clap::Subcommand;
use mindfuldesk_core::Config;

use super::{open_engine, print_committed, print_json, CliResult};

#[derive(Subcommand)]
pub enum FocusAction {
    /// Show focus settings
    Show,
    /// Update focus settings; omitted values are kept
    Set {
        /// Focus length in minutes
        #[arg(long)]
        work: Option<u32>,
        /// Short break in minutes
        #[arg(long)]
        short_break: Option<u32>,
        /// Long break in minutes
        #[arg(long)]
        long_break: Option<u32>,
        /// Focus sessions before a long break
        #[arg(long)]
        sessions_before_long_break: Option<u32>,
        #[arg(long)]
        auto_start_breaks: Option<bool>,
        #[arg(long)]
        auto_start_focus: Option<bool>,
        #[arg(long)]
        notifications: Option<bool>,
        #[arg(long)]
        sound: Option<bool>,
    },
}

pub fn run(action: FocusAction, config: &Config) -> CliResult {
    let mut engine = open_engine(config)?;
    match action {
        FocusAction::Show => print_json(engine.focus_settings())?,
        FocusAction::Set {
            work,
            short_break,
            long_break,
            sessions_before_long_break,
            auto_start_breaks,
            auto_start_focus,
            notifications,
            sound,
        } => {
            let mut settings = engine.focus_settings().clone();
            settings.work_duration = work.unwrap_or(settings.work_duration);
            settings.short_break = short_break.unwrap_or(settings.short_break);
            settings.long_break = long_break.unwrap_or(settings.long_break);
            settings.sessions_before_long_break =
                sessions_before_long_break.unwrap_or(settings.sessions_before_long_break);
            settings.auto_start_breaks = auto_start_breaks.unwrap_or(settings.auto_start_breaks);
            settings.auto_start_focus = auto_start_focus.unwrap_or(settings.auto_start_focus);
            settings.notifications_enabled =
                notifications.unwrap_or(settings.notifications_enabled);
            settings.sound_enabled = sound.unwrap_or(settings.sound_enabled);
            print_committed(&engine.save_focus_settings(settings)?)?
        }
    }
    Ok(())
}
