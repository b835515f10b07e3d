use clap::Subcommand;
use mindfuldesk_core::blocker::popular_distractions;
use mindfuldesk_core::{BlockItemType, BlockMode, Config};

use super::{open_engine, print_committed, print_json, CliResult};

#[derive(Subcommand)]
pub enum BlockerAction {
    /// Show blocker settings
    Show,
    /// Turn blocking on
    Enable,
    /// Turn blocking off (ends any override window)
    Disable,
    /// Set the block mode
    Mode {
        /// "warn" or "block"
        mode: BlockMode,
    },
    /// Add a blocked website or application
    Add {
        /// Display name
        name: String,
        /// Substring matched against URLs (e.g. "youtube.com")
        pattern: String,
        /// "website" or "application"
        #[arg(long = "type", default_value = "website")]
        item_type: BlockItemType,
    },
    /// Add one of the popular distraction sites
    AddPopular {
        /// e.g. "reddit.com"
        pattern: String,
    },
    /// Remove a blocked item
    Remove { id: String },
    /// Toggle whether a blocked item is active
    Toggle { id: String },
    /// Configure override permission and ceiling
    Override {
        /// Allow overrides ("true" or "false")
        #[arg(action = clap::ArgAction::Set)]
        allow: bool,
        /// Maximum override length in seconds; kept when omitted
        #[arg(long)]
        timeout: Option<u32>,
    },
    /// List popular distraction sites
    Popular,
    /// Check whether a URL would be blocked
    Check { url: String },
}

pub fn run(action: BlockerAction, config: &Config) -> CliResult {
    match action {
        BlockerAction::Popular => print_json(&popular_distractions())?,
        BlockerAction::Show => print_json(open_engine(config)?.blocker_settings())?,
        BlockerAction::Enable => {
            print_committed(&open_engine(config)?.set_blocker_enabled(true))?
        }
        BlockerAction::Disable => {
            print_committed(&open_engine(config)?.set_blocker_enabled(false))?
        }
        BlockerAction::Mode { mode } => {
            print_committed(&open_engine(config)?.set_block_mode(mode))?
        }
        BlockerAction::Add {
            name,
            pattern,
            item_type,
        } => {
            let mut engine = open_engine(config)?;
            print_committed(&engine.add_blocked_item(&name, &pattern, item_type)?)?
        }
        BlockerAction::AddPopular { pattern } => {
            print_committed(&open_engine(config)?.add_popular_site(&pattern)?)?
        }
        BlockerAction::Remove { id } => {
            print_committed(&open_engine(config)?.remove_blocked_item(&id)?)?
        }
        BlockerAction::Toggle { id } => {
            print_committed(&open_engine(config)?.toggle_blocked_item(&id)?)?
        }
        BlockerAction::Override { allow, timeout } => {
            let mut engine = open_engine(config)?;
            let timeout = timeout.unwrap_or(engine.blocker_settings().override_timeout);
            print_committed(&engine.set_override_policy(allow, timeout)?)?
        }
        BlockerAction::Check { url } => {
            let blocked = open_engine(config)?.is_url_blocked(&url);
            println!("{}", if blocked { "blocked" } else { "allowed" })
        }
    }
    Ok(())
}
