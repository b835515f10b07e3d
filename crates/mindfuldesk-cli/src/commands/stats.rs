use clap::Subcommand;
use mindfuldesk_core::{Config, Database};

use super::{database_path, print_json, CliResult};

#[derive(Subcommand)]
pub enum StatsAction {
    /// Today's statistics
    Today,
    /// All-time statistics
    All,
}

pub fn run(action: StatsAction, config: &Config) -> CliResult {
    let db = Database::open(&database_path(config)?)?;
    let stats = match action {
        StatsAction::Today => db.stats_today()?,
        StatsAction::All => db.stats_all()?,
    };
    print_json(&stats)
}
