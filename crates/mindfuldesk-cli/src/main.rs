use clap::{Parser, Subcommand};
use mindfuldesk_core::Config;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "mindfuldesk", version, about = "MindfulDesk CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the live scheduler, reading commands from stdin
    Run,
    /// Distraction blocker settings
    Blocker {
        #[command(subcommand)]
        action: commands::blocker::BlockerAction,
    },
    /// Health reminder settings
    Reminder {
        #[command(subcommand)]
        action: commands::reminder::ReminderAction,
    },
    /// Focus session durations and behaviour
    Focus {
        #[command(subcommand)]
        action: commands::focus::FocusAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Session statistics
    Stats {
        #[command(subcommand)]
        action: commands::stats::StatsAction,
    },
}

fn init_tracing(config: Option<&Config>) {
    let fallback = config
        .map(|c| c.logging.level.clone())
        .unwrap_or_else(|| "info".to_string());
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&fallback))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();

    // `config` commands must work even when the file is unreadable.
    let config = Config::load();
    init_tracing(config.as_ref().ok());

    let result = match (cli.command, config) {
        (Commands::Config { action }, _) => commands::config::run(action),
        (_, Err(e)) => Err(e.into()),
        (Commands::Run, Ok(config)) => commands::run::run(&config),
        (Commands::Blocker { action }, Ok(config)) => commands::blocker::run(action, &config),
        (Commands::Reminder { action }, Ok(config)) => commands::reminder::run(action, &config),
        (Commands::Focus { action }, Ok(config)) => commands::focus::run(action, &config),
        (Commands::Stats { action }, Ok(config)) => commands::stats::run(action, &config),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
