use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use wt_cli::commands::{log, settings, start, stats, status, stop};
use wt_cli::{Cli, Commands, Config, ConfigAction};
use wt_core::TimerController;
use wt_db::Database;

/// Load config and open database, ensuring the parent directory exists.
fn open_database(config_path: Option<&Path>) -> Result<(Database, Config)> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }

    let db = Database::open(&config.database_path).with_context(|| {
        format!("failed to open {}", config.database_path.display())
    })?;
    Ok((db, config))
}

/// Controller over `db` with every enabled tracker registered.
fn timer_with_trackers(mut db: Database) -> Result<TimerController<Database>> {
    let trackers = wt_trackers::build_trackers(&mut db).context("failed to set up trackers")?;
    TimerController::with_trackers(db, trackers).context("failed to recover timer state")
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match &cli.command {
        Some(Commands::Start { prefix }) => {
            let (db, _config) = open_database(cli.config.as_deref())?;
            let mut timer = timer_with_trackers(db)?;
            start::run(&mut out, &mut timer, prefix)?;
        }
        Some(Commands::Stop { prefix }) => {
            let (db, _config) = open_database(cli.config.as_deref())?;
            let mut timer = timer_with_trackers(db)?;
            stop::run(&mut out, &mut timer, prefix.as_deref())?;
        }
        Some(Commands::Status) => {
            let (db, config) = open_database(cli.config.as_deref())?;
            let timer = TimerController::new(db).context("failed to recover timer state")?;
            status::run(&mut out, &timer, config.default_weekly_limit_hours)?;
        }
        Some(Commands::Stats { start, end, json }) => {
            let (db, _config) = open_database(cli.config.as_deref())?;
            stats::run(&mut out, &db, *start, *end, *json)?;
        }
        Some(Commands::Log { limit }) => {
            let (db, _config) = open_database(cli.config.as_deref())?;
            log::run(&mut out, &db, *limit)?;
        }
        Some(Commands::Config(action)) => {
            let (mut db, _config) = open_database(cli.config.as_deref())?;
            match action {
                ConfigAction::Get { key, default } => settings::get(&mut out, &db, key, default)?,
                ConfigAction::Set { key, value } => settings::set(&mut out, &mut db, key, value)?,
                ConfigAction::List => settings::list(&mut out, &db)?,
            }
        }
        None => {
            // No subcommand, show help
            use clap::CommandFactory;
            Cli::command().print_help()?;
            writeln!(out)?;
        }
    }

    out.flush()?;
    Ok(())
}
