//! Command-line argument definitions.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

/// Personal work timer.
///
/// Starts and stops a single task timer, keeps every session in a local
/// ledger and reports daily and weekly totals against a weekly limit.
#[derive(Debug, Parser)]
#[command(name = "wt", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start tracking a task, switching away from any other active task.
    Start {
        /// Task prefix (e.g. PROJ-123).
        prefix: String,
    },

    /// Stop the active task.
    Stop {
        /// Only stop if this prefix is the one being tracked.
        prefix: Option<String>,
    },

    /// Show the active task and today/week totals.
    Status,

    /// Show totals for a date range (defaults to the current week).
    Stats {
        /// First day of the range (YYYY-MM-DD).
        #[arg(long)]
        start: Option<NaiveDate>,

        /// Last day of the range, inclusive (YYYY-MM-DD).
        #[arg(long)]
        end: Option<NaiveDate>,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// List completed sessions, most recent first.
    Log {
        /// Maximum number of sessions to show.
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },

    /// Read or write ledger settings.
    #[command(subcommand)]
    Config(ConfigAction),
}

/// Settings actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Print a setting.
    Get {
        key: String,

        /// Value printed when the setting is absent.
        #[arg(long, default_value = "")]
        default: String,
    },

    /// Store a setting.
    Set { key: String, value: String },

    /// Print every stored setting.
    List,
}
