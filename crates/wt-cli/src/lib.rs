//! Work timer CLI library.
//!
//! This crate provides the CLI interface for the work timer.

mod cli;
pub mod commands;
mod config;

pub use cli::{Cli, Commands, ConfigAction};
pub use config::{Config, DEFAULT_WEEKLY_LIMIT_HOURS};
