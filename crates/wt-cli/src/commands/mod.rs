//! CLI subcommand implementations.

pub mod log;
pub mod settings;
pub mod start;
pub mod stats;
pub mod status;
pub mod stop;
mod util;
