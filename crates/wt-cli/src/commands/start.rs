//! Start command: begin tracking a task.

use std::io::Write;

use anyhow::Result;
use chrono::{DateTime, Utc};
use wt_core::{Ledger, TimerController};

use super::util::write_report;

pub fn run<W: Write, L: Ledger>(
    writer: &mut W,
    timer: &mut TimerController<L>,
    prefix: &str,
) -> Result<()> {
    run_at(writer, timer, prefix, Utc::now())
}

/// Starts `prefix` at `now`, switching away from any other active task.
pub fn run_at<W: Write, L: Ledger>(
    writer: &mut W,
    timer: &mut TimerController<L>,
    prefix: &str,
    now: DateTime<Utc>,
) -> Result<()> {
    let report = timer.start_at(prefix, now)?;

    if report.is_noop() {
        if let Some(active) = timer.state().active() {
            writeln!(writer, "Already tracking {}", active.prefix)?;
        }
        return Ok(());
    }

    write_report(writer, &report)?;
    Ok(())
}
