//! Stop command: end the active session.

use std::io::Write;

use anyhow::Result;
use chrono::{DateTime, Utc};
use wt_core::{Ledger, TimerController};

use super::util::write_report;

pub fn run<W: Write, L: Ledger>(
    writer: &mut W,
    timer: &mut TimerController<L>,
    prefix: Option<&str>,
) -> Result<()> {
    run_at(writer, timer, prefix, Utc::now())
}

/// Stops the active session. With a prefix, only stops when it matches.
pub fn run_at<W: Write, L: Ledger>(
    writer: &mut W,
    timer: &mut TimerController<L>,
    prefix: Option<&str>,
    now: DateTime<Utc>,
) -> Result<()> {
    let report = match prefix {
        Some(prefix) => timer.stop_at(prefix, now)?,
        None => timer.stop_active_at(now)?,
    };

    if report.is_noop() {
        match (timer.state().active(), prefix) {
            (Some(active), Some(prefix)) => writeln!(
                writer,
                "Not tracking {}; active task is {}",
                prefix.trim(),
                active.prefix
            )?,
            _ => writeln!(writer, "No active session.")?,
        }
        return Ok(());
    }

    write_report(writer, &report)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::TimeZone;
    use insta::assert_snapshot;
    use wt_db::Database;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 4, 9, 0, 0).unwrap()
    }

    fn tracking(prefix: &str) -> TimerController<Database> {
        let mut timer = TimerController::new(Database::open_in_memory().unwrap()).unwrap();
        timer.start_at(prefix, t0()).unwrap();
        timer
    }

    fn output(buf: Vec<u8>) -> String {
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn stop_matching_prefix() {
        let mut timer = tracking("TASK-1");
        let mut buf = Vec::new();

        run_at(&mut buf, &mut timer, Some("TASK-1"), t0() + chrono::Duration::seconds(125))
            .unwrap();

        assert_snapshot!(output(buf), @"Stopped TASK-1 after 00:02:05");
        assert!(!timer.state().is_tracking());
    }

    #[test]
    fn stop_without_prefix_stops_active() {
        let mut timer = tracking("TASK-1");
        let mut buf = Vec::new();

        run_at(&mut buf, &mut timer, None, t0() + chrono::Duration::hours(2)).unwrap();

        assert_snapshot!(output(buf), @"Stopped TASK-1 after 02:00:00");
    }

    #[test]
    fn stop_other_prefix_is_a_guard_noop() {
        let mut timer = tracking("TASK-1");
        let mut buf = Vec::new();

        run_at(&mut buf, &mut timer, Some("TASK-2"), t0() + chrono::Duration::minutes(1))
            .unwrap();

        assert_snapshot!(output(buf), @"Not tracking TASK-2; active task is TASK-1");
        assert!(timer.state().is_tracking());
        assert!(timer.ledger().completed_entries().unwrap().is_empty());
    }

    #[test]
    fn stop_while_idle_is_a_guard_noop() {
        let mut timer = TimerController::new(Database::open_in_memory().unwrap()).unwrap();
        let mut buf = Vec::new();

        run_at(&mut buf, &mut timer, Some("TASK-1"), t0()).unwrap();

        assert_snapshot!(output(buf), @"No active session.");
    }
}
