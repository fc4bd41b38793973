//! Status command: active task and live totals against the weekly limit.

use std::io::Write;

use anyhow::Result;
use chrono::{DateTime, Local, TimeZone, Utc};
use wt_core::{Ledger, Summary, TimerController, format_hms};

pub fn run<W: Write, L: Ledger>(
    writer: &mut W,
    timer: &TimerController<L>,
    default_limit_hours: f64,
) -> Result<()> {
    run_at(writer, timer, default_limit_hours, Utc::now(), &Local)
}

pub fn run_at<W: Write, L: Ledger, Tz: TimeZone>(
    writer: &mut W,
    timer: &TimerController<L>,
    default_limit_hours: f64,
    now: DateTime<Utc>,
    tz: &Tz,
) -> Result<()> {
    let limit_hours = timer.weekly_limit_hours(default_limit_hours)?;
    let summary = timer.summary_at(limit_hours, now, tz)?;
    write_summary(writer, &summary)?;
    Ok(())
}

fn write_summary<W: Write>(writer: &mut W, summary: &Summary) -> std::io::Result<()> {
    match (&summary.active, summary.elapsed_seconds) {
        (Some(active), Some(elapsed)) => writeln!(
            writer,
            "Tracking:  {} ({})",
            active.prefix,
            format_hms(elapsed)
        )?,
        _ => writeln!(writer, "Idle")?,
    }
    writeln!(writer, "Today:     {}", format_hms(summary.today_seconds))?;
    writeln!(writer, "This week: {}", format_hms(summary.week_seconds))?;
    writeln!(writer, "Limit:     {}", format_hms(summary.weekly_limit_seconds))?;
    writeln!(writer, "Remaining: {}", format_hms(summary.remaining_seconds))?;
    if summary.limit_reached() {
        writeln!(writer, "Weekly limit reached.")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use insta::assert_snapshot;
    use wt_core::WEEKLY_LIMIT_KEY;
    use wt_db::Database;

    // Wednesday.
    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 5, 15, 0, 0).unwrap()
    }

    fn render(timer: &TimerController<Database>) -> String {
        let mut buf = Vec::new();
        run_at(&mut buf, timer, 40.0, now(), &Utc).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn idle_with_empty_ledger() {
        let timer = TimerController::new(Database::open_in_memory().unwrap()).unwrap();
        assert_snapshot!(render(&timer), @r"
        Idle
        Today:     00:00:00
        This week: 00:00:00
        Limit:     40:00:00
        Remaining: 40:00:00
        ");
    }

    #[test]
    fn live_session_over_limit_goes_negative() {
        let mut db = Database::open_in_memory().unwrap();
        // 39.5h logged earlier this week, in one long Monday entry.
        let monday = Utc.with_ymd_and_hms(2025, 3, 3, 0, 0, 0).unwrap();
        let entry = db.start_entry_at("PROJ-1", monday).unwrap().into_entry();
        db.stop_entry_at(entry.id, monday + chrono::Duration::minutes(39 * 60 + 30))
            .unwrap();
        db.start_entry_at("PROJ-2", now() - chrono::Duration::minutes(45))
            .unwrap();

        let timer = TimerController::new(db).unwrap();

        assert_snapshot!(render(&timer), @r"
        Tracking:  PROJ-2 (00:45:00)
        Today:     00:45:00
        This week: 40:15:00
        Limit:     40:00:00
        Remaining: -00:15:00
        Weekly limit reached.
        ");
    }

    #[test]
    fn limit_setting_overrides_default() {
        let mut db = Database::open_in_memory().unwrap();
        db.set_setting(WEEKLY_LIMIT_KEY, "32").unwrap();
        let timer = TimerController::new(db).unwrap();

        let output = render(&timer);
        assert!(output.contains("Limit:     32:00:00"), "{output}");
    }
}
