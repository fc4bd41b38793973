//! Stats command for date-range reports.
//!
//! This module implements `wt stats` with an optional `--start`/`--end`
//! range (defaulting to the current Monday–Sunday week) and output formats
//! (human-readable, JSON).

use std::io::Write;

use anyhow::{Result, bail};
use chrono::{Local, NaiveDate, TimeZone, Utc};
use serde::Serialize;
use wt_core::period::{end_of_week, local_date, start_of_week};
use wt_core::{DailyTotal, Entry, Ledger, RangeStats, TaskTotal, format_hms};

use super::util::format_local;

/// Report shape for `--json`.
#[derive(Debug, Serialize)]
struct JsonStats<'a> {
    start_date: NaiveDate,
    end_date: NaiveDate,
    total_seconds: f64,
    days_worked: usize,
    daily_average_seconds: f64,
    days: Vec<DailyTotal>,
    tasks: Vec<TaskTotal>,
    entries: &'a [Entry],
}

/// Resolves the requested range; missing bounds fall back to the week
/// containing `today`.
pub fn resolve_range(
    today: NaiveDate,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<(NaiveDate, NaiveDate)> {
    let start = match start {
        Some(start) => start,
        None => start_of_week(today)?,
    };
    let end = match end {
        Some(end) => end,
        None => end_of_week(start)?,
    };
    if end < start {
        bail!("end date {end} is before start date {start}");
    }
    Ok((start, end))
}

pub fn run<W: Write, L: Ledger>(
    writer: &mut W,
    ledger: &L,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    json: bool,
) -> Result<()> {
    let today = local_date(Utc::now(), &Local);
    let (start, end) = resolve_range(today, start, end)?;
    run_for_range(writer, ledger, start, end, json, &Local)
}

pub fn run_for_range<W: Write, L: Ledger, Tz: TimeZone>(
    writer: &mut W,
    ledger: &L,
    start: NaiveDate,
    end: NaiveDate,
    json: bool,
    tz: &Tz,
) -> Result<()>
where
    Tz::Offset: std::fmt::Display,
{
    let stats = ledger.stats_for_range(start, end, tz)?;
    if json {
        writeln!(writer, "{}", format_stats_json(&stats)?)?;
    } else {
        write_stats(writer, &stats, tz)?;
    }
    Ok(())
}

pub fn format_stats_json(stats: &RangeStats) -> Result<String> {
    let report = JsonStats {
        start_date: stats.start_date,
        end_date: stats.end_date,
        total_seconds: stats.total_seconds(),
        days_worked: stats.days_worked(),
        daily_average_seconds: stats.daily_average(),
        days: stats.filled_days(),
        tasks: stats.task_totals(),
        entries: &stats.entries,
    };
    Ok(serde_json::to_string_pretty(&report)?)
}

fn write_stats<W: Write, Tz: TimeZone>(
    writer: &mut W,
    stats: &RangeStats,
    tz: &Tz,
) -> std::io::Result<()>
where
    Tz::Offset: std::fmt::Display,
{
    writeln!(writer, "Stats {} to {}", stats.start_date, stats.end_date)?;

    if stats.entries.is_empty() {
        writeln!(writer)?;
        writeln!(writer, "No completed sessions in this range.")?;
        return Ok(());
    }

    writeln!(writer, "Total:         {}", format_hms(stats.total_seconds()))?;
    writeln!(writer, "Days worked:   {}", stats.days_worked())?;
    writeln!(writer, "Daily average: {}", format_hms(stats.daily_average()))?;

    writeln!(writer)?;
    writeln!(writer, "Days:")?;
    for day in stats.filled_days() {
        writeln!(
            writer,
            "  {}  {}  ({})",
            day.day.format("%a %Y-%m-%d"),
            format_hms(day.total_seconds),
            plural(day.entry_count, "session")
        )?;
    }

    let tasks = stats.task_totals();
    let width = tasks.iter().map(|t| t.prefix.len()).max().unwrap_or(0);
    writeln!(writer)?;
    writeln!(writer, "Tasks:")?;
    for task in &tasks {
        writeln!(
            writer,
            "  {:<width$}  {}  ({})",
            task.prefix,
            format_hms(task.total_seconds),
            plural(task.entry_count, "session")
        )?;
    }

    writeln!(writer)?;
    writeln!(writer, "Sessions:")?;
    for entry in &stats.entries {
        writeln!(
            writer,
            "  {}  {:<width$}  {}",
            format_local(entry.start_time, tz),
            entry.prefix,
            format_hms(entry.duration_seconds.unwrap_or(0.0))
        )?;
    }
    Ok(())
}

fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("1 {noun}")
    } else {
        format!("{count} {noun}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{DateTime, Duration};
    use insta::assert_snapshot;
    use wt_db::Database;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn at(d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, d, h, min, 0).unwrap()
    }

    fn seed(db: &mut Database, prefix: &str, start: DateTime<Utc>, minutes: i64) {
        let entry = db.start_entry_at(prefix, start).unwrap().into_entry();
        db.stop_entry_at(entry.id, start + Duration::minutes(minutes))
            .unwrap();
    }

    fn seeded() -> Database {
        let mut db = Database::open_in_memory().unwrap();
        seed(&mut db, "PROJ-1", at(3, 9, 0), 60);
        seed(&mut db, "REVIEW", at(3, 13, 0), 30);
        seed(&mut db, "PROJ-1", at(5, 10, 0), 90);
        db
    }

    fn render(db: &Database, json: bool) -> String {
        let mut buf = Vec::new();
        run_for_range(&mut buf, db, date(2025, 3, 3), date(2025, 3, 9), json, &Utc).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_resolve_range_defaults_to_current_week() {
        let (start, end) = resolve_range(date(2025, 3, 5), None, None).unwrap();
        assert_eq!(start, date(2025, 3, 3));
        assert_eq!(end, date(2025, 3, 9));
    }

    #[test]
    fn test_resolve_range_start_only_ends_that_week() {
        let (start, end) =
            resolve_range(date(2025, 3, 20), Some(date(2025, 3, 4)), None).unwrap();
        assert_eq!(start, date(2025, 3, 4));
        assert_eq!(end, date(2025, 3, 9));
    }

    #[test]
    fn test_resolve_range_at_end_of_calendar_is_an_error() {
        let err = resolve_range(date(2025, 3, 5), Some(NaiveDate::MAX), None).unwrap_err();
        assert_eq!(
            err.to_string(),
            format!("date {} is outside the supported calendar range", NaiveDate::MAX)
        );
        let explicit = resolve_range(date(2025, 3, 5), Some(NaiveDate::MAX), Some(NaiveDate::MAX));
        assert!(explicit.is_ok());
    }

    #[test]
    fn test_resolve_range_rejects_inverted() {
        let err = resolve_range(date(2025, 3, 5), Some(date(2025, 3, 9)), Some(date(2025, 3, 3)))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "end date 2025-03-03 is before start date 2025-03-09"
        );
    }

    #[test]
    fn test_stats_empty_range() {
        let db = Database::open_in_memory().unwrap();
        assert_snapshot!(render(&db, false), @r"
        Stats 2025-03-03 to 2025-03-09

        No completed sessions in this range.
        ");
    }

    #[test]
    fn test_stats_text_report() {
        let db = seeded();
        assert_snapshot!(render(&db, false), @r"
        Stats 2025-03-03 to 2025-03-09
        Total:         03:00:00
        Days worked:   2
        Daily average: 01:30:00

        Days:
          Mon 2025-03-03  01:30:00  (2 sessions)
          Tue 2025-03-04  00:00:00  (0 sessions)
          Wed 2025-03-05  01:30:00  (1 session)
          Thu 2025-03-06  00:00:00  (0 sessions)
          Fri 2025-03-07  00:00:00  (0 sessions)
          Sat 2025-03-08  00:00:00  (0 sessions)
          Sun 2025-03-09  00:00:00  (0 sessions)

        Tasks:
          PROJ-1  02:30:00  (2 sessions)
          REVIEW  00:30:00  (1 session)

        Sessions:
          2025-03-05 10:00  PROJ-1  01:30:00
          2025-03-03 13:00  REVIEW  00:30:00
          2025-03-03 09:00  PROJ-1  01:00:00
        ");
    }

    #[test]
    fn test_stats_json_report() {
        let db = seeded();
        let value: serde_json::Value = serde_json::from_str(&render(&db, true)).unwrap();

        assert_eq!(value["start_date"], "2025-03-03");
        assert_eq!(value["end_date"], "2025-03-09");
        assert_eq!(value["total_seconds"], 10800.0);
        assert_eq!(value["days_worked"], 2);
        assert_eq!(value["daily_average_seconds"], 5400.0);
        assert_eq!(value["days"].as_array().unwrap().len(), 7);
        assert_eq!(value["days"][0]["total_seconds"], 5400.0);
        assert_eq!(value["days"][0]["entry_count"], 2);
        assert_eq!(value["tasks"][0]["prefix"], "PROJ-1");
        assert_eq!(value["entries"].as_array().unwrap().len(), 3);
        assert_eq!(value["entries"][0]["duration_seconds"], 5400.0);
    }

    #[test]
    fn test_stats_excludes_active_session() {
        let mut db = seeded();
        db.start_entry_at("LIVE", at(6, 8, 0)).unwrap();

        let output = render(&db, false);
        assert!(!output.contains("LIVE"), "{output}");
    }
}
