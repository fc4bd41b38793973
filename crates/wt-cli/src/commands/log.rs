//! Log command: completed sessions, most recent first.

use std::io::Write;

use anyhow::Result;
use chrono::{Local, TimeZone};
use wt_core::{Ledger, format_hms};

use super::util::format_local;

pub fn run<W: Write, L: Ledger>(writer: &mut W, ledger: &L, limit: usize) -> Result<()> {
    run_in(writer, ledger, limit, &Local)
}

pub fn run_in<W: Write, L: Ledger, Tz: TimeZone>(
    writer: &mut W,
    ledger: &L,
    limit: usize,
    tz: &Tz,
) -> Result<()>
where
    Tz::Offset: std::fmt::Display,
{
    let entries = ledger.completed_entries()?;
    if entries.is_empty() {
        writeln!(writer, "No completed sessions.")?;
        return Ok(());
    }

    let shown = &entries[..limit.min(entries.len())];
    let width = shown.iter().map(|e| e.prefix.len()).max().unwrap_or(0);
    for entry in shown {
        let end = entry
            .end_time
            .map_or_else(String::new, |end| format_local(end, tz));
        writeln!(
            writer,
            "#{}  {:<width$}  {} -> {}  {}",
            entry.id,
            entry.prefix,
            format_local(entry.start_time, tz),
            end,
            format_hms(entry.duration_seconds.unwrap_or(0.0))
        )?;
    }
    if entries.len() > shown.len() {
        writeln!(writer, "... {} older sessions", entries.len() - shown.len())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{DateTime, Duration, Utc};
    use insta::assert_snapshot;
    use wt_db::Database;

    fn at(h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 4, h, min, 0).unwrap()
    }

    fn seeded() -> Database {
        let mut db = Database::open_in_memory().unwrap();
        for (prefix, start, minutes) in [
            ("PROJ-1", at(9, 0), 45),
            ("REVIEW", at(10, 0), 20),
            ("PROJ-12", at(11, 0), 5),
        ] {
            let entry = db.start_entry_at(prefix, start).unwrap().into_entry();
            db.stop_entry_at(entry.id, start + Duration::minutes(minutes))
                .unwrap();
        }
        db
    }

    fn render(db: &Database, limit: usize) -> String {
        let mut buf = Vec::new();
        run_in(&mut buf, db, limit, &Utc).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_log_empty() {
        let db = Database::open_in_memory().unwrap();
        assert_snapshot!(render(&db, 20), @"No completed sessions.");
    }

    #[test]
    fn test_log_lists_most_recent_first() {
        assert_snapshot!(render(&seeded(), 20), @r"
        #3  PROJ-12  2025-03-04 11:00 -> 2025-03-04 11:05  00:05:00
        #2  REVIEW   2025-03-04 10:00 -> 2025-03-04 10:20  00:20:00
        #1  PROJ-1   2025-03-04 09:00 -> 2025-03-04 09:45  00:45:00
        ");
    }

    #[test]
    fn test_log_limit_reports_remainder() {
        let output = render(&seeded(), 1);
        assert_eq!(output.lines().count(), 2);
        assert!(output.ends_with("... 2 older sessions\n"), "{output}");
    }
}
