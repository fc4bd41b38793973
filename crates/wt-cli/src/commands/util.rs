//! Shared utilities for CLI commands.

use std::io::Write;

use chrono::{DateTime, TimeZone, Utc};
use wt_core::{Transition, TransitionReport, format_hms};

/// Prints what a start/stop did: transitions, tracker notes and failures.
pub fn write_report<W: Write>(writer: &mut W, report: &TransitionReport) -> std::io::Result<()> {
    for transition in &report.transitions {
        match transition {
            Transition::Stopped(event) => writeln!(
                writer,
                "Stopped {} after {}",
                event.prefix,
                format_hms(event.duration_seconds)
            )?,
            Transition::Started(session) => writeln!(writer, "Started {}", session.prefix)?,
            Transition::Adopted(session) => writeln!(
                writer,
                "Already tracking {} (started elsewhere)",
                session.prefix
            )?,
        }
    }
    for note in &report.notes {
        writeln!(writer, "note ({}): {}", note.tracker, note.note)?;
    }
    for failure in &report.failures {
        writeln!(writer, "warning: {} failed: {}", failure.tracker, failure.error)?;
    }
    Ok(())
}

/// Formats a UTC timestamp as `YYYY-MM-DD HH:MM` in `tz`.
pub fn format_local<Tz: TimeZone>(timestamp: DateTime<Utc>, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    timestamp.with_timezone(tz).format("%Y-%m-%d %H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    use wt_core::{ActiveSession, StopEvent, TrackerError, TrackerFailure, TrackerNote};

    #[test]
    fn report_lists_transitions_notes_and_failures() {
        let t0 = Utc.with_ymd_and_hms(2025, 3, 4, 9, 0, 0).unwrap();
        let report = TransitionReport {
            transitions: vec![
                Transition::Stopped(StopEvent {
                    entry_id: 1,
                    prefix: "PROJ-1".to_string(),
                    duration_seconds: 125.0,
                    start_time: t0,
                    end_time: t0 + chrono::Duration::seconds(125),
                }),
                Transition::Started(ActiveSession {
                    entry_id: 2,
                    prefix: "PROJ-2".to_string(),
                    start_time: t0 + chrono::Duration::seconds(125),
                }),
            ],
            failures: vec![TrackerFailure {
                tracker: "webhook".to_string(),
                error: TrackerError::message("connection refused"),
            }],
            notes: vec![TrackerNote {
                tracker: "pattern".to_string(),
                note: "looks fine".to_string(),
            }],
        };

        let mut output = Vec::new();
        write_report(&mut output, &report).unwrap();

        insta::assert_snapshot!(String::from_utf8(output).unwrap(), @r"
        Stopped PROJ-1 after 00:02:05
        Started PROJ-2
        note (pattern): looks fine
        warning: webhook failed: connection refused
        ");
    }

    #[test]
    fn report_shows_adopted_session() {
        let report = TransitionReport {
            transitions: vec![Transition::Adopted(ActiveSession {
                entry_id: 4,
                prefix: "OPS-3".to_string(),
                start_time: Utc.with_ymd_and_hms(2025, 3, 4, 9, 0, 0).unwrap(),
            })],
            ..TransitionReport::default()
        };

        let mut output = Vec::new();
        write_report(&mut output, &report).unwrap();

        insta::assert_snapshot!(
            String::from_utf8(output).unwrap(),
            @"Already tracking OPS-3 (started elsewhere)"
        );
    }

    #[test]
    fn format_local_uses_time_zone() {
        let ts = Utc.with_ymd_and_hms(2025, 3, 4, 23, 30, 0).unwrap();
        let east = chrono::FixedOffset::east_opt(2 * 3600).unwrap();
        assert_eq!(format_local(ts, &Utc), "2025-03-04 23:30");
        assert_eq!(format_local(ts, &east), "2025-03-05 01:30");
    }
}
