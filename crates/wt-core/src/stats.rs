//! Aggregations over completed entries.

use std::collections::{BTreeMap, HashMap};

use chrono::{NaiveDate, TimeZone};
use serde::Serialize;

use crate::entry::Entry;
use crate::period::{days_inclusive, local_date};

/// Summed time for one calendar day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyTotal {
    pub day: NaiveDate,
    pub total_seconds: f64,
    pub entry_count: usize,
}

/// Summed time for one task prefix.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskTotal {
    pub prefix: String,
    pub total_seconds: f64,
    pub entry_count: usize,
}

/// Result of a date-range statistics query.
///
/// `daily` holds only days with activity, oldest first. `entries` holds the
/// completed entries that started inside the range, most recent first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RangeStats {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub daily: Vec<DailyTotal>,
    pub entries: Vec<Entry>,
}

impl RangeStats {
    /// Buckets `entries` by their start day in `tz`.
    ///
    /// Active entries are ignored; they carry no duration yet.
    pub fn from_entries<Tz: TimeZone>(
        start_date: NaiveDate,
        end_date: NaiveDate,
        entries: Vec<Entry>,
        tz: &Tz,
    ) -> Self {
        let entries: Vec<Entry> = entries.into_iter().filter(|e| !e.is_active()).collect();

        let mut days: BTreeMap<NaiveDate, (f64, usize)> = BTreeMap::new();
        for entry in &entries {
            let bucket = days.entry(local_date(entry.start_time, tz)).or_default();
            bucket.0 += entry.duration_seconds.unwrap_or_default();
            bucket.1 += 1;
        }
        let daily = days
            .into_iter()
            .map(|(day, (total_seconds, entry_count))| DailyTotal {
                day,
                total_seconds,
                entry_count,
            })
            .collect();

        Self {
            start_date,
            end_date,
            daily,
            entries,
        }
    }

    pub fn total_seconds(&self) -> f64 {
        self.daily.iter().map(|d| d.total_seconds).sum()
    }

    /// Number of days with at least one entry.
    pub fn days_worked(&self) -> usize {
        self.daily.len()
    }

    /// Average over days worked, not over calendar days.
    #[expect(clippy::cast_precision_loss, reason = "day counts are small")]
    pub fn daily_average(&self) -> f64 {
        if self.daily.is_empty() {
            0.0
        } else {
            self.total_seconds() / self.daily.len() as f64
        }
    }

    /// One row per calendar day in the range, zero-filled where idle.
    pub fn filled_days(&self) -> Vec<DailyTotal> {
        let known: HashMap<NaiveDate, &DailyTotal> =
            self.daily.iter().map(|d| (d.day, d)).collect();
        days_inclusive(self.start_date, self.end_date)
            .into_iter()
            .map(|day| {
                known.get(&day).map_or(
                    DailyTotal {
                        day,
                        total_seconds: 0.0,
                        entry_count: 0,
                    },
                    |d| (*d).clone(),
                )
            })
            .collect()
    }

    /// Per-prefix totals, largest first, ties broken by prefix.
    pub fn task_totals(&self) -> Vec<TaskTotal> {
        let mut by_prefix: HashMap<&str, (f64, usize)> = HashMap::new();
        for entry in &self.entries {
            let bucket = by_prefix.entry(entry.prefix.as_str()).or_default();
            bucket.0 += entry.duration_seconds.unwrap_or_default();
            bucket.1 += 1;
        }
        let mut totals: Vec<TaskTotal> = by_prefix
            .into_iter()
            .map(|(prefix, (total_seconds, entry_count))| TaskTotal {
                prefix: prefix.to_string(),
                total_seconds,
                entry_count,
            })
            .collect();
        totals.sort_by(|a, b| {
            b.total_seconds
                .total_cmp(&a.total_seconds)
                .then_with(|| a.prefix.cmp(&b.prefix))
        });
        totals
    }
}
