//! The storage seam between the timer and its durable ledger.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use thiserror::Error;

use crate::entry::{Entry, StartedEntry, SwitchedEntry};
use crate::period::{DateOutOfRange, range_bounds};
use crate::stats::RangeStats;

/// Failure surfaced by a [`Ledger`].
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The backing store failed (I/O, corruption, malformed rows).
    #[error("ledger unavailable: {0}")]
    Unavailable(#[source] Box<dyn std::error::Error + Send + Sync>),
    /// A queried date range cannot be turned into timestamps.
    #[error(transparent)]
    InvalidRange(#[from] DateOutOfRange),
}

impl LedgerError {
    pub fn unavailable(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Unavailable(Box::new(source))
    }
}

/// Durable store of entries and settings.
///
/// Implementations must keep at most one active entry: `start_entry_at`
/// has to check for an active entry and insert in one atomic step.
pub trait Ledger {
    /// The active entry with the most recent start, if any.
    fn active_entry(&self) -> Result<Option<Entry>, LedgerError>;

    /// Opens a session for `prefix` unless one is already active, in which
    /// case that entry is returned unchanged.
    fn start_entry_at(
        &mut self,
        prefix: &str,
        now: DateTime<Utc>,
    ) -> Result<StartedEntry, LedgerError>;

    /// Closes entry `id` at `now`. Returns `None` when the entry does not
    /// exist or was already stopped.
    fn stop_entry_at(&mut self, id: i64, now: DateTime<Utc>)
    -> Result<Option<Entry>, LedgerError>;

    /// Closes entry `active_id` and opens a session for `prefix`, both at
    /// `now`, as one atomic write. On error neither change is applied.
    ///
    /// If another session is still active after the close, it is returned as
    /// [`StartedEntry::Existing`] and nothing new is opened.
    fn switch_entry_at(
        &mut self,
        active_id: i64,
        prefix: &str,
        now: DateTime<Utc>,
    ) -> Result<SwitchedEntry, LedgerError>;

    /// Completed entries, most recent start first.
    fn completed_entries(&self) -> Result<Vec<Entry>, LedgerError>;

    /// Sum of durations of completed entries started at or after `since`.
    fn total_duration_since(&self, since: DateTime<Utc>) -> Result<f64, LedgerError>;

    /// Completed entries started in `[start, end)`, most recent first.
    fn completed_entries_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Entry>, LedgerError>;

    /// Value stored under `key`, or `default` when absent.
    fn setting(&self, key: &str, default: &str) -> Result<String, LedgerError>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set_setting(&mut self, key: &str, value: &str) -> Result<(), LedgerError>;

    fn start_entry(&mut self, prefix: &str) -> Result<StartedEntry, LedgerError> {
        self.start_entry_at(prefix, Utc::now())
    }

    fn stop_entry(&mut self, id: i64) -> Result<Option<Entry>, LedgerError> {
        self.stop_entry_at(id, Utc::now())
    }

    /// Daily totals and entries for `start_date..=end_date` in `tz`.
    fn stats_for_range<Tz: TimeZone>(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
        tz: &Tz,
    ) -> Result<RangeStats, LedgerError>
    where
        Self: Sized,
    {
        if end_date < start_date {
            return Ok(RangeStats::from_entries(start_date, end_date, Vec::new(), tz));
        }
        let (start, end) = range_bounds(start_date, end_date, tz)?;
        let entries = self.completed_entries_between(start, end)?;
        Ok(RangeStats::from_entries(start_date, end_date, entries, tz))
    }
}

/// Settings namespaced under a collaborator name (`"<name>.<key>"`).
pub struct NamespacedSettings<'a, L: Ledger> {
    ledger: &'a mut L,
    namespace: &'a str,
}

impl<'a, L: Ledger> NamespacedSettings<'a, L> {
    pub const fn new(ledger: &'a mut L, namespace: &'a str) -> Self {
        Self { ledger, namespace }
    }

    pub fn key(&self, key: &str) -> String {
        namespaced_key(self.namespace, key)
    }

    pub fn get(&self, key: &str, default: &str) -> Result<String, LedgerError> {
        self.ledger.setting(&self.key(key), default)
    }

    /// Reads an optional value; empty strings count as unset.
    pub fn get_opt(&self, key: &str) -> Result<Option<String>, LedgerError> {
        let value = self.get(key, "")?;
        Ok((!value.is_empty()).then_some(value))
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<(), LedgerError> {
        let key = self.key(key);
        self.ledger.set_setting(&key, value)
    }

    /// Whether `<name>.enabled` holds a true value.
    pub fn enabled(&self) -> Result<bool, LedgerError> {
        Ok(parse_flag(&self.get("enabled", "false")?))
    }
}

pub fn namespaced_key(namespace: &str, key: &str) -> String {
    format!("{namespace}.{key}")
}

/// Settings flags are stored as text; accept the common spellings.
pub fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_flag_accepts_common_spellings() {
        for value in ["true", "True", "TRUE", "1", "yes", " on "] {
            assert!(parse_flag(value), "{value} should be true");
        }
        for value in ["false", "False", "0", "", "no", "enabled"] {
            assert!(!parse_flag(value), "{value} should be false");
        }
    }

    #[test]
    fn namespaced_key_joins_with_dot() {
        assert_eq!(namespaced_key("webhook", "url"), "webhook.url");
    }

    #[test]
    fn out_of_range_dates_are_reported() {
        let err = LedgerError::from(DateOutOfRange(NaiveDate::MAX));
        assert!(err.to_string().ends_with("is outside the supported calendar range"));
    }

    #[test]
    fn ledger_error_keeps_source() {
        let err = LedgerError::unavailable(std::io::Error::other("disk gone"));
        assert_eq!(err.to_string(), "ledger unavailable: disk gone");
        assert!(std::error::Error::source(&err).is_some());
    }
}
