//! Ledger entries: one recorded (or running) work session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A work session for a single task prefix.
///
/// `end_time` and `duration_seconds` are both `None` while the session is
/// active. Once stopped, an entry never changes again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub id: i64,
    pub prefix: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration_seconds: Option<f64>,
}

impl Entry {
    /// Returns true while the session has not been stopped.
    pub const fn is_active(&self) -> bool {
        self.end_time.is_none()
    }

    /// Seconds elapsed between `start_time` and `now`, never negative.
    pub fn elapsed_seconds_at(&self, now: DateTime<Utc>) -> f64 {
        seconds_between(self.start_time, now)
    }
}

/// Outcome of asking the ledger to open a session.
#[derive(Debug, Clone, PartialEq)]
pub enum StartedEntry {
    /// A new active entry was written.
    Created(Entry),
    /// An active entry already existed and was returned unchanged.
    Existing(Entry),
}

impl StartedEntry {
    pub const fn entry(&self) -> &Entry {
        match self {
            Self::Created(entry) | Self::Existing(entry) => entry,
        }
    }

    pub fn into_entry(self) -> Entry {
        match self {
            Self::Created(entry) | Self::Existing(entry) => entry,
        }
    }
}

/// Outcome of closing one session and opening the next in a single write.
#[derive(Debug, Clone, PartialEq)]
pub struct SwitchedEntry {
    /// The closed entry; `None` when it was already closed.
    pub stopped: Option<Entry>,
    pub started: StartedEntry,
}

/// Seconds from `start` to `end` at millisecond resolution, clamped at zero.
#[expect(
    clippy::cast_precision_loss,
    reason = "millisecond counts stay far below 2^52"
)]
pub fn seconds_between(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    let ms = end.signed_duration_since(start).num_milliseconds().max(0);
    ms as f64 / 1000.0
}
