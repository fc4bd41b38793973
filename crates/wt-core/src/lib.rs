//! Core domain logic for the work timer.
//!
//! This crate contains:
//! - Timer: the start/stop state machine with crash recovery
//! - Ledger: the storage seam the timer reads and writes through
//! - Stats: day bucketing, per-task totals and live accrual
//! - Trackers: the collaborator contract for external integrations

pub mod duration;
mod entry;
pub mod ledger;
pub mod period;
mod stats;
pub mod timer;
pub mod tracker;

pub use duration::{format_hms, round_up_minutes};
pub use entry::{Entry, StartedEntry, SwitchedEntry, seconds_between};
pub use ledger::{Ledger, LedgerError, NamespacedSettings};
pub use stats::{DailyTotal, RangeStats, TaskTotal};
pub use timer::{
    ActiveSession, Summary, TimerController, TimerError, TimerState, TrackerNote, Transition,
    TransitionReport, WEEKLY_LIMIT_KEY,
};
pub use tracker::{StopEvent, Tracker, TrackerError, TrackerFailure, Validation};
