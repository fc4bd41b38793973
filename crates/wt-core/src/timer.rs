//! The timer state machine.
//!
//! [`TimerController`] owns the single in-memory timer state. It is built
//! once per process from the ledger's active entry, so a timer left running
//! before a restart resumes as `Tracking` instead of being lost.
//!
//! Every transition writes to the ledger first and notifies trackers after.
//! Tracker failures are reported in the returned [`TransitionReport`] and
//! never undo the local transition.

use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::duration::hours_to_seconds;
use crate::entry::{Entry, StartedEntry, SwitchedEntry, seconds_between};
use crate::ledger::{Ledger, LedgerError};
use crate::period::{DateOutOfRange, day_bounds, local_date, week_bounds};
use crate::tracker::{StopEvent, Tracker, TrackerError, TrackerFailure, Validation};

/// Settings key holding the weekly limit in hours.
pub const WEEKLY_LIMIT_KEY: &str = "weekly_limit_hours";

/// Errors that abort a timer operation before any state changes.
#[derive(Debug, Error)]
pub enum TimerError {
    #[error("task prefix cannot be empty")]
    EmptyPrefix,
    #[error("{tracker} rejected '{prefix}': {reason}")]
    Rejected {
        tracker: String,
        prefix: String,
        reason: String,
    },
    #[error("invalid value for setting {key}: {value}")]
    InvalidSetting { key: String, value: String },
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    DateOutOfRange(#[from] DateOutOfRange),
}

/// The session the timer is currently tracking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActiveSession {
    pub entry_id: i64,
    pub prefix: String,
    pub start_time: DateTime<Utc>,
}

impl From<&Entry> for ActiveSession {
    fn from(entry: &Entry) -> Self {
        Self {
            entry_id: entry.id,
            prefix: entry.prefix.clone(),
            start_time: entry.start_time,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TimerState {
    #[default]
    Idle,
    Tracking(ActiveSession),
}

impl TimerState {
    pub const fn active(&self) -> Option<&ActiveSession> {
        match self {
            Self::Idle => None,
            Self::Tracking(session) => Some(session),
        }
    }

    pub const fn is_tracking(&self) -> bool {
        matches!(self, Self::Tracking(_))
    }
}

/// A state change that was committed to the ledger.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    Started(ActiveSession),
    Stopped(StopEvent),
    /// The ledger already held a session this controller had not seen;
    /// the controller now tracks it instead of starting a new one.
    Adopted(ActiveSession),
}

/// Non-fatal remark a validator attached to an accepted prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerNote {
    pub tracker: String,
    pub note: String,
}

/// What a start or stop call did.
///
/// An empty report means the call was a guard no-op.
#[derive(Debug, Default)]
pub struct TransitionReport {
    pub transitions: Vec<Transition>,
    pub failures: Vec<TrackerFailure>,
    pub notes: Vec<TrackerNote>,
}

impl TransitionReport {
    pub fn is_noop(&self) -> bool {
        self.transitions.is_empty()
    }

    pub fn started(&self) -> Option<&ActiveSession> {
        self.transitions.iter().find_map(|t| match t {
            Transition::Started(session) => Some(session),
            Transition::Stopped(_) | Transition::Adopted(_) => None,
        })
    }

    pub fn stopped(&self) -> Option<&StopEvent> {
        self.transitions.iter().find_map(|t| match t {
            Transition::Stopped(event) => Some(event),
            Transition::Started(_) | Transition::Adopted(_) => None,
        })
    }
}

/// Period totals including live accrual from the active session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub active: Option<ActiveSession>,
    pub elapsed_seconds: Option<f64>,
    pub today_seconds: f64,
    pub week_seconds: f64,
    pub weekly_limit_seconds: f64,
    pub remaining_seconds: f64,
}

impl Summary {
    /// The limit is advisory; callers decide whether to offer `start`.
    pub fn limit_reached(&self) -> bool {
        self.remaining_seconds <= 0.0
    }
}

pub struct TimerController<L: Ledger> {
    ledger: L,
    trackers: Vec<Box<dyn Tracker>>,
    state: TimerState,
}

impl<L: Ledger> TimerController<L> {
    /// Builds a controller, recovering any session left active in `ledger`.
    pub fn new(ledger: L) -> Result<Self, TimerError> {
        Self::with_trackers(ledger, Vec::new())
    }

    pub fn with_trackers(ledger: L, trackers: Vec<Box<dyn Tracker>>) -> Result<Self, TimerError> {
        let state = match ledger.active_entry()? {
            Some(entry) => {
                tracing::info!(
                    entry_id = entry.id,
                    prefix = %entry.prefix,
                    start_time = %entry.start_time,
                    "resumed active session"
                );
                TimerState::Tracking(ActiveSession::from(&entry))
            }
            None => TimerState::Idle,
        };
        Ok(Self {
            ledger,
            trackers,
            state,
        })
    }

    pub fn register(&mut self, tracker: Box<dyn Tracker>) {
        self.trackers.push(tracker);
    }

    pub const fn state(&self) -> &TimerState {
        &self.state
    }

    pub const fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn start(&mut self, prefix: &str) -> Result<TransitionReport, TimerError> {
        self.start_at(prefix, Utc::now())
    }

    /// Starts tracking `prefix`.
    ///
    /// Starting the prefix already being tracked is a no-op. Starting a
    /// different prefix stops the current session at the same instant, in
    /// the same ledger write, so a failed switch leaves the old session
    /// running.
    pub fn start_at(
        &mut self,
        prefix: &str,
        now: DateTime<Utc>,
    ) -> Result<TransitionReport, TimerError> {
        let prefix = prefix.trim();
        if prefix.is_empty() {
            return Err(TimerError::EmptyPrefix);
        }
        if let TimerState::Tracking(active) = &self.state {
            if active.prefix == prefix {
                tracing::debug!(prefix, "already tracking prefix");
                return Ok(TransitionReport::default());
            }
        }

        let mut report = TransitionReport::default();
        self.validate(prefix, &mut report)?;

        let started = match self.state.clone() {
            TimerState::Tracking(active) => {
                let SwitchedEntry { stopped, started } =
                    self.ledger.switch_entry_at(active.entry_id, prefix, now)?;
                self.record_stop(active, stopped, now, &mut report);
                started
            }
            TimerState::Idle => self.ledger.start_entry_at(prefix, now)?,
        };
        self.record_start(started, &mut report);
        Ok(report)
    }

    pub fn stop(&mut self, prefix: &str) -> Result<TransitionReport, TimerError> {
        self.stop_at(prefix, Utc::now())
    }

    /// Stops the active session if it is tracking `prefix`.
    ///
    /// Stopping while idle or with another prefix is a guard no-op: nothing
    /// is written and no tracker is called.
    pub fn stop_at(
        &mut self,
        prefix: &str,
        now: DateTime<Utc>,
    ) -> Result<TransitionReport, TimerError> {
        let prefix = prefix.trim();
        let active = match &self.state {
            TimerState::Tracking(active) if active.prefix == prefix => active.clone(),
            TimerState::Tracking(active) => {
                tracing::debug!(prefix, active = %active.prefix, "stop ignored: prefix mismatch");
                return Ok(TransitionReport::default());
            }
            TimerState::Idle => {
                tracing::debug!(prefix, "stop ignored: timer idle");
                return Ok(TransitionReport::default());
            }
        };
        let mut report = TransitionReport::default();
        let stopped = self.ledger.stop_entry_at(active.entry_id, now)?;
        self.record_stop(active, stopped, now, &mut report);
        Ok(report)
    }

    /// Stops whatever session is active.
    pub fn stop_active_at(&mut self, now: DateTime<Utc>) -> Result<TransitionReport, TimerError> {
        match self.state.active() {
            Some(active) => {
                let prefix = active.prefix.clone();
                self.stop_at(&prefix, now)
            }
            None => Ok(TransitionReport::default()),
        }
    }

    /// Seconds the active session has been running, if any.
    pub fn elapsed_at(&self, now: DateTime<Utc>) -> Option<f64> {
        self.state
            .active()
            .map(|active| seconds_between(active.start_time, now))
    }

    /// Stored total since `since`, plus live time when the active session
    /// started inside the period.
    pub fn accrued_since_at(
        &self,
        since: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<f64, TimerError> {
        let stored = self.ledger.total_duration_since(since)?;
        let live = match self.state.active() {
            Some(active) if active.start_time >= since => seconds_between(active.start_time, now),
            _ => 0.0,
        };
        Ok(stored + live)
    }

    /// Weekly limit from settings, or `default_hours` when unset.
    pub fn weekly_limit_hours(&self, default_hours: f64) -> Result<f64, TimerError> {
        let raw = self
            .ledger
            .setting(WEEKLY_LIMIT_KEY, &default_hours.to_string())?;
        raw.trim()
            .parse::<f64>()
            .ok()
            .filter(|hours| hours.is_finite() && *hours >= 0.0)
            .ok_or(TimerError::InvalidSetting {
                key: WEEKLY_LIMIT_KEY.to_string(),
                value: raw,
            })
    }

    /// Today, this week and remaining-against-limit totals as of `now`.
    pub fn summary_at<Tz: TimeZone>(
        &self,
        weekly_limit_hours: f64,
        now: DateTime<Utc>,
        tz: &Tz,
    ) -> Result<Summary, TimerError> {
        let today = local_date(now, tz);
        let (day_start, _) = day_bounds(today, tz)?;
        let (week_start, _) = week_bounds(today, tz)?;

        let today_seconds = self.accrued_since_at(day_start, now)?;
        let week_seconds = self.accrued_since_at(week_start, now)?;
        let weekly_limit_seconds = hours_to_seconds(weekly_limit_hours);

        Ok(Summary {
            active: self.state.active().cloned(),
            elapsed_seconds: self.elapsed_at(now),
            today_seconds,
            week_seconds,
            weekly_limit_seconds,
            remaining_seconds: weekly_limit_seconds - week_seconds,
        })
    }

    fn validate(&mut self, prefix: &str, report: &mut TransitionReport) -> Result<(), TimerError> {
        for tracker in &mut self.trackers {
            let verdict = tracker.validate(prefix).unwrap_or_else(|err| {
                tracing::warn!(tracker = tracker.name(), error = %err, "validation failed");
                Validation::reject(err.to_string())
            });
            if !verdict.accepted {
                return Err(TimerError::Rejected {
                    tracker: tracker.name().to_string(),
                    prefix: prefix.to_string(),
                    reason: verdict
                        .note
                        .unwrap_or_else(|| "prefix not recognised".to_string()),
                });
            }
            if let Some(note) = verdict.note {
                report.notes.push(TrackerNote {
                    tracker: tracker.name().to_string(),
                    note,
                });
            }
        }
        Ok(())
    }

    /// Moves to `Idle` after the ledger closed `active`. `stopped` is `None`
    /// when the ledger had already closed it.
    fn record_stop(
        &mut self,
        active: ActiveSession,
        stopped: Option<Entry>,
        now: DateTime<Utc>,
        report: &mut TransitionReport,
    ) {
        self.state = TimerState::Idle;
        let Some(entry) = stopped else {
            tracing::warn!(
                entry_id = active.entry_id,
                "active session was already closed in the ledger"
            );
            return;
        };
        let end_time = entry.end_time.unwrap_or(now);
        let event = StopEvent {
            entry_id: active.entry_id,
            prefix: active.prefix,
            duration_seconds: seconds_between(active.start_time, end_time),
            start_time: active.start_time,
            end_time,
        };
        tracing::info!(
            entry_id = event.entry_id,
            prefix = %event.prefix,
            duration_seconds = event.duration_seconds,
            "stopped session"
        );
        notify_all(&mut self.trackers, &mut report.failures, |tracker| {
            tracker.notify_stop(&event)
        });
        report.transitions.push(Transition::Stopped(event));
    }

    fn record_start(&mut self, started: StartedEntry, report: &mut TransitionReport) {
        match started {
            StartedEntry::Created(entry) => {
                let session = ActiveSession::from(&entry);
                self.state = TimerState::Tracking(session.clone());
                tracing::info!(entry_id = entry.id, prefix = %entry.prefix, "started session");
                notify_all(&mut self.trackers, &mut report.failures, |tracker| {
                    tracker.notify_start(&session.prefix, session.start_time)
                });
                report.transitions.push(Transition::Started(session));
            }
            StartedEntry::Existing(entry) => {
                // Another writer opened a session this controller never saw.
                tracing::warn!(
                    entry_id = entry.id,
                    prefix = %entry.prefix,
                    "ledger already had an active session; adopting it"
                );
                let session = ActiveSession::from(&entry);
                self.state = TimerState::Tracking(session.clone());
                report.transitions.push(Transition::Adopted(session));
            }
        }
    }
}

fn notify_all<F>(trackers: &mut [Box<dyn Tracker>], failures: &mut Vec<TrackerFailure>, mut call: F)
where
    F: FnMut(&mut dyn Tracker) -> Result<(), TrackerError>,
{
    for tracker in trackers {
        if let Err(error) = call(tracker.as_mut()) {
            tracing::warn!(tracker = tracker.name(), %error, "tracker notification failed");
            failures.push(TrackerFailure {
                tracker: tracker.name().to_string(),
                error,
            });
        }
    }
}
