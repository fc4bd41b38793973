//! Collaborators notified of timer transitions.
//!
//! A tracker mirrors local sessions into some external system (an issue
//! tracker, a webhook) and may veto prefixes before a session starts. The
//! controller calls every registered tracker on every transition and isolates
//! their failures from the local state machine.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

/// A collaborator call failed.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("{0}")]
    Message(String),
    #[error("{0}")]
    Source(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl TrackerError {
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }

    pub fn from_source(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Source(Box::new(source))
    }
}

/// A validator's verdict on a prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validation {
    pub accepted: bool,
    pub note: Option<String>,
}

impl Validation {
    pub const fn accept() -> Self {
        Self {
            accepted: true,
            note: None,
        }
    }

    pub fn accept_with(note: impl Into<String>) -> Self {
        Self {
            accepted: true,
            note: Some(note.into()),
        }
    }

    pub fn reject(reason: impl Into<String>) -> Self {
        Self {
            accepted: false,
            note: Some(reason.into()),
        }
    }
}

/// A completed session, as reported to collaborators on stop.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StopEvent {
    pub entry_id: i64,
    pub prefix: String,
    pub duration_seconds: f64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

/// External integration hooked into start/stop transitions.
///
/// Every method has a permissive default so an integration only implements
/// the capabilities it has.
pub trait Tracker {
    /// Stable name; also the namespace for this tracker's settings.
    fn name(&self) -> &str;

    /// Checks a prefix before a session starts.
    fn validate(&mut self, _prefix: &str) -> Result<Validation, TrackerError> {
        Ok(Validation::accept())
    }

    fn notify_start(
        &mut self,
        _prefix: &str,
        _start_time: DateTime<Utc>,
    ) -> Result<(), TrackerError> {
        Ok(())
    }

    fn notify_stop(&mut self, _event: &StopEvent) -> Result<(), TrackerError> {
        Ok(())
    }
}

/// A tracker call that failed after the local transition had committed.
#[derive(Debug)]
pub struct TrackerFailure {
    pub tracker: String,
    pub error: TrackerError,
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Silent;

    impl Tracker for Silent {
        fn name(&self) -> &str {
            "silent"
        }
    }

    #[test]
    fn default_capabilities_accept_and_succeed() {
        let mut tracker = Silent;
        assert_eq!(tracker.validate("anything").unwrap(), Validation::accept());
        assert!(tracker.notify_start("anything", Utc::now()).is_ok());
    }

    #[test]
    fn reject_carries_reason() {
        let verdict = Validation::reject("no such issue");
        assert!(!verdict.accepted);
        assert_eq!(verdict.note.as_deref(), Some("no such issue"));
    }

    #[test]
    fn tracker_error_displays_inner_message() {
        let err = TrackerError::from_source(std::io::Error::other("connection refused"));
        assert_eq!(err.to_string(), "connection refused");
        assert_eq!(TrackerError::message("bad token").to_string(), "bad token");
    }
}
