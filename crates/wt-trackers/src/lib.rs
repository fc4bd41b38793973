//! External trackers for the work timer.
//!
//! Provides collaborators that plug into the timer's start/stop transitions:
//! - A prefix validator backed by a regular expression
//! - A prefix validator backed by a remote task list
//! - A JSON webhook notifier
//!
//! Each tracker reads its settings from the ledger under its own name and is
//! only built when `<name>.enabled` is set.

pub mod http;
pub mod lookup;
pub mod pattern;
pub mod webhook;

use thiserror::Error;
use wt_core::{Ledger, NamespacedSettings, Tracker};

pub use http::{HttpClient, HttpError};
pub use lookup::LookupValidator;
pub use pattern::{PatternError, PatternValidator};
pub use webhook::{WebhookError, WebhookTracker};

/// Names of every tracker this crate can build, in registration order.
pub const TRACKER_NAMES: [&str; 3] = [pattern::NAME, lookup::NAME, webhook::NAME];

/// A tracker could not be built from its settings.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("{tracker}: {source}")]
    Pattern {
        tracker: &'static str,
        #[source]
        source: PatternError,
    },
    #[error("{tracker}: {source}")]
    Lookup {
        tracker: &'static str,
        #[source]
        source: HttpError,
    },
    #[error("{tracker}: {source}")]
    Webhook {
        tracker: &'static str,
        #[source]
        source: WebhookError,
    },
}

/// Builds the enabled trackers. Validators come first so a rejection never
/// reaches a notifier; the local pattern check runs before the remote lookup.
///
/// # Errors
///
/// Returns an error if an enabled tracker has unusable settings.
pub fn build_trackers<L: Ledger>(ledger: &mut L) -> Result<Vec<Box<dyn Tracker>>, SetupError> {
    let mut trackers: Vec<Box<dyn Tracker>> = Vec::new();

    let settings = NamespacedSettings::new(&mut *ledger, pattern::NAME);
    if let Some(validator) =
        PatternValidator::from_settings(&settings).map_err(|source| SetupError::Pattern {
            tracker: pattern::NAME,
            source,
        })?
    {
        tracing::debug!(pattern = validator.as_str(), "registered prefix validator");
        trackers.push(Box::new(validator));
    }

    let settings = NamespacedSettings::new(&mut *ledger, lookup::NAME);
    if let Some(validator) =
        LookupValidator::from_settings(&settings).map_err(|source| SetupError::Lookup {
            tracker: lookup::NAME,
            source,
        })?
    {
        tracing::debug!(?validator, "registered task lookup");
        trackers.push(Box::new(validator));
    }

    let settings = NamespacedSettings::new(&mut *ledger, webhook::NAME);
    if let Some(tracker) =
        WebhookTracker::from_settings(&settings).map_err(|source| SetupError::Webhook {
            tracker: webhook::NAME,
            source,
        })?
    {
        tracing::debug!(?tracker, "registered webhook");
        trackers.push(Box::new(tracker));
    }

    Ok(trackers)
}
