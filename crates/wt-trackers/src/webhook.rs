//! JSON webhook notifier.
//!
//! Posts one JSON document per timer transition to a configured URL:
//!
//! ```json
//! {"event":"start","prefix":"PROJ-12","started_at":"2025-03-04T09:00:00.000Z"}
//! {"event":"stop","prefix":"PROJ-12","started_at":"...","stopped_at":"...",
//!  "duration_seconds":125.0,"rounded_minutes":3}
//! ```
//!
//! Settings (namespace `webhook`): `enabled`, `url`, optional `token` (sent as
//! a bearer token), optional `timeout_secs` and optional `prefix_regex`. With
//! a regex set, only sessions whose prefix matches it are posted.

use chrono::{DateTime, SecondsFormat, Utc};
use regex::Regex;
use serde::Serialize;
use thiserror::Error;
use wt_core::{
    Ledger, LedgerError, NamespacedSettings, StopEvent, Tracker, TrackerError, round_up_minutes,
};

use crate::http::{HttpClient, HttpError};

pub const NAME: &str = "webhook";

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error(transparent)]
    Http(#[from] HttpError),
    #[error("invalid value for setting {key}: {source}")]
    PrefixRegex {
        key: String,
        #[source]
        source: regex::Error,
    },
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

#[derive(Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum Payload<'a> {
    Start {
        prefix: &'a str,
        started_at: String,
    },
    Stop {
        prefix: &'a str,
        started_at: String,
        stopped_at: String,
        duration_seconds: f64,
        rounded_minutes: u64,
    },
}

impl<'a> Payload<'a> {
    fn start(prefix: &'a str, start_time: DateTime<Utc>) -> Self {
        Self::Start {
            prefix,
            started_at: format_timestamp(start_time),
        }
    }

    fn stop(event: &'a StopEvent) -> Self {
        Self::Stop {
            prefix: &event.prefix,
            started_at: format_timestamp(event.start_time),
            stopped_at: format_timestamp(event.end_time),
            duration_seconds: event.duration_seconds,
            rounded_minutes: round_up_minutes(event.duration_seconds),
        }
    }
}

/// Webhook tracker.
///
/// Calls block on the client's runtime; the timer treats every call as
/// fire-and-forget and only collects the error.
#[derive(Debug)]
pub struct WebhookTracker {
    client: HttpClient,
    prefix_filter: Option<Regex>,
}

impl WebhookTracker {
    pub const fn new(client: HttpClient) -> Self {
        Self {
            client,
            prefix_filter: None,
        }
    }

    /// Only post sessions whose prefix matches `filter`.
    #[must_use]
    pub fn with_prefix_filter(mut self, filter: Regex) -> Self {
        self.prefix_filter = Some(filter);
        self
    }

    /// Builds the tracker from `webhook.*` settings; `None` when disabled.
    pub fn from_settings<L: Ledger>(
        settings: &NamespacedSettings<'_, L>,
    ) -> Result<Option<Self>, WebhookError> {
        if !settings.enabled()? {
            return Ok(None);
        }
        let mut tracker = Self::new(HttpClient::from_settings(settings)?);
        if let Some(raw) = settings.get_opt("prefix_regex")? {
            let filter = Regex::new(raw.trim()).map_err(|source| WebhookError::PrefixRegex {
                key: settings.key("prefix_regex"),
                source,
            })?;
            tracker = tracker.with_prefix_filter(filter);
        }
        Ok(Some(tracker))
    }

    fn wants(&self, prefix: &str) -> bool {
        let wanted = self
            .prefix_filter
            .as_ref()
            .is_none_or(|filter| filter.is_match(prefix));
        if !wanted {
            tracing::debug!(prefix, "webhook skipped: prefix filtered out");
        }
        wanted
    }

    fn post(&self, payload: &Payload<'_>) -> Result<(), TrackerError> {
        self.client
            .post_json(payload)
            .map_err(TrackerError::from_source)
    }
}

impl Tracker for WebhookTracker {
    fn name(&self) -> &str {
        NAME
    }

    fn notify_start(
        &mut self,
        prefix: &str,
        start_time: DateTime<Utc>,
    ) -> Result<(), TrackerError> {
        if !self.wants(prefix) {
            return Ok(());
        }
        self.post(&Payload::start(prefix, start_time))
    }

    fn notify_stop(&mut self, event: &StopEvent) -> Result<(), TrackerError> {
        if !self.wants(&event.prefix) {
            return Ok(());
        }
        self.post(&Payload::stop(event))
    }
}

fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}
