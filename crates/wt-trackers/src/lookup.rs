//! Prefix validator backed by a remote task list.
//!
//! Fetches a JSON array of tasks and accepts a prefix when some task title
//! starts with it:
//!
//! ```json
//! [{"title": "PROJ-12 Fix login redirect"}, {"title": "OPS-3 Rotate keys"}]
//! ```
//!
//! The list is cached for the life of the validator. A prefix that matches
//! nothing triggers one refetch before it is rejected, so tasks created
//! after the last fetch are still found.
//!
//! Settings (namespace `lookup`): `enabled`, `url`, optional `token` (sent as
//! a bearer token) and optional `timeout_secs`.

use serde::Deserialize;
use wt_core::{Ledger, NamespacedSettings, Tracker, TrackerError, Validation};

use crate::http::{HttpClient, HttpError};

pub const NAME: &str = "lookup";

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Task {
    #[serde(default)]
    pub title: String,
}

#[derive(Debug)]
pub struct LookupValidator {
    client: HttpClient,
    tasks: Option<Vec<Task>>,
}

impl LookupValidator {
    pub const fn new(client: HttpClient) -> Self {
        Self {
            client,
            tasks: None,
        }
    }

    /// Builds the validator from `lookup.*` settings; `None` when disabled.
    pub fn from_settings<L: Ledger>(
        settings: &NamespacedSettings<'_, L>,
    ) -> Result<Option<Self>, HttpError> {
        if !settings.enabled()? {
            return Ok(None);
        }
        HttpClient::from_settings(settings).map(|client| Some(Self::new(client)))
    }

    fn refresh(&mut self) -> Result<&[Task], HttpError> {
        let tasks: Vec<Task> = self.client.get_json()?;
        tracing::debug!(url = %self.client.url(), count = tasks.len(), "fetched tasks");
        Ok(self.tasks.insert(tasks).as_slice())
    }

    fn cached_match(&self, prefix: &str) -> Option<&Task> {
        self.tasks.as_deref().and_then(|tasks| find_task(tasks, prefix))
    }
}

fn find_task<'a>(tasks: &'a [Task], prefix: &str) -> Option<&'a Task> {
    tasks.iter().find(|task| task.title.starts_with(prefix))
}

impl Tracker for LookupValidator {
    fn name(&self) -> &str {
        NAME
    }

    fn validate(&mut self, prefix: &str) -> Result<Validation, TrackerError> {
        if let Some(task) = self.cached_match(prefix) {
            return Ok(Validation::accept_with(task.title.clone()));
        }
        let tasks = self.refresh().map_err(TrackerError::from_source)?;
        Ok(find_task(tasks, prefix).map_or_else(
            || Validation::reject(format!("no task matches '{prefix}'")),
            |task| Validation::accept_with(task.title.clone()),
        ))
    }
}
