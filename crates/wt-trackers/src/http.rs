//! Blocking JSON client shared by the HTTP-backed trackers.
//!
//! Trackers are called synchronously by the timer, so each client owns a
//! private runtime and blocks on every request.

use std::fmt;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use wt_core::{Ledger, LedgerError, NamespacedSettings};

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum HttpError {
    /// The configured URL is unusable.
    #[error("invalid URL: {reason}")]
    InvalidUrl { reason: &'static str },
    /// A required setting is missing.
    #[error("missing setting {0}")]
    MissingSetting(String),
    /// A setting holds an unparseable value.
    #[error("invalid value for setting {key}: {value}")]
    InvalidSetting { key: String, value: String },
    /// Failed to build HTTP client.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
    /// Failed to start the async runtime.
    #[error("failed to start runtime: {0}")]
    Runtime(#[source] std::io::Error),
    /// HTTP request failed.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// Endpoint answered with a non-success status.
    #[error("endpoint returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// A client bound to one endpoint, with an optional bearer token.
pub struct HttpClient {
    http: reqwest::Client,
    runtime: tokio::runtime::Runtime,
    url: String,
    token: Option<String>,
}

impl fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpClient")
            .field("url", &self.url)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish_non_exhaustive()
    }
}

impl HttpClient {
    /// # Errors
    ///
    /// Returns an error if the URL is empty or not http(s), or if the HTTP
    /// client or runtime fails to build.
    pub fn new(
        url: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, HttpError> {
        let url = url.into().trim().to_string();
        if url.is_empty() {
            return Err(HttpError::InvalidUrl {
                reason: "URL cannot be empty",
            });
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(HttpError::InvalidUrl {
                reason: "URL must start with http:// or https://",
            });
        }

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(HttpError::ClientBuild)?;
        let runtime = tokio::runtime::Runtime::new().map_err(HttpError::Runtime)?;

        Ok(Self {
            http,
            runtime,
            url,
            token: token.filter(|t| !t.trim().is_empty()),
        })
    }

    /// Builds a client from the `url`, `token` and `timeout_secs` settings
    /// of one namespace. Only `url` is required.
    pub fn from_settings<L: Ledger>(
        settings: &NamespacedSettings<'_, L>,
    ) -> Result<Self, HttpError> {
        let url = settings
            .get_opt("url")?
            .ok_or_else(|| HttpError::MissingSetting(settings.key("url")))?;
        let token = settings.get_opt("token")?;
        let timeout = match settings.get_opt("timeout_secs")? {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| HttpError::InvalidSetting {
                    key: settings.key("timeout_secs"),
                    value: raw,
                })?,
            None => DEFAULT_TIMEOUT,
        };
        Self::new(url, token, timeout)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Posts `body` as JSON and discards the response body.
    pub fn post_json<T: Serialize + ?Sized>(&self, body: &T) -> Result<(), HttpError> {
        self.runtime.block_on(self.send_post(body))
    }

    /// Fetches the endpoint and decodes the JSON response.
    pub fn get_json<T: DeserializeOwned>(&self) -> Result<T, HttpError> {
        self.runtime.block_on(self.send_get())
    }

    async fn send_post<T: Serialize + ?Sized>(&self, body: &T) -> Result<(), HttpError> {
        let response = self.authorize(self.http.post(&self.url).json(body)).send().await?;
        let status = check_status(response).await?.status();
        tracing::debug!(url = %self.url, %status, "posted");
        Ok(())
    }

    async fn send_get<T: DeserializeOwned>(&self) -> Result<T, HttpError> {
        let response = self.authorize(self.http.get(&self.url)).send().await?;
        Ok(check_status(response).await?.json::<T>().await?)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, HttpError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(HttpError::Status {
        status: status.as_u16(),
        body,
    })
}
