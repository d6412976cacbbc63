//! Remote statistics API client
//!
//! Fetches JSON from the fixed set of statistics endpoints. Every command
//! triggers a fresh request: nothing is cached and nothing is retried.

use crate::records::Envelope;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use thiserror::Error;
use tracing::debug;

/// Errors that can occur while fetching from the statistics API.
///
/// Callers treat every variant the same way; the variant only keeps the
/// underlying cause for logging.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network failure or unreadable body
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    /// Non-2xx response
    #[error("HTTP {status} from {url}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Requested URL
        url: String,
    },
    /// Body is not valid JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors surfaced at the flow boundary.
#[derive(Debug, Error)]
pub enum FlowError {
    /// Fetching from the statistics API failed
    #[error(transparent)]
    Fetch(#[from] FetchError),
    /// The API answered with data of an unexpected shape
    #[error("Malformed upstream data: {0}")]
    Malformed(String),
    /// The chat transport rejected a message
    #[error(transparent)]
    Transport(#[from] crate::transport::TransportError),
}

/// The fixed set of statistics endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// Daily Mauna Loa CO2 series
    Co2Daily,
    /// Per-country deaths summary
    DeathsSummary,
    /// Per-country confirmed cases summary with daily series
    ConfirmedSummary,
    /// ECDC weekly sub-national data
    EcdcWeekly,
}

impl Endpoint {
    /// Path relative to the API base URL.
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Co2Daily => "maunaloaco2-daily",
            Self::DeathsSummary => "covid-deaths-summary",
            Self::ConfirmedSummary => "covid-confirmed-summary",
            Self::EcdcWeekly => "ecdc-weekly",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Interface to the statistics API
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StatsApi: Send + Sync {
    /// Fetch and parse the JSON body of an endpoint
    async fn fetch_json(&self, endpoint: Endpoint) -> Result<Value, FetchError>;
}

/// `reqwest`-backed statistics API client.
pub struct HttpStatsClient {
    base_url: String,
    client: reqwest::Client,
}

impl HttpStatsClient {
    /// Create a client for the given base URL with the transport's default timeouts.
    #[must_use]
    pub fn new(base_url: &str) -> Self {
        Self::with_client(base_url, reqwest::Client::new())
    }

    /// Create a client reusing an existing `reqwest::Client`.
    #[must_use]
    pub fn with_client(base_url: &str, client: reqwest::Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Fully-qualified URL of an endpoint.
    #[must_use]
    pub fn endpoint_url(&self, endpoint: Endpoint) -> String {
        format!("{}/{}", self.base_url, endpoint.path())
    }
}

#[async_trait]
impl StatsApi for HttpStatsClient {
    async fn fetch_json(&self, endpoint: Endpoint) -> Result<Value, FetchError> {
        let url = self.endpoint_url(endpoint);
        debug!(url = %url, "Statistics API request");

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url,
            });
        }

        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(bytes.as_ref())?)
    }
}

/// Fetch an endpoint and decode its `data` envelope.
///
/// # Errors
///
/// Returns `FlowError::Fetch` if the request fails and
/// `FlowError::Malformed` if the body does not have the expected shape.
pub async fn fetch_records<T>(api: &dyn StatsApi, endpoint: Endpoint) -> Result<Vec<T>, FlowError>
where
    T: DeserializeOwned,
{
    let value = api.fetch_json(endpoint).await?;
    let envelope: Envelope<T> = serde_json::from_value(value)
        .map_err(|e| FlowError::Malformed(format!("{endpoint}: {e}")))?;
    Ok(envelope.data)
}
