//! Testing helpers: a recording transport, a canned statistics API and
//! JSON fixtures shaped like the real endpoints.

use crate::client::{Endpoint, FetchError, StatsApi};
use crate::reply::ButtonMenu;
use crate::transport::{ChatId, ChatTransport, TransportError};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// Something the recording transport was asked to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    /// Plain text
    Text(String),
    /// Text with buttons
    Menu(String, ButtonMenu),
    /// Photo and caption
    Photo(PathBuf, Option<String>),
    /// Album
    Album(Vec<PathBuf>),
    /// Callback acknowledgment
    Callback(String, Option<String>),
}

impl Sent {
    /// Text body for text-like entries
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Text(text) | Self::Menu(text, _) => Some(text),
            _ => None,
        }
    }
}

/// Transport that records every call with its offset from creation.
pub struct RecordingTransport {
    started: Instant,
    log: Mutex<Vec<(Duration, Sent)>>,
    fail_on: Option<String>,
    latency: Duration,
}

impl Default for RecordingTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingTransport {
    /// Transport accepting everything instantly
    #[must_use]
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            log: Mutex::new(Vec::new()),
            fail_on: None,
            latency: Duration::ZERO,
        }
    }

    /// Reject text messages equal to `text`
    #[must_use]
    pub fn failing_on(mut self, text: &str) -> Self {
        self.fail_on = Some(text.to_string());
        self
    }

    /// Take `latency` to complete every send
    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Recorded calls with completion offsets
    #[must_use]
    pub fn timeline(&self) -> Vec<(Duration, Sent)> {
        self.log.lock().map(|log| log.clone()).unwrap_or_default()
    }

    /// Recorded calls in order
    #[must_use]
    pub fn sent(&self) -> Vec<Sent> {
        self.timeline().into_iter().map(|(_, sent)| sent).collect()
    }

    /// Text bodies in order
    #[must_use]
    pub fn texts(&self) -> Vec<String> {
        self.sent()
            .iter()
            .filter_map(|s| s.text().map(str::to_string))
            .collect()
    }

    async fn record(&self, sent: Sent) -> Result<(), TransportError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if let (Some(fail), Some(text)) = (&self.fail_on, sent.text()) {
            if fail == text {
                return Err(TransportError::Api(format!("rejected: {text}")));
            }
        }
        let at = self.started.elapsed();
        if let Ok(mut log) = self.log.lock() {
            log.push((at, sent));
        }
        Ok(())
    }
}

#[async_trait]
impl ChatTransport for RecordingTransport {
    async fn send_text(
        &self,
        _chat: ChatId,
        text: &str,
        menu: Option<ButtonMenu>,
    ) -> Result<(), TransportError> {
        let sent = match menu {
            Some(menu) => Sent::Menu(text.to_string(), menu),
            None => Sent::Text(text.to_string()),
        };
        self.record(sent).await
    }

    async fn send_photo(
        &self,
        _chat: ChatId,
        path: &Path,
        caption: Option<String>,
    ) -> Result<(), TransportError> {
        self.record(Sent::Photo(path.to_path_buf(), caption)).await
    }

    async fn send_media_group(
        &self,
        _chat: ChatId,
        paths: Vec<PathBuf>,
    ) -> Result<(), TransportError> {
        self.record(Sent::Album(paths)).await
    }

    async fn answer_callback(
        &self,
        query_id: &str,
        text: Option<String>,
    ) -> Result<(), TransportError> {
        self.record(Sent::Callback(query_id.to_string(), text)).await
    }
}

/// Statistics API serving canned bodies or status failures per endpoint.
#[derive(Default)]
pub struct CannedStatsApi {
    bodies: HashMap<Endpoint, Result<Value, u16>>,
    calls: AtomicUsize,
}

impl CannedStatsApi {
    /// API with nothing configured; every endpoint answers 404
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` for `endpoint`
    #[must_use]
    pub fn serving(mut self, endpoint: Endpoint, body: Value) -> Self {
        self.bodies.insert(endpoint, Ok(body));
        self
    }

    /// Answer `endpoint` with HTTP `status`
    #[must_use]
    pub fn failing(mut self, endpoint: Endpoint, status: u16) -> Self {
        self.bodies.insert(endpoint, Err(status));
        self
    }

    /// Number of fetches so far
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StatsApi for CannedStatsApi {
    async fn fetch_json(&self, endpoint: Endpoint) -> Result<Value, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.bodies.get(&endpoint) {
            Some(Ok(body)) => Ok(body.clone()),
            Some(Err(status)) => Err(FetchError::Status {
                status: *status,
                url: format!("https://api.test/{endpoint}"),
            }),
            None => Err(FetchError::Status {
                status: 404,
                url: format!("https://api.test/{endpoint}"),
            }),
        }
    }
}

/// Cumulative daily series of `len` points growing by `daily` per day.
#[must_use]
pub fn cumulative_series(len: usize, daily: impl Fn(usize) -> f64) -> Value {
    let mut total = 0.0;
    let points: Vec<Value> = (0..len)
        .map(|i| {
            total += daily(i);
            json!({"t": format!("2020-10-{:02}", (i % 28) + 1), "y": total})
        })
        .collect();
    Value::Array(points)
}

/// Deaths summary with World, two regions and three countries.
#[must_use]
pub fn deaths_summary() -> Value {
    json!({"data": [
        {"country": "World", "population": 7_800.0, "total": 1_300_000},
        {"country": "Europe", "region": "world", "population": 747.0, "total": 350_000},
        {"country": "Oceania", "region": "world", "population": 42.0, "total": 1_000},
        {"country": "France", "region": "Europe", "population": 65.0, "total": 45_000},
        {"country": "United States", "region": "Northern America", "population": 330.0, "total": 250_000},
        {"country": "United", "region": "Europe", "population": 10.0, "total": 34}
    ]})
}

/// Confirmed summary matching [`deaths_summary`], with 40-day series.
#[must_use]
pub fn confirmed_summary() -> Value {
    json!({"data": [
        {"country": "World", "population": 7_800.0, "this14": 7_800_000, "data": cumulative_series(40, |_| 1.0)},
        {"country": "Europe", "region": "world", "population": 747.0, "this14": 3_000_000, "data": cumulative_series(40, |_| 1.0)},
        {"country": "Oceania", "region": "world", "population": 42.0, "this14": 420, "data": cumulative_series(40, |_| 1.0)},
        {"country": "France", "region": "Europe", "population": 65.0, "this14": 650_000, "data": cumulative_series(40, |i| if i >= 26 { 200.0 } else { 100.0 })},
        {"country": "Germany", "region": "Europe", "population": 83.0, "this14": 166_000, "data": cumulative_series(40, |_| 50.0)},
        {"country": "Iceland", "region": "Europe", "population": 0.36, "this14": 36, "data": cumulative_series(20, |_| 1.0)},
        {"country": "United States", "region": "Northern America", "population": 330.0, "this14": 1_650_000, "data": cumulative_series(40, |_| 10.0)},
        {"country": "United", "region": "Europe", "population": 10.0, "this14": 127, "data": cumulative_series(40, |_| 1.0)}
    ]})
}

/// ECDC weekly report for France and the United Kingdom.
#[must_use]
pub fn ecdc_weekly() -> Value {
    json!({"data": [
        {"country": "France", "region": [
            {"name": "Bretagne", "data": [
                {"t": "202041", "v": 50.0}, {"t": "202042", "v": 60.0}, {"t": "202043", "v": 55.0},
                {"t": "202044", "v": 70.0}, {"t": "202045", "v": 80.0}
            ]},
            {"name": "Corse", "data": [
                {"t": "202041", "v": 300.0}, {"t": "202042", "v": 250.0}, {"t": "202043", "v": 260.0},
                {"t": "202044", "v": 240.0}, {"t": "202045", "v": 200.0}
            ]},
            {"name": "Mayotte", "data": [{"t": "202045", "v": 999.0}]}
        ]},
        {"country": "United Kingdom", "region": [
            {"name": "Wales", "data": [
                {"t": 202041, "v": 1.0}, {"t": 202042, "v": 2.0}, {"t": 202043, "v": 3.0},
                {"t": 202044, "v": 4.0}, {"t": 202045, "v": 5.0}
            ]}
        ]}
    ]})
}

/// Mauna Loa series whose last reading is dated `last_date`.
#[must_use]
pub fn co2_daily(last_date: &str) -> Value {
    json!({"data": [
        {"date": "2020-11-01", "value": 412.0, "valueLastYear": 410.0, "value10yrsAgo": 389.0},
        {"date": last_date, "value": 413.2, "valueLastYear": 410.7, "value10yrsAgo": 389.1}
    ]})
}
