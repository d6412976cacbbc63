//! Records returned by the statistics API.
//!
//! Every endpoint wraps its payload in a `{ "data": [...] }` envelope. Time
//! series are ordered chronologically ascending, so the last element is the
//! most recent one.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// The `{ "data": [...] }` envelope shared by all endpoints.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    /// Records in API order
    pub data: Vec<T>,
}

/// One daily Mauna Loa CO2 measurement.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Co2Reading {
    /// Measurement date as published (ISO `YYYY-MM-DD`)
    pub date: String,
    /// CO2 concentration in ppm
    pub value: f64,
    /// Concentration on the same day one year earlier
    pub value_last_year: f64,
    /// Concentration on the same day ten years earlier
    #[serde(rename = "value10yrsAgo")]
    pub value_10yrs_ago: f64,
}

/// One point of a cumulative daily series.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SeriesPoint {
    /// Date of the point (ISO date or timestamp)
    pub t: String,
    /// Cumulative count up to `t`
    pub y: f64,
}

/// Per-country summary from the deaths or confirmed-cases endpoints.
///
/// The deaths summary fills `total`, the confirmed summary fills `this14`
/// and `data`. Both carry `country`, `region` and `population`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct CountrySummary {
    /// Country or world-region name
    pub country: String,
    /// Parent region; `"world"` for world regions, absent for `World` itself
    #[serde(default)]
    pub region: Option<String>,
    /// Total deaths so far
    #[serde(default)]
    pub total: Option<f64>,
    /// Population in the API's unit (count / population / 10 gives per 100k)
    pub population: f64,
    /// Cases over the last 14 days
    #[serde(default)]
    pub this14: Option<f64>,
    /// Cumulative daily series
    #[serde(default)]
    pub data: Vec<SeriesPoint>,
}

impl CountrySummary {
    /// Whether this entry is a world region (Europe, Asia, ...)
    #[must_use]
    pub fn is_world_region(&self) -> bool {
        self.region.as_deref() == Some("world")
    }

    /// Whether this entry is the whole world
    #[must_use]
    pub fn is_world(&self) -> bool {
        self.country.eq_ignore_ascii_case("world")
    }
}

/// One weekly value for a sub-national region.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct WeeklyPoint {
    /// ISO year and week, `YYYYWW`
    #[serde(deserialize_with = "year_week")]
    pub t: String,
    /// New cases per 100k over the 14 days ending that week
    pub v: f64,
}

/// A sub-national region and its weekly series.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SubRegion {
    /// Region name
    pub name: String,
    /// Weekly series, oldest first
    #[serde(default)]
    pub data: Vec<WeeklyPoint>,
}

/// ECDC weekly report for one country.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RegionalReport {
    /// Country name as spelled by ECDC
    pub country: String,
    /// Sub-national regions
    #[serde(default)]
    pub region: Vec<SubRegion>,
}

/// ECDC publishes the week either as `"202045"` or as `202045`.
fn year_week<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected year-week string or number, got {other}"
        ))),
    }
}
