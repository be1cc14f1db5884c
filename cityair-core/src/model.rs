use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A single value reported for a parameter.
///
/// Providers mostly send numbers, but some fields arrive as text
/// (e.g. an AQI of `"-"` when a station has no current reading).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Number(f64),
    Text(String),
}

impl ParamValue {
    /// Numeric view of the value; text that does not parse gives `None`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Number(v) => Some(*v),
            ParamValue::Text(s) => s.trim().parse().ok(),
        }
    }
}

/// Current measurements for one city as returned by a provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeasurementPayload {
    /// Parameter name (`aqi`, `pm2.5`, `t`, ...) to value.
    pub params: HashMap<String, ParamValue>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Local observation time as reported by the station.
    pub timestamp: Option<String>,
    /// UTC offset of `timestamp`, e.g. `+01:00`.
    pub timestamp_timezone: Option<String>,
    pub dominant_pollutant: Option<String>,
    pub aqi_meaning: Option<String>,
    pub aqi_health_implications: Option<String>,
}

impl MeasurementPayload {
    pub fn param(&self, name: &str) -> Option<&ParamValue> {
        self.params.get(name)
    }
}

/// Result of looking up one city. Never an error: failures are data.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Success(MeasurementPayload),
    Failure(String),
}

impl FetchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, FetchOutcome::Success(_))
    }
}

impl From<anyhow::Result<MeasurementPayload>> for FetchOutcome {
    fn from(res: anyhow::Result<MeasurementPayload>) -> Self {
        match res {
            Ok(payload) => FetchOutcome::Success(payload),
            // `{:#}` keeps the whole context chain on one line.
            Err(e) => FetchOutcome::Failure(format!("{e:#}")),
        }
    }
}
