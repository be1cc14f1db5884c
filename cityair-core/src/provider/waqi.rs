use std::{collections::HashMap, time::Duration};

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::debug;

use crate::{
    aqi::AqiCategory,
    model::{MeasurementPayload, ParamValue},
};

use super::AirQualityProvider;

pub const DEFAULT_BASE_URL: &str = "https://api.waqi.info";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for the World Air Quality Index city feed (`/feed/<city>/`).
#[derive(Debug, Clone)]
pub struct WaqiProvider {
    token: String,
    base_url: String,
    http: Client,
}

impl WaqiProvider {
    pub fn new(token: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client for WAQI")?;

        Ok(Self { token: token.into(), base_url: DEFAULT_BASE_URL.to_string(), http })
    }

    /// Point the client at another host, e.g. a local mock server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// `<base>/feed/<city>/`, with the city percent-encoded as one path segment.
    fn feed_url(&self, city: &str) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .with_context(|| format!("Invalid WAQI base URL '{}'", self.base_url))?;

        url.path_segments_mut()
            .map_err(|_| anyhow!("WAQI base URL '{}' cannot carry a path", self.base_url))?
            .pop_if_empty()
            .push("feed")
            .push(city)
            .push("");

        Ok(url)
    }
}

#[async_trait]
impl AirQualityProvider for WaqiProvider {
    async fn get_air_quality(&self, city: &str) -> Result<MeasurementPayload> {
        let url = self.feed_url(city)?;
        debug!(%city, "requesting WAQI feed");

        let res = self
            .http
            .get(url)
            .query(&[("token", self.token.as_str())])
            .send()
            .await
            .with_context(|| format!("Failed to send request to WAQI for '{city}'"))?;

        let status = res.status();
        let body = res.text().await.context("Failed to read WAQI response body")?;

        if !status.is_success() {
            return Err(anyhow!(
                "WAQI request for '{}' failed with status {}: {}",
                city,
                status,
                truncate_body(&body),
            ));
        }

        parse_feed(&body).with_context(|| format!("WAQI lookup for '{city}' failed"))
    }
}

#[derive(Debug, Deserialize)]
struct FeedResponse {
    status: String,
    data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct FeedData {
    aqi: Option<ParamValue>,
    city: Option<FeedCity>,
    dominentpol: Option<String>,
    iaqi: Option<HashMap<String, Option<FeedReading>>>,
    time: Option<FeedTime>,
}

#[derive(Debug, Deserialize)]
struct FeedCity {
    geo: Option<Vec<Option<ParamValue>>>,
}

#[derive(Debug, Deserialize)]
struct FeedReading {
    v: Option<ParamValue>,
}

#[derive(Debug, Deserialize)]
struct FeedTime {
    s: Option<String>,
    tz: Option<String>,
}

/// Parse a `/feed/` response body into a payload.
///
/// `"status": "error"` replies (e.g. `"Unknown station"`) are errors. Null
/// readings or coordinates are left out of the payload, not errors.
pub fn parse_feed(body: &str) -> Result<MeasurementPayload> {
    let res: FeedResponse =
        serde_json::from_str(body).context("Failed to parse WAQI feed JSON")?;

    if res.status != "ok" {
        let reason = match &res.data {
            serde_json::Value::String(msg) => msg.clone(),
            other => other.to_string(),
        };
        return Err(anyhow!("WAQI returned status '{}': {}", res.status, reason));
    }

    let data: FeedData =
        serde_json::from_value(res.data).context("Unexpected WAQI feed data layout")?;

    let mut params: HashMap<String, ParamValue> = data
        .iaqi
        .unwrap_or_default()
        .into_iter()
        .filter_map(|(name, reading)| Some((canonical_param(&name), reading?.v?)))
        .collect();

    let category = data.aqi.as_ref().and_then(ParamValue::as_f64).and_then(AqiCategory::from_aqi);
    if let Some(aqi) = data.aqi {
        params.insert("aqi".to_string(), aqi);
    }

    let geo = data.city.and_then(|c| c.geo).unwrap_or_default();
    let coord = |idx: usize| geo.get(idx).and_then(Option::as_ref).and_then(ParamValue::as_f64);
    let (time_s, time_tz) = data.time.map(|t| (t.s, t.tz)).unwrap_or_default();

    Ok(MeasurementPayload {
        params,
        latitude: coord(0),
        longitude: coord(1),
        timestamp: time_s,
        timestamp_timezone: time_tz,
        dominant_pollutant: data
            .dominentpol
            .filter(|p| !p.trim().is_empty())
            .map(|p| canonical_param(&p)),
        aqi_meaning: category.map(|c| c.meaning().to_string()),
        aqi_health_implications: category.map(|c| c.health_implications().to_string()),
    })
}

/// WAQI spells PM2.5 as `pm25`; everything else keeps its provider name.
fn canonical_param(name: &str) -> String {
    match name {
        "pm25" => "pm2.5".to_string(),
        other => other.to_string(),
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LONDON: &str = r#"{
        "status": "ok",
        "data": {
            "aqi": 42,
            "idx": 5724,
            "city": { "geo": [51.5073509, -0.1277583], "name": "London" },
            "dominentpol": "pm25",
            "iaqi": {
                "co": { "v": 0.1 },
                "h": { "v": 87 },
                "no2": { "v": 12.3 },
                "pm25": { "v": 42 },
                "t": { "v": 9.5 }
            },
            "time": { "s": "2024-01-15 14:00:00", "tz": "+00:00", "v": 1705327200 }
        }
    }"#;

    #[test]
    fn parses_ok_feed() {
        let payload = parse_feed(LONDON).expect("valid feed");

        assert_eq!(payload.param("aqi"), Some(&ParamValue::Number(42.0)));
        assert_eq!(payload.param("pm2.5"), Some(&ParamValue::Number(42.0)));
        assert_eq!(payload.param("pm25"), None);
        assert_eq!(payload.param("t"), Some(&ParamValue::Number(9.5)));
        assert_eq!(payload.latitude, Some(51.5073509));
        assert_eq!(payload.longitude, Some(-0.1277583));
        assert_eq!(payload.timestamp.as_deref(), Some("2024-01-15 14:00:00"));
        assert_eq!(payload.timestamp_timezone.as_deref(), Some("+00:00"));
        assert_eq!(payload.dominant_pollutant.as_deref(), Some("pm2.5"));
        assert_eq!(payload.aqi_meaning.as_deref(), Some("Good"));
        assert!(payload.aqi_health_implications.is_some());
    }

    #[test]
    fn error_status_is_an_error() {
        let err = parse_feed(r#"{"status":"error","data":"Unknown station"}"#).unwrap_err();
        assert!(err.to_string().contains("Unknown station"));
    }

    #[test]
    fn dash_aqi_has_no_category() {
        let body = r#"{"status":"ok","data":{"aqi":"-","iaqi":{},"dominentpol":""}}"#;
        let payload = parse_feed(body).expect("valid feed");

        assert_eq!(payload.param("aqi"), Some(&ParamValue::Text("-".into())));
        assert_eq!(payload.aqi_meaning, None);
        assert_eq!(payload.dominant_pollutant, None);
        assert_eq!(payload.latitude, None);
    }

    #[test]
    fn null_readings_only_blank_their_own_values() {
        let body = r#"{"status":"ok","data":{
            "aqi":42,"city":{"geo":null,"name":"London"},"dominentpol":"pm25",
            "iaqi":{"pm25":{"v":42},"wg":{"v":null},"h":null}}}"#;
        let payload = parse_feed(body).expect("nulls are tolerated");

        assert_eq!(payload.param("pm2.5"), Some(&ParamValue::Number(42.0)));
        assert_eq!(payload.param("wg"), None);
        assert_eq!(payload.param("h"), None);
        assert_eq!(payload.latitude, None);
        assert_eq!(payload.longitude, None);
        assert_eq!(payload.aqi_meaning.as_deref(), Some("Good"));
    }

    #[test]
    fn null_coordinate_keeps_the_other_one() {
        let body = r#"{"status":"ok","data":{"aqi":10,"city":{"geo":[null,2.35]},"iaqi":null}}"#;
        let payload = parse_feed(body).expect("valid feed");

        assert_eq!(payload.latitude, None);
        assert_eq!(payload.longitude, Some(2.35));
        assert_eq!(payload.params.len(), 1);
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(parse_feed("<html>busy</html>").is_err());
    }

    #[test]
    fn feed_url_encodes_city_as_one_segment() {
        let provider = WaqiProvider::new("KEY").expect("client");
        let url = provider.feed_url("new delhi").expect("url");
        assert_eq!(url.as_str(), "https://api.waqi.info/feed/new%20delhi/");

        let url = provider.feed_url("a/b").expect("url");
        assert_eq!(url.as_str(), "https://api.waqi.info/feed/a%2Fb/");
    }

    #[test]
    fn truncate_body_respects_char_boundaries() {
        let long = "é".repeat(300);
        let out = truncate_body(&long);
        assert!(out.ends_with("..."));
        assert_eq!(out.chars().count(), 203);
        assert_eq!(truncate_body("short"), "short");
    }
}
