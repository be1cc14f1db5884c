use crate::{Config, FetchOutcome, MeasurementPayload, provider::waqi::WaqiProvider};
use async_trait::async_trait;
use std::fmt::Debug;

pub mod waqi;

/// A source of current air-quality measurements, queried one city at a time.
#[async_trait]
pub trait AirQualityProvider: Send + Sync + Debug {
    async fn get_air_quality(&self, city: &str) -> anyhow::Result<MeasurementPayload>;

    /// Same lookup, with any error folded into [`FetchOutcome::Failure`].
    async fn fetch_outcome(&self, city: &str) -> FetchOutcome {
        self.get_air_quality(city).await.into()
    }
}

/// Construct the WAQI provider from config.
pub fn provider_from_config(config: &Config) -> anyhow::Result<Box<dyn AirQualityProvider>> {
    let token = config.api_token().ok_or_else(|| {
        anyhow::anyhow!(
            "No WAQI API token configured.\n\
                 Hint: run `cityair configure` or set the WAQI_TOKEN environment variable."
        )
    })?;

    let provider = WaqiProvider::new(token)?;
    Ok(Box::new(provider))
}
