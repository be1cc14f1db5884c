//! Batch lookups: many cities in, one ordered table out.

use std::{
    panic::AssertUnwindSafe,
    path::{Path, PathBuf},
};

use futures_util::{FutureExt, StreamExt, stream};
use tracing::{debug, info, warn};

use crate::{
    Config,
    error::AirError,
    model::FetchOutcome,
    output::{self, OutputFormat},
    provider::{AirQualityProvider, provider_from_config},
    table::{ColumnSpec, ResultTable, Row},
};

/// Lookups in flight at once unless configured otherwise.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Fetches a list of cities through one provider, a bounded number at a time.
///
/// Every city gets exactly one lookup and exactly one row. A city that fails,
/// for whatever reason, yields a row with only `city` filled in; it never
/// stops or alters the lookups of other cities.
#[derive(Debug)]
pub struct BatchFetcher {
    provider: Box<dyn AirQualityProvider>,
    concurrency: usize,
}

impl BatchFetcher {
    pub fn new(provider: Box<dyn AirQualityProvider>) -> Self {
        Self { provider, concurrency: DEFAULT_CONCURRENCY }
    }

    /// WAQI provider and concurrency taken from `config`.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let provider = provider_from_config(config)?;
        Ok(Self::new(provider).with_concurrency(config.concurrency()))
    }

    /// Values below 1 are treated as 1.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Look up every city and return one row per city, in input order.
    ///
    /// `params` selects the parameter columns verbatim; `None` means
    /// [`crate::table::DEFAULT_PARAMS`].
    ///
    /// # Errors
    ///
    /// [`AirError::NoCities`] if `cities` is empty. Per-city failures are
    /// never errors.
    pub async fn fetch<C, P>(
        &self,
        cities: &[C],
        params: Option<&[P]>,
    ) -> Result<ResultTable, AirError>
    where
        C: AsRef<str>,
        P: AsRef<str>,
    {
        if cities.is_empty() {
            return Err(AirError::NoCities);
        }

        let spec = ColumnSpec::resolve(params);
        debug!(
            cities = cities.len(),
            columns = spec.columns().len(),
            concurrency = self.concurrency,
            "starting batch"
        );

        let provider: &dyn AirQualityProvider = &*self.provider;
        let spec_ref = &spec;

        // `buffered` yields in input order however lookups complete.
        let rows: Vec<Row> = stream::iter(cities.iter().map(|c| c.as_ref()))
            .map(|city| async move {
                let outcome = lookup(provider, city).await;
                spec_ref.normalize(city, &outcome)
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        let table = ResultTable::new(spec, rows);
        info!(rows = table.len(), failed = table.failed_count(), "batch complete");

        Ok(table)
    }

    /// [`fetch`](Self::fetch), then write the table into `dir` as `format`.
    ///
    /// The format name is checked before any lookup is made, so a bad name
    /// costs no requests and touches no files.
    pub async fn fetch_to_file<C, P>(
        &self,
        cities: &[C],
        params: Option<&[P]>,
        format: &str,
        dir: &Path,
    ) -> Result<(ResultTable, PathBuf), AirError>
    where
        C: AsRef<str>,
        P: AsRef<str>,
    {
        let format: OutputFormat = format.parse()?;
        let table = self.fetch(cities, params).await?;
        let path = output::write_table(&table, format, dir)?;

        Ok((table, path))
    }
}

/// One lookup; errors and panics both come back as `Failure`.
async fn lookup(provider: &dyn AirQualityProvider, city: &str) -> FetchOutcome {
    let outcome = AssertUnwindSafe(provider.fetch_outcome(city))
        .catch_unwind()
        .await
        .unwrap_or_else(|_| FetchOutcome::Failure("provider panicked during lookup".to_string()));

    if let FetchOutcome::Failure(reason) = &outcome {
        warn!(%city, %reason, "lookup failed, row left empty");
    }

    outcome
}
