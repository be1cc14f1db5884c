//! Core library for the `cityair` CLI.
//!
//! This crate defines:
//! - Batch lookups of current air quality for many cities at once
//! - The result table, with a column per requested parameter
//! - Writing that table as CSV, JSON or Parquet
//! - Configuration & credentials handling
//!
//! It is used by `cityair-cli`, but can also be reused by other binaries or services.

pub mod aqi;
pub mod batch;
pub mod config;
pub mod error;
pub mod model;
pub mod output;
pub mod provider;
pub mod table;

pub use batch::BatchFetcher;
pub use config::Config;
pub use error::AirError;
pub use model::{FetchOutcome, MeasurementPayload, ParamValue};
pub use output::OutputFormat;
pub use provider::AirQualityProvider;
pub use table::{Cell, ColumnSpec, ResultTable, Row};
