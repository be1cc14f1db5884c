use std::path::PathBuf;

use thiserror::Error;

use crate::output::OutputFormat;

/// Errors raised to callers of the batch API.
///
/// Per-city lookup failures and unknown parameter names are never reported
/// here: they end up as missing cells in the returned table.
#[derive(Debug, Error)]
pub enum AirError {
    #[error("No cities given. Pass at least one city name to look up.")]
    NoCities,

    #[error(
        "Invalid file format '{value}'. Supported formats: {}.",
        OutputFormat::names().join(", ")
    )]
    InvalidOutputFormat { value: String },

    #[error("Failed to serialize table as {format}")]
    Serialize {
        format: OutputFormat,
        #[source]
        source: polars::error::PolarsError,
    },

    #[error("Failed to write output '{}'", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
