use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use cityair_core::{
    BatchFetcher, Config, OutputFormat,
    output,
    provider::waqi::WaqiProvider,
    table::DEFAULT_PARAMS,
};
use tracing::debug;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "cityair", version, about = "Current air quality for many cities at once")]
pub struct Cli {
    /// Log filter used when RUST_LOG is not set, e.g. "debug" or "cityair_core=debug".
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the WAQI API token and defaults in the config file.
    Configure {
        /// Token to store; prompted for when absent.
        #[arg(long)]
        token: Option<String>,

        /// Default number of lookups in flight at once.
        #[arg(long)]
        concurrency: Option<usize>,

        /// Default directory for output files.
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },

    /// Look up current air quality for one or more cities.
    Fetch {
        /// City names, passed to the provider as given.
        #[arg(required = true)]
        cities: Vec<String>,

        /// Comma-separated parameter columns, e.g. "aqi,pm2.5,o3".
        #[arg(long, value_delimiter = ',')]
        params: Option<Vec<String>>,

        /// Also write the table to a file: csv, json or parquet.
        #[arg(long)]
        format: Option<String>,

        /// Directory for the output file.
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Lookups in flight at once.
        #[arg(long)]
        concurrency: Option<usize>,

        /// WAQI API token, overriding config and WAQI_TOKEN.
        #[arg(long)]
        token: Option<String>,
    },

    /// List the default parameter columns and supported output formats.
    Params,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure { token, concurrency, output_dir } => {
                configure(token, concurrency, output_dir)
            }
            Command::Fetch { cities, params, format, output_dir, concurrency, token } => {
                fetch(cities, params, format, output_dir, concurrency, token).await
            }
            Command::Params => {
                println!("Default parameters: {}", DEFAULT_PARAMS.join(", "));
                println!("Output formats: {}", OutputFormat::names().join(", "));
                Ok(())
            }
        }
    }
}

fn configure(
    token: Option<String>,
    concurrency: Option<usize>,
    output_dir: Option<PathBuf>,
) -> anyhow::Result<()> {
    let mut config = Config::load()?;

    let token = match token {
        Some(token) => token,
        None => inquire::Password::new("WAQI API token:")
            .without_confirmation()
            .with_help_message("Request one at https://aqicn.org/data-platform/token/")
            .prompt()
            .context("Failed to read API token")?,
    };

    config.token = Some(require_token(&token)?);
    if concurrency.is_some() {
        config.concurrency = concurrency;
    }
    if output_dir.is_some() {
        config.output_dir = output_dir;
    }

    config.save()?;
    println!("Saved configuration to {}", Config::config_file_path()?.display());

    Ok(())
}

async fn fetch(
    cities: Vec<String>,
    params: Option<Vec<String>>,
    format: Option<String>,
    output_dir: Option<PathBuf>,
    concurrency: Option<usize>,
    token: Option<String>,
) -> anyhow::Result<()> {
    // Reject a bad format or blank token before any request goes out.
    let format = format.map(|f| f.parse::<OutputFormat>()).transpose()?;
    let token = token.as_deref().map(require_token).transpose()?;

    let config = Config::load()?;
    let fetcher = match token {
        Some(token) => BatchFetcher::new(Box::new(WaqiProvider::new(token)?)),
        None => BatchFetcher::from_config(&config)?,
    }
    .with_concurrency(concurrency.unwrap_or_else(|| config.concurrency()));
    debug!(concurrency = fetcher.concurrency(), "fetcher ready");

    let params = params.map(clean_params);
    let table = fetcher.fetch(&cities[..], params.as_deref()).await?;
    print!("{table}");

    for row in table.rows() {
        if let Some(reason) = row.failure() {
            eprintln!("No data for '{}': {}", row.city(), reason);
        }
    }

    if let Some(format) = format {
        let dir = output_dir.unwrap_or_else(|| config.output_dir());
        let path = output::write_table(&table, format, &dir)?;
        println!("Wrote {}", path.display());
    }

    Ok(())
}

/// Trimmed `token`, or an error when nothing is left.
fn require_token(token: &str) -> anyhow::Result<String> {
    let token = token.trim();
    if token.is_empty() {
        anyhow::bail!("API token must not be empty");
    }
    Ok(token.to_string())
}

/// Trim each name from `--params` and drop the empty ones, so `"aqi,,o3"`
/// or a trailing comma adds no nameless column.
fn clean_params(params: Vec<String>) -> Vec<String> {
    params
        .into_iter()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_splits_params_on_commas() {
        let cli = Cli::try_parse_from([
            "cityair", "fetch", "london", "new delhi", "--params", "aqi,pm2.5,o3", "--format",
            "csv",
        ])
        .expect("valid args");

        match cli.command {
            Command::Fetch { cities, params, format, .. } => {
                assert_eq!(cities, ["london", "new delhi"]);
                let params = params.expect("params given");
                assert_eq!(params, ["aqi", "pm2.5", "o3"]);
                assert_eq!(format.as_deref(), Some("csv"));
            }
            other => panic!("expected fetch, got {other:?}"),
        }
    }

    #[test]
    fn empty_param_names_are_dropped() {
        let cli = Cli::try_parse_from(["cityair", "fetch", "london", "--params", "aqi,, o3,"])
            .expect("valid args");

        match cli.command {
            Command::Fetch { params, .. } => {
                assert_eq!(clean_params(params.expect("params given")), ["aqi", "o3"]);
            }
            other => panic!("expected fetch, got {other:?}"),
        }
        assert!(clean_params(vec![String::new()]).is_empty());
    }

    #[test]
    fn blank_token_is_rejected() {
        for blank in ["", "   "] {
            let err = require_token(blank).unwrap_err();
            assert!(err.to_string().contains("must not be empty"));
        }
        assert_eq!(require_token(" abc ").expect("token"), "abc");
    }

    #[tokio::test]
    async fn fetch_with_blank_token_fails_before_lookups() {
        let err = fetch(
            vec!["london".to_string()],
            None,
            None,
            None,
            None,
            Some(" ".to_string()),
        )
        .await
        .unwrap_err();

        assert!(err.to_string().contains("must not be empty"));
    }

    #[test]
    fn fetch_requires_a_city() {
        assert!(Cli::try_parse_from(["cityair", "fetch"]).is_err());
    }

    #[test]
    fn log_level_is_global() {
        let cli = Cli::try_parse_from(["cityair", "params", "--log-level", "debug"])
            .expect("valid args");
        assert_eq!(cli.log_level, "debug");
    }
}
