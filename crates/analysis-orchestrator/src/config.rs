use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    // Inputs
    pub fundamentals_path: PathBuf,
    pub portfolio_path: PathBuf,

    // Output tables directory
    pub output_dir: PathBuf,

    // Live quote source; absent key means every run is offline
    pub polygon_api_key: Option<String>,
    pub polygon_rate_limit: usize,   // requests per minute
    pub quote_timeout: Duration,     // per call
    pub batch_deadline: Duration,    // per batch
    pub history_days: i64,           // calendar days, needs ~290 for 200 sessions

    // Table sizes
    pub top_n: usize,
    pub display_rows: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            fundamentals_path: PathBuf::from("fundamentals.csv"),
            portfolio_path: PathBuf::from("portfolio.csv"),
            output_dir: PathBuf::from("outputs"),
            polygon_api_key: None,
            polygon_rate_limit: 500,
            quote_timeout: Duration::from_secs(10),
            batch_deadline: Duration::from_secs(300),
            history_days: 365,
            top_n: 50,
            display_rows: 20,
        }
    }
}

impl PipelineConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key/value source; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let config = Self {
            fundamentals_path: lookup("FUNDAMENTALS_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.fundamentals_path),
            portfolio_path: lookup("PORTFOLIO_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.portfolio_path),
            output_dir: lookup("OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            polygon_api_key: lookup("POLYGON_API_KEY").filter(|k| !k.trim().is_empty()),
            polygon_rate_limit: parse_or(&lookup, "POLYGON_RATE_LIMIT", defaults.polygon_rate_limit)?,
            quote_timeout: Duration::from_secs(parse_or(
                &lookup,
                "QUOTE_TIMEOUT_SECS",
                defaults.quote_timeout.as_secs(),
            )?),
            batch_deadline: Duration::from_secs(parse_or(
                &lookup,
                "BATCH_DEADLINE_SECS",
                defaults.batch_deadline.as_secs(),
            )?),
            history_days: parse_or(&lookup, "HISTORY_DAYS", defaults.history_days)?,
            top_n: parse_or(&lookup, "TOP_N", defaults.top_n)?,
            display_rows: parse_or(&lookup, "DISPLAY_ROWS", defaults.display_rows)?,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.top_n == 0 {
            anyhow::bail!("TOP_N must be at least 1");
        }
        if self.history_days <= 0 {
            anyhow::bail!("HISTORY_DAYS must be positive");
        }
        if self.quote_timeout.is_zero() {
            anyhow::bail!("QUOTE_TIMEOUT_SECS must be positive");
        }
        Ok(())
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid value for {}: {:?}", key, raw)),
        None => Ok(default),
    }
}
