//! equity-scan: score fundamentals, rank quotes and track the portfolio.
//!
//! Usage:
//!   equity-scan refresh                 # regenerate the four output tables
//!   equity-scan show --pretty           # print the dashboard data as JSON
//!   equity-scan --output-dir out refresh
//!
//! Settings come from the environment (see `.env.example`); flags override paths.

use analysis_orchestrator::{Pipeline, PipelineConfig};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "equity-scan", about = "Equity scoring and portfolio dashboard pipeline")]
struct Cli {
    /// Fundamentals CSV export
    #[arg(long, global = true)]
    fundamentals: Option<PathBuf>,

    /// Portfolio CSV export
    #[arg(long, global = true)]
    portfolio: Option<PathBuf>,

    /// Directory for the output tables
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    /// Ignore POLYGON_API_KEY and build estimates only
    #[arg(long, global = true)]
    offline: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one regeneration and print its report
    Refresh,
    /// Print the dashboard data contract
    Show {
        #[arg(long)]
        pretty: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let mut config = PipelineConfig::from_env().context("loading configuration")?;
    if let Some(path) = cli.fundamentals {
        config.fundamentals_path = path;
    }
    if let Some(path) = cli.portfolio {
        config.portfolio_path = path;
    }
    if let Some(dir) = cli.output_dir {
        config.output_dir = dir;
    }
    if cli.offline {
        config.polygon_api_key = None;
    }

    tracing::info!(
        "equity-scan: fundamentals={}, portfolio={}, outputs={}",
        config.fundamentals_path.display(),
        config.portfolio_path.display(),
        config.output_dir.display()
    );

    let pipeline = Pipeline::from_config(config);

    match cli.command {
        Command::Refresh => {
            let report = pipeline.regenerate().await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Show { pretty } => {
            let data = pipeline.dashboard_data().await;
            let json = if pretty {
                serde_json::to_string_pretty(&data)?
            } else {
                serde_json::to_string(&data)?
            };
            println!("{}", json);
        }
    }

    Ok(())
}

fn init_tracing() {
    let json_logging = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "equity_scan=info,analysis_orchestrator=info,polygon_client=warn".into());

    // Logs go to stderr so stdout stays parseable JSON
    if json_logging {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    }
}
