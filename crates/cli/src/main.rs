//! GridCost CLI
//!
//! A command-line tool for querying the carbon-aware cost dashboard:
//! fleet summaries, per-instance figures, grid intensity and feed health.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{carbon, health, instances, summary, timeseries};

/// GridCost CLI
#[derive(Parser)]
#[command(name = "gridcost")]
#[command(author, version, about = "CLI for the carbon-aware cost dashboard", long_about = None)]
pub struct Cli {
    /// API endpoint URL (can also be set via GRIDCOST_API_URL env var or
    /// the config file)
    #[arg(long, env = "GRIDCOST_API_URL")]
    pub api_url: Option<String>,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    /// Enable verbose output
    #[arg(long, short)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show fleet totals, optimization scenarios and the validation factor
    Summary,

    /// List instances with their cost and emission figures
    Instances {
        /// Filter by region
        #[arg(long, short)]
        region: Option<String>,

        /// Show only running instances
        #[arg(long)]
        running: bool,
    },

    /// Show the current grid carbon intensity
    Carbon,

    /// Show the hourly cost/carbon series
    Timeseries,

    /// Show per-feed health as reported by the daemon
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Flag and env var beat the config file; localhost is the last resort
    let file_config = config::Config::load().unwrap_or_default();
    let api_url = cli
        .api_url
        .or(file_config.api_url)
        .unwrap_or_else(|| "http://localhost:8080".to_string());

    let client = client::ApiClient::new(&api_url)?;

    match cli.command {
        Commands::Summary => {
            summary::show_summary(&client, cli.format).await?;
        }
        Commands::Instances { region, running } => {
            instances::list_instances(&client, region, running, cli.format).await?;
        }
        Commands::Carbon => {
            carbon::show_carbon(&client, cli.format).await?;
        }
        Commands::Timeseries => {
            timeseries::show_timeseries(&client, cli.format).await?;
        }
        Commands::Health => {
            health::show_health(&client, cli.format).await?;
        }
    }

    Ok(())
}
