//! GridCost dashboard daemon
//!
//! Serves per-instance cost and CO2 figures over HTTP, combining a cloud
//! account snapshot with the grid carbon-intensity and hardware power
//! model feeds.

use anyhow::{Context, Result};
use gridcost_core::providers::{BoaviztaClient, ElectricityMapsClient, SnapshotCloudApi};
use gridcost_core::{default_scenarios, DashboardEngine, EngineConfig, RefreshLogger};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod api;
mod config;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting gridcost-dashboard");

    let config = config::DashboardConfig::load()?;
    info!(deployment = %config.deployment, port = config.api_port, "Dashboard configured");

    let cloud = Arc::new(SnapshotCloudApi::new(&config.snapshot_dir));
    let carbon = Arc::new(
        ElectricityMapsClient::new(&config.carbon_api_url, &config.carbon_api_token)
            .context("Failed to build carbon-intensity client")?,
    );
    let power = Arc::new(
        BoaviztaClient::new(&config.power_api_url)
            .context("Failed to build power-model client")?,
    );

    let engine = DashboardEngine::new(
        cloud,
        carbon,
        power,
        EngineConfig {
            cache_root: PathBuf::from(&config.cache_root),
            audit_lookback_days: config.audit_lookback_days,
            exchange_rate: config.exchange_rate,
            collect_hourly: config.collect_hourly,
            default_region: config.default_region.clone(),
            deployment: config.deployment.clone(),
            scenarios: default_scenarios(),
        },
    )
    .context("Failed to build dashboard engine")?;

    let logger = RefreshLogger::new(config.deployment.clone());
    logger.log_startup(VERSION);

    let app_state = Arc::new(api::AppState::new(Arc::new(engine)));
    let api_handle = tokio::spawn(api::serve(config.api_port, app_state));

    // Wait for shutdown signal
    tokio::select! {
        result = api_handle => {
            result.context("API server task panicked")??;
        }
        signal = tokio::signal::ctrl_c() => {
            signal?;
            logger.log_shutdown("SIGINT received");
            info!("Shutting down");
        }
    }

    Ok(())
}
