//! Dashboard daemon configuration

use anyhow::Result;
use serde::Deserialize;

/// Daemon configuration, loaded from GRIDCOST_-prefixed environment
/// variables with demo-friendly defaults
#[derive(Debug, Clone, Deserialize)]
pub struct DashboardConfig {
    /// API server port
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Root directory of the on-disk JSON cache
    #[serde(default = "default_cache_root")]
    pub cache_root: String,

    /// Directory holding the cloud-account snapshot files
    #[serde(default = "default_snapshot_dir")]
    pub snapshot_dir: String,

    /// Base URL of the grid carbon-intensity API
    #[serde(default = "default_carbon_api_url")]
    pub carbon_api_url: String,

    /// Auth token for the carbon-intensity API
    #[serde(default)]
    pub carbon_api_token: String,

    /// Base URL of the hardware power-model API
    #[serde(default = "default_power_api_url")]
    pub power_api_url: String,

    /// Audit-log lookback in days
    #[serde(default = "default_audit_lookback_days")]
    pub audit_lookback_days: i64,

    /// Fixed USD to EUR conversion rate
    #[serde(default = "default_exchange_rate")]
    pub exchange_rate: f64,

    /// Record live carbon readings into a self-collected hourly series
    #[serde(default)]
    pub collect_hourly: bool,

    /// Region whose grid intensity headlines the dashboard
    #[serde(default = "default_region")]
    pub default_region: String,

    /// Deployment label attached to structured log events
    #[serde(default = "default_deployment")]
    pub deployment: String,
}

fn default_api_port() -> u16 {
    8080
}

fn default_cache_root() -> String {
    ".gridcost-cache".to_string()
}

fn default_snapshot_dir() -> String {
    "snapshot".to_string()
}

fn default_carbon_api_url() -> String {
    "https://api.electricitymap.org".to_string()
}

fn default_power_api_url() -> String {
    "https://api.boavizta.org".to_string()
}

fn default_audit_lookback_days() -> i64 {
    30
}

fn default_exchange_rate() -> f64 {
    0.92
}

fn default_region() -> String {
    "eu-central-1".to_string()
}

fn default_deployment() -> String {
    "gridcost".to_string()
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            api_port: default_api_port(),
            cache_root: default_cache_root(),
            snapshot_dir: default_snapshot_dir(),
            carbon_api_url: default_carbon_api_url(),
            carbon_api_token: String::new(),
            power_api_url: default_power_api_url(),
            audit_lookback_days: default_audit_lookback_days(),
            exchange_rate: default_exchange_rate(),
            collect_hourly: false,
            default_region: default_region(),
            deployment: default_deployment(),
        }
    }
}

impl DashboardConfig {
    /// Load configuration from the environment
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("GRIDCOST"))
            .build()?;

        Ok(config.try_deserialize().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_demo_ready() {
        let config = DashboardConfig::default();
        assert_eq!(config.api_port, 8080);
        assert_eq!(config.exchange_rate, 0.92);
        assert_eq!(config.default_region, "eu-central-1");
        assert!(!config.collect_hourly);
    }
}
