//! API client for communicating with the dashboard daemon

use anyhow::{Context, Result};
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use url::Url;

/// API client for the dashboard daemon
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("API error ({}): {}", status, body);
        }

        response.json().await.context("Failed to parse response")
    }

    /// Fetch the full dashboard snapshot
    pub async fn dashboard(&self) -> Result<Dashboard> {
        self.get("api/v1/dashboard").await
    }

    /// Fetch the aligned cost/carbon series
    pub async fn timeseries(&self) -> Result<Series> {
        self.get("api/v1/timeseries").await
    }

    /// Fetch feed health
    pub async fn health(&self) -> Result<Health> {
        self.get("healthz").await
    }
}

// API response types

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dashboard {
    pub state: String,
    pub refreshed_at: String,
    pub instances: Vec<Instance>,
    pub totals: Totals,
    pub scenarios: Vec<Scenario>,
    pub series: Series,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub carbon: Option<Carbon>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monthly_cost: Option<CostPoint>,
    pub validation_factor: f64,
}

/// One enriched instance row; the descriptor fields arrive flattened
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instance {
    pub id: String,
    pub instance_type: String,
    pub state: String,
    pub region: String,
    #[serde(default)]
    pub launched_at: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub runtime_hours: Option<f64>,
    #[serde(default)]
    pub cpu_utilization_pct: Option<f64>,
    #[serde(default)]
    pub rated_power_watts: Option<f64>,
    #[serde(default)]
    pub effective_power_watts: Option<f64>,
    #[serde(default)]
    pub unit_price_usd: Option<f64>,
    #[serde(default)]
    pub hourly_co2_g: Option<f64>,
    #[serde(default)]
    pub total_co2_kg: Option<f64>,
    #[serde(default)]
    pub cost_usd: Option<f64>,
    #[serde(default)]
    pub cost_eur: Option<f64>,
    pub data_quality: String,
    pub confidence: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Totals {
    pub instance_count: usize,
    pub running_count: usize,
    pub measured_count: usize,
    pub total_runtime_hours: f64,
    pub total_cost_usd: f64,
    pub total_cost_eur: f64,
    pub total_co2_kg: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub spec: ScenarioSpec,
    pub saved_cost_eur: f64,
    pub saved_co2_kg: f64,
    pub projected_cost_eur: f64,
    pub projected_co2_kg: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioSpec {
    pub name: String,
    pub description: String,
    pub savings_fraction: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Series {
    pub points: Vec<SeriesPoint>,
    #[serde(default)]
    pub coverage: Option<f64>,
    pub aligned_hours: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub hour: String,
    pub cost_usd: f64,
    pub co2_g: f64,
    #[serde(default)]
    pub carbon_intensity: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Carbon {
    pub intensity_g_per_kwh: f64,
    pub recorded_at: String,
    pub zone: String,
    pub source: String,
    pub fetched_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostPoint {
    pub timestamp: String,
    pub amount_usd: f64,
    pub amount_eur: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Health {
    pub status: String,
    pub feeds: std::collections::HashMap<String, FeedHealth>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedHealth {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    pub last_check_timestamp: i64,
}
