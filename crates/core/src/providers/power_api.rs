//! HTTP client for the hardware power-model API

use super::PowerApi;
use crate::error::ProviderError;
use crate::models::PowerModel;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// Boavizta-style power-model client
///
/// The endpoint is stateless and its answers are static hardware specs;
/// the power gateway caches them for a week.
pub struct BoaviztaClient {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct PowerResponse {
    avg_power_watts: f64,
    min_power_watts: f64,
    max_power_watts: f64,
}

impl BoaviztaClient {
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl PowerApi for BoaviztaClient {
    async fn power_model(
        &self,
        instance_type: &str,
        location_hint: &str,
    ) -> Result<PowerModel, ProviderError> {
        let url = format!(
            "{}/v1/cloud/instance/power?provider=aws&instance_type={}&usage_location={}",
            self.base_url, instance_type, location_hint
        );

        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Http(status.as_u16()));
        }

        let body: PowerResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Malformed(e.to_string()))?;

        Ok(PowerModel {
            instance_type: instance_type.to_string(),
            avg_watts: body.avg_power_watts,
            min_watts: body.min_power_watts,
            max_watts: body.max_power_watts,
        })
    }
}
