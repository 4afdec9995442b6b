//! HTTP client for the grid carbon-intensity API

use super::{CarbonApi, RawIntensity};
use crate::error::ProviderError;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

/// Default request timeout; a hanging feed stalls the whole refresh, so
/// every call is bounded.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// ElectricityMaps-style carbon-intensity client
///
/// Zone identifiers here are grid zones ("DE", "SE-SE3", ...); the carbon
/// gateway owns the cloud-region translation.
pub struct ElectricityMapsClient {
    client: Client,
    base_url: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct LatestResponse {
    #[serde(rename = "carbonIntensity")]
    carbon_intensity: f64,
    datetime: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct HistoryResponse {
    history: Vec<LatestResponse>,
}

impl ElectricityMapsClient {
    pub fn new(base_url: &str, token: &str) -> Result<Self> {
        Self::with_timeout(base_url, token, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, token: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        zone: &str,
    ) -> Result<T, ProviderError> {
        let url = format!("{}{}?zone={}", self.base_url, path, zone);

        let response = self
            .client
            .get(&url)
            .header("auth-token", &self.token)
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(ProviderError::AuthExpired);
        }
        if !status.is_success() {
            return Err(ProviderError::Http(status.as_u16()));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ProviderError::Malformed(e.to_string()))
    }
}

#[async_trait]
impl CarbonApi for ElectricityMapsClient {
    async fn current_intensity(&self, zone: &str) -> Result<RawIntensity, ProviderError> {
        let body: LatestResponse = self.get_json("/v3/carbon-intensity/latest", zone).await?;

        Ok(RawIntensity {
            intensity_g_per_kwh: body.carbon_intensity,
            recorded_at: body.datetime,
        })
    }

    async fn history_24h(&self, zone: &str) -> Result<Vec<RawIntensity>, ProviderError> {
        let body: HistoryResponse = self.get_json("/v3/carbon-intensity/history", zone).await?;

        Ok(body
            .history
            .into_iter()
            .map(|h| RawIntensity {
                intensity_g_per_kwh: h.carbon_intensity,
                recorded_at: h.datetime,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_current_intensity_parses_response() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/v3/carbon-intensity/latest")
            .match_query(mockito::Matcher::UrlEncoded("zone".into(), "DE".into()))
            .match_header("auth-token", "test-token")
            .with_status(200)
            .with_body(r#"{"carbonIntensity": 312.0, "datetime": "2024-03-01T10:00:00Z"}"#)
            .create_async()
            .await;

        let client = ElectricityMapsClient::new(&server.url(), "test-token").unwrap();
        let sample = client.current_intensity("DE").await.unwrap();

        assert_eq!(sample.intensity_g_per_kwh, 312.0);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_unauthorized_maps_to_auth_expired() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v3/carbon-intensity/latest")
            .match_query(mockito::Matcher::Any)
            .with_status(401)
            .create_async()
            .await;

        let client = ElectricityMapsClient::new(&server.url(), "bad-token").unwrap();
        let err = client.current_intensity("DE").await.unwrap_err();

        assert!(matches!(err, ProviderError::AuthExpired));
    }

    #[tokio::test]
    async fn test_server_error_maps_to_http() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v3/carbon-intensity/latest")
            .match_query(mockito::Matcher::Any)
            .with_status(503)
            .create_async()
            .await;

        let client = ElectricityMapsClient::new(&server.url(), "t").unwrap();
        let err = client.current_intensity("DE").await.unwrap_err();

        assert!(matches!(err, ProviderError::Http(503)));
    }

    #[tokio::test]
    async fn test_malformed_body_maps_to_malformed() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v3/carbon-intensity/history")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(r#"{"unexpected": true}"#)
            .create_async()
            .await;

        let client = ElectricityMapsClient::new(&server.url(), "t").unwrap();
        let err = client.history_24h("DE").await.unwrap_err();

        assert!(matches!(err, ProviderError::Malformed(_)));
    }
}
