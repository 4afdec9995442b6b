//! Power-model gateway

use crate::cache::{CacheCategory, CacheStore};
use crate::error::{Availability, ProviderError};
use crate::models::PowerModel;
use crate::observability::EngineMetrics;
use crate::providers::PowerApi;
use std::sync::Arc;
use tracing::warn;

/// Location hint when a region has no country mapping
pub const DEFAULT_LOCATION_HINT: &str = "EEE";

/// Coarse country hint the power API expects alongside the instance type
pub fn location_hint_for_region(region: &str) -> &'static str {
    match region {
        "eu-central-1" => "DEU",
        "eu-west-1" => "IRL",
        "eu-west-2" => "GBR",
        "eu-west-3" => "FRA",
        "eu-north-1" => "SWE",
        "eu-south-1" => "ITA",
        "us-east-1" | "us-east-2" | "us-west-1" | "us-west-2" => "USA",
        _ => DEFAULT_LOCATION_HINT,
    }
}

pub struct PowerGateway {
    api: Arc<dyn PowerApi>,
    cache: CacheStore,
    metrics: EngineMetrics,
}

impl PowerGateway {
    pub fn new(api: Arc<dyn PowerApi>, cache: CacheStore) -> Self {
        Self {
            api,
            cache,
            metrics: EngineMetrics::new(),
        }
    }

    /// Watt curve for an instance type, cached for a week
    ///
    /// A curve with negative or zero average draw is rejected as malformed
    /// rather than fed into the emission math.
    pub async fn model(&self, instance_type: &str, region: &str) -> Availability<PowerModel> {
        if let Some(model) = self
            .cache
            .read_fresh::<PowerModel>(CacheCategory::BoaviztaPower, instance_type)
        {
            self.metrics.inc_cache_hits();
            return Availability::Available(model);
        }
        self.metrics.inc_cache_misses();

        let hint = location_hint_for_region(region);
        match self.api.power_model(instance_type, hint).await {
            Ok(model) if model.avg_watts > 0.0 => {
                self.cache
                    .write(CacheCategory::BoaviztaPower, instance_type, &model);
                Availability::Available(model)
            }
            Ok(model) => {
                self.metrics.inc_gateway_failures();
                warn!(
                    instance_type,
                    avg_watts = model.avg_watts,
                    "Rejecting non-positive power curve"
                );
                Availability::Unavailable
            }
            Err(ProviderError::AuthExpired) => Availability::AuthRequired,
            Err(e) => {
                self.metrics.inc_gateway_failures();
                warn!(instance_type, error = %e, "Power-model lookup failed");
                Availability::Unavailable
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::fake::{FakeFailure, FakePowerApi};

    fn gateway(api: FakePowerApi) -> (tempfile::TempDir, Arc<FakePowerApi>, PowerGateway) {
        let dir = tempfile::tempdir().unwrap();
        let cache = CacheStore::new(dir.path());
        cache.ensure_root().unwrap();
        let api = Arc::new(api);
        let gw = PowerGateway::new(api.clone(), cache);
        (dir, api, gw)
    }

    #[test]
    fn test_location_hints() {
        assert_eq!(location_hint_for_region("eu-central-1"), "DEU");
        assert_eq!(location_hint_for_region("us-west-2"), "USA");
        assert_eq!(location_hint_for_region("sa-east-1"), DEFAULT_LOCATION_HINT);
    }

    #[tokio::test]
    async fn test_model_cached_after_first_fetch() {
        let (_dir, api, gw) = gateway(FakePowerApi::with_model(11.5, 5.2, 21.9));

        let first = gw.model("t3.medium", "eu-central-1").await;
        assert_eq!(first.as_option().unwrap().avg_watts, 11.5);

        let second = gw.model("t3.medium", "eu-central-1").await;
        assert!(second.is_available());
        assert_eq!(api.call_count(), 1);
    }

    #[tokio::test]
    async fn test_failure_is_unavailable_not_invented() {
        let (_dir, _api, gw) = gateway(FakePowerApi {
            failure: Some(FakeFailure::Timeout),
            ..Default::default()
        });

        assert_eq!(
            gw.model("t3.medium", "eu-central-1").await,
            Availability::Unavailable
        );
    }

    #[tokio::test]
    async fn test_negative_watts_rejected() {
        let (_dir, _api, gw) = gateway(FakePowerApi::with_model(-4.0, 0.0, 0.0));

        assert_eq!(
            gw.model("t3.medium", "eu-central-1").await,
            Availability::Unavailable
        );
    }

    #[tokio::test]
    async fn test_auth_failure_propagates() {
        let (_dir, _api, gw) = gateway(FakePowerApi {
            failure: Some(FakeFailure::AuthExpired),
            ..Default::default()
        });

        assert!(gw.model("t3.medium", "eu-central-1").await.is_auth_required());
    }
}
