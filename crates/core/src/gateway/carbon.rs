//! Carbon-intensity gateway with tagged stale fallback and self-collection

use crate::cache::{CacheCategory, CacheStore};
use crate::error::{Availability, ProviderError};
use crate::models::{CarbonSample, CarbonSource};
use crate::observability::EngineMetrics;
use crate::providers::{CarbonApi, RawIntensity};
use chrono::{Timelike, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Zone used when a cloud region has no grid-zone mapping
///
/// The demo deployment is Frankfurt-homed, so the German grid is the
/// documented default rather than an error.
pub const DEFAULT_ZONE: &str = "DE";

/// Samples kept in the self-collected hourly series
const COLLECTED_RETENTION: usize = 24;

/// Translate a cloud region into the grid operator's zone identifier
///
/// The remote API must never see a raw cloud region string; unmapped
/// regions fall back to [`DEFAULT_ZONE`].
pub fn zone_for_region(region: &str) -> &'static str {
    match region {
        "eu-central-1" => "DE",
        "eu-west-1" => "IE",
        "eu-west-2" => "GB",
        "eu-west-3" => "FR",
        "eu-north-1" => "SE-SE3",
        "eu-south-1" => "IT-NO",
        "us-east-1" => "US-MIDA-PJM",
        "us-west-2" => "US-NW-PACW",
        _ => DEFAULT_ZONE,
    }
}

pub struct CarbonGateway {
    api: Arc<dyn CarbonApi>,
    cache: CacheStore,
    metrics: EngineMetrics,
    /// Feature flag: append live readings to the self-collected hourly series
    collect_hourly: bool,
}

impl CarbonGateway {
    pub fn new(api: Arc<dyn CarbonApi>, cache: CacheStore, collect_hourly: bool) -> Self {
        Self {
            api,
            cache,
            metrics: EngineMetrics::new(),
            collect_hourly,
        }
    }

    /// Current grid intensity for a cloud region
    ///
    /// Live-call failure with an existing (expired) cache entry re-serves
    /// that entry tagged [`CarbonSource::StaleCache`]; with no cache entry
    /// the answer is `Unavailable`. A synthetic reading is never produced.
    pub async fn current(&self, region: &str) -> Availability<CarbonSample> {
        let zone = zone_for_region(region);

        if let Some(sample) = self
            .cache
            .read_fresh::<CarbonSample>(CacheCategory::CarbonIntensity, zone)
        {
            self.metrics.inc_cache_hits();
            return Availability::Available(sample);
        }
        self.metrics.inc_cache_misses();

        match self.api.current_intensity(zone).await {
            Ok(raw) => {
                let sample = self.sample_from_raw(raw, zone, CarbonSource::Live);
                self.cache
                    .write(CacheCategory::CarbonIntensity, zone, &sample);
                if self.collect_hourly {
                    self.record_hourly(&sample, zone);
                }
                Availability::Available(sample)
            }
            Err(ProviderError::AuthExpired) => Availability::AuthRequired,
            Err(e) => {
                self.metrics.inc_gateway_failures();
                warn!(zone, error = %e, "Live carbon-intensity lookup failed");
                self.stale_fallback(zone)
            }
        }
    }

    /// 24h intensity history for a cloud region
    ///
    /// History is immutable once past, so it caches for a full day. When the
    /// API fails and self-collection is enabled, the collected hourly series
    /// stands in, tagged [`CarbonSource::SelfCollected`].
    pub async fn history(&self, region: &str) -> Availability<Vec<CarbonSample>> {
        let zone = zone_for_region(region);

        if let Some(samples) = self
            .cache
            .read_fresh::<Vec<CarbonSample>>(CacheCategory::CarbonIntensity24h, zone)
        {
            self.metrics.inc_cache_hits();
            return Availability::Available(samples);
        }
        self.metrics.inc_cache_misses();

        match self.api.history_24h(zone).await {
            Ok(raw) => {
                let samples: Vec<CarbonSample> = raw
                    .into_iter()
                    .map(|r| self.sample_from_raw(r, zone, CarbonSource::Live))
                    .collect();
                self.cache
                    .write(CacheCategory::CarbonIntensity24h, zone, &samples);
                Availability::Available(samples)
            }
            Err(ProviderError::AuthExpired) => Availability::AuthRequired,
            Err(e) => {
                self.metrics.inc_gateway_failures();
                warn!(zone, error = %e, "Carbon-intensity history lookup failed");
                self.collected_fallback(zone)
            }
        }
    }

    fn sample_from_raw(&self, raw: RawIntensity, zone: &str, source: CarbonSource) -> CarbonSample {
        CarbonSample {
            intensity_g_per_kwh: raw.intensity_g_per_kwh,
            recorded_at: raw.recorded_at,
            zone: zone.to_string(),
            source,
            fetched_at: Utc::now(),
        }
    }

    fn stale_fallback(&self, zone: &str) -> Availability<CarbonSample> {
        match self
            .cache
            .read_any::<CarbonSample>(CacheCategory::CarbonIntensity, zone)
        {
            Some(mut sample) => {
                sample.source = CarbonSource::StaleCache;
                self.metrics.inc_stale_fallbacks();
                info!(
                    zone,
                    recorded_at = %sample.recorded_at,
                    "Serving expired carbon-intensity cache entry"
                );
                Availability::Available(sample)
            }
            None => Availability::Unavailable,
        }
    }

    fn collected_fallback(&self, zone: &str) -> Availability<Vec<CarbonSample>> {
        if !self.collect_hourly {
            return Availability::Unavailable;
        }
        match self
            .cache
            .read_any::<Vec<CarbonSample>>(CacheCategory::HourlyCollection, zone)
        {
            Some(samples) if !samples.is_empty() => {
                info!(zone, count = samples.len(), "Serving self-collected intensity history");
                Availability::Available(samples)
            }
            _ => Availability::Unavailable,
        }
    }

    /// Append a live reading to the self-collected series, one per hour
    fn record_hourly(&self, sample: &CarbonSample, zone: &str) {
        let mut collected: Vec<CarbonSample> = self
            .cache
            .read_any(CacheCategory::HourlyCollection, zone)
            .unwrap_or_default();

        let hour_key = |s: &CarbonSample| (s.recorded_at.date_naive(), s.recorded_at.hour());
        if collected.iter().any(|s| hour_key(s) == hour_key(sample)) {
            return;
        }

        let mut recorded = sample.clone();
        recorded.source = CarbonSource::SelfCollected;
        collected.push(recorded);
        if collected.len() > COLLECTED_RETENTION {
            let excess = collected.len() - COLLECTED_RETENTION;
            collected.drain(..excess);
        }

        debug!(zone, count = collected.len(), "Recorded hourly intensity sample");
        self.cache
            .write(CacheCategory::HourlyCollection, zone, &collected);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::fake::{FakeCarbonApi, FakeFailure};
    use chrono::TimeZone;

    fn gateway(api: FakeCarbonApi, collect: bool) -> (tempfile::TempDir, Arc<FakeCarbonApi>, CarbonGateway) {
        let dir = tempfile::tempdir().unwrap();
        let cache = CacheStore::new(dir.path());
        cache.ensure_root().unwrap();
        let api = Arc::new(api);
        let gw = CarbonGateway::new(api.clone(), cache, collect);
        (dir, api, gw)
    }

    #[test]
    fn test_zone_mapping_with_default() {
        assert_eq!(zone_for_region("eu-central-1"), "DE");
        assert_eq!(zone_for_region("eu-north-1"), "SE-SE3");
        assert_eq!(zone_for_region("ap-southeast-9"), DEFAULT_ZONE);
    }

    #[tokio::test]
    async fn test_live_reading_is_cached_and_tagged_live() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
        let (_dir, api, gw) = gateway(FakeCarbonApi::with_current(250.0, now), false);

        let first = gw.current("eu-central-1").await;
        let sample = first.as_option().expect("live sample");
        assert_eq!(sample.intensity_g_per_kwh, 250.0);
        assert_eq!(sample.source, CarbonSource::Live);

        // Second lookup is served from cache without touching the API
        let second = gw.current("eu-central-1").await;
        assert!(second.is_available());
        assert_eq!(api.call_count(), 1);
    }

    #[tokio::test]
    async fn test_failure_without_cache_is_unavailable() {
        let (_dir, _api, gw) = gateway(FakeCarbonApi::failing(FakeFailure::Timeout), false);

        // No-fallback guarantee: no cache entry, no invented number
        assert_eq!(gw.current("eu-central-1").await, Availability::Unavailable);
    }

    #[tokio::test]
    async fn test_failure_with_expired_cache_serves_tagged_stale() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CacheStore::new(dir.path());
        cache.ensure_root().unwrap();

        // Seed a cache entry, then force it to look expired by backdating mtime
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
        let seeded = CarbonSample {
            intensity_g_per_kwh: 300.0,
            recorded_at: now,
            zone: "DE".to_string(),
            source: CarbonSource::Live,
            fetched_at: now,
        };
        cache.write(CacheCategory::CarbonIntensity, "DE", &seeded);
        let path = cache.path(CacheCategory::CarbonIntensity, "DE");
        let stale_mtime = std::time::SystemTime::now() - std::time::Duration::from_secs(7200);
        let file = std::fs::File::options().append(true).open(&path).unwrap();
        file.set_modified(stale_mtime).unwrap();
        assert!(!cache.is_fresh(CacheCategory::CarbonIntensity, "DE"));

        let api = Arc::new(FakeCarbonApi::failing(FakeFailure::Timeout));
        let gw = CarbonGateway::new(api, cache, false);

        let result = gw.current("eu-central-1").await;
        let sample = result.as_option().expect("stale sample");
        assert_eq!(sample.intensity_g_per_kwh, 300.0);
        assert_eq!(sample.source, CarbonSource::StaleCache);
    }

    #[tokio::test]
    async fn test_auth_failure_propagates() {
        let (_dir, _api, gw) = gateway(FakeCarbonApi::failing(FakeFailure::AuthExpired), false);
        assert!(gw.current("eu-central-1").await.is_auth_required());
        assert!(gw.history("eu-central-1").await.is_auth_required());
    }

    #[tokio::test]
    async fn test_hourly_collection_dedupes_per_hour() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 10, 15, 0).unwrap();
        let (_dir, _api, gw) = gateway(FakeCarbonApi::with_current(250.0, now), true);

        // Two fetches within the same hour record one collected sample.
        // The second current() is a cache hit, so force the record path
        // directly the way the gateway does on a live fetch.
        let result = gw.current("eu-central-1").await;
        let sample = result.as_option().unwrap().clone();
        gw.record_hourly(&sample, "DE");

        let collected: Vec<CarbonSample> = gw
            .cache
            .read_any(CacheCategory::HourlyCollection, "DE")
            .unwrap();
        assert_eq!(collected.len(), 1);
        assert_eq!(collected[0].source, CarbonSource::SelfCollected);
    }

    #[tokio::test]
    async fn test_history_failure_falls_back_to_collected() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
        let mut api = FakeCarbonApi::with_current(250.0, now);
        api.history = vec![]; // history endpoint fails with 404
        let (_dir, _api, gw) = gateway(api, true);

        // Populate the collected series via a live current() fetch
        assert!(gw.current("eu-central-1").await.is_available());

        let history = gw.history("eu-central-1").await;
        let samples = history.as_option().expect("collected history");
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].source, CarbonSource::SelfCollected);
    }

    #[tokio::test]
    async fn test_history_failure_without_collector_is_unavailable() {
        let (_dir, _api, gw) = gateway(FakeCarbonApi::failing(FakeFailure::Timeout), false);
        assert_eq!(gw.history("eu-central-1").await, Availability::Unavailable);
    }
}
