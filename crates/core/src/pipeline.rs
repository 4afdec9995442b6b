//! Refresh pipeline: one pass from raw feeds to a renderable snapshot
//!
//! A refresh never fails as a whole. Every feed failure degrades its own
//! slice of the snapshot and the rest proceeds; the all-feeds-down case
//! still yields a renderable (if empty) snapshot.

use crate::aggregate::{
    project_scenarios, summarize, DashboardTotals, ScenarioProjection, ScenarioSpec,
};
use crate::cache::CacheStore;
use crate::enrich::EnrichmentEngine;
use crate::error::{Availability, ProviderError};
use crate::gateway::{BillingGateway, CarbonGateway, PowerGateway};
use crate::health::{feeds, FeedRegistry};
use crate::models::{CarbonSample, CostPoint, EnrichedInstance, InstanceDescriptor};
use crate::observability::{EngineMetrics, RefreshLogger};
use crate::providers::{CarbonApi, CloudApi, PowerApi};
use crate::runtime::RuntimeService;
use crate::timeseries::{
    validation_factor, AlignedSeries, TimeseriesService, ALIGNMENT_WINDOW_HOURS,
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::warn;

/// Engine construction parameters
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub cache_root: PathBuf,
    /// Audit-log lookback; events past its retention are simply gone
    pub audit_lookback_days: i64,
    /// Fixed USD to EUR conversion rate
    pub exchange_rate: f64,
    /// Append live carbon readings to the self-collected hourly series
    pub collect_hourly: bool,
    /// Region used for the headline intensity when the fleet is empty
    pub default_region: String,
    /// Label attached to structured log events
    pub deployment: String,
    pub scenarios: Vec<ScenarioSpec>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache_root: PathBuf::from(".gridcost-cache"),
            audit_lookback_days: 30,
            exchange_rate: 0.92,
            collect_hourly: false,
            default_region: "eu-central-1".to_string(),
            deployment: "gridcost".to_string(),
            scenarios: crate::aggregate::default_scenarios(),
        }
    }
}

/// Overall snapshot state the UI keys its banner off
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DashboardState {
    /// All feeds answered
    Ok,
    /// At least one feed degraded; the snapshot has gaps
    Degraded,
    /// A feed rejected our credentials; re-authentication needed
    AuthRequired,
}

/// One complete, always-renderable dashboard snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardData {
    pub state: DashboardState,
    pub refreshed_at: DateTime<Utc>,
    pub instances: Vec<EnrichedInstance>,
    pub totals: DashboardTotals,
    pub scenarios: Vec<ScenarioProjection>,
    pub series: AlignedSeries,
    /// Headline grid intensity for the deployment's home region
    pub carbon: Option<CarbonSample>,
    pub monthly_cost: Option<CostPoint>,
    /// Aggregate billing over bottom-up estimate; diagnostic only
    pub validation_factor: f64,
}

pub struct DashboardEngine {
    cloud: Arc<dyn CloudApi>,
    carbon: CarbonGateway,
    billing: Arc<BillingGateway>,
    enrichment: EnrichmentEngine,
    timeseries: TimeseriesService,
    registry: FeedRegistry,
    metrics: EngineMetrics,
    logger: RefreshLogger,
    config: EngineConfig,
}

impl DashboardEngine {
    pub fn new(
        cloud: Arc<dyn CloudApi>,
        carbon_api: Arc<dyn CarbonApi>,
        power_api: Arc<dyn PowerApi>,
        config: EngineConfig,
    ) -> anyhow::Result<Self> {
        let cache = CacheStore::new(&config.cache_root);
        cache.ensure_root()?;

        let carbon = CarbonGateway::new(carbon_api, cache.clone(), config.collect_hourly);
        let billing = Arc::new(BillingGateway::new(
            cloud.clone(),
            cache.clone(),
            config.exchange_rate,
        ));
        let power = PowerGateway::new(power_api, cache.clone());
        let runtime = RuntimeService::new(
            cloud.clone(),
            cache.clone(),
            Duration::days(config.audit_lookback_days),
        );
        let enrichment =
            EnrichmentEngine::new(power, billing.clone(), runtime, config.exchange_rate);
        let timeseries = TimeseriesService::new(cache);

        Ok(Self {
            cloud,
            carbon,
            billing,
            enrichment,
            timeseries,
            registry: FeedRegistry::new(),
            metrics: EngineMetrics::new(),
            logger: RefreshLogger::new(config.deployment.clone()),
            config,
        })
    }

    pub fn registry(&self) -> FeedRegistry {
        self.registry.clone()
    }

    /// Run one full refresh and return the snapshot
    pub async fn refresh(&self) -> DashboardData {
        let started = Instant::now();
        let now = Utc::now();

        let listed = self.list_instances().await;
        self.registry
            .record_outcome(feeds::CLOUD_INVENTORY, &listed)
            .await;
        let instances = listed.clone().into_option().unwrap_or_default();

        // One intensity lookup per distinct region, shared across that
        // region's instances
        let mut carbon_by_region: BTreeMap<String, Availability<CarbonSample>> = BTreeMap::new();
        for descriptor in &instances {
            if !carbon_by_region.contains_key(&descriptor.region) {
                let sample = self.carbon.current(&descriptor.region).await;
                carbon_by_region.insert(descriptor.region.clone(), sample);
            }
        }
        let home_region = self.config.default_region.clone();
        if !carbon_by_region.contains_key(&home_region) {
            let sample = self.carbon.current(&home_region).await;
            carbon_by_region.insert(home_region.clone(), sample);
        }
        let headline_carbon = carbon_by_region
            .get(&home_region)
            .cloned()
            .unwrap_or(Availability::Unavailable);
        self.registry
            .record_outcome(feeds::CARBON, &headline_carbon)
            .await;

        let mut enriched: Vec<EnrichedInstance> = Vec::with_capacity(instances.len());
        for descriptor in &instances {
            let carbon = carbon_by_region
                .get(&descriptor.region)
                .cloned()
                .unwrap_or(Availability::Unavailable);
            enriched.push(self.enrichment.enrich(descriptor, &carbon).await);
        }
        // The power feed's health shows through the rows it filled
        let power_outcome = if enriched.is_empty() {
            Availability::Available(())
        } else if enriched.iter().any(|i| i.rated_power_watts.is_some()) {
            Availability::Available(())
        } else {
            self.logger
                .log_feed_degraded(feeds::POWER, "no instance received a power curve");
            Availability::Unavailable
        };
        self.registry
            .record_outcome(feeds::POWER, &power_outcome)
            .await;

        let totals = summarize(&enriched);
        let scenarios = project_scenarios(&totals, &self.config.scenarios);

        let monthly = self.billing.monthly_cost().await;
        let hourly = self
            .billing
            .hourly_series(Duration::hours(ALIGNMENT_WINDOW_HOURS), now)
            .await;
        self.registry.record_outcome(feeds::BILLING, &hourly).await;

        let history = self.carbon.history(&home_region).await;
        let series = match &hourly {
            Availability::Available(points) => self.timeseries.build(
                points,
                history.as_option().map(Vec::as_slice).unwrap_or(&[]),
                totals.total_co2_kg * 1000.0,
                now,
            ),
            // The cost feed is down; the last persisted series beats a
            // blank chart
            _ => self
                .timeseries
                .last_known()
                .unwrap_or_else(AlignedSeries::empty),
        };

        let factor = validation_factor(
            monthly.as_option().map(|p| p.amount_usd),
            Some(totals.total_cost_usd),
        );

        let outcomes_auth = [
            listed.is_auth_required(),
            headline_carbon.is_auth_required(),
            monthly.is_auth_required(),
            hourly.is_auth_required(),
        ];
        let outcomes_missing = [
            !listed.is_available(),
            !headline_carbon.is_available(),
            !monthly.is_available(),
            !hourly.is_available(),
            !power_outcome.is_available(),
        ];
        let state = if outcomes_auth.iter().any(|auth| *auth) {
            self.logger.log_auth_required(feeds::CLOUD_INVENTORY);
            DashboardState::AuthRequired
        } else if outcomes_missing.iter().any(|missing| *missing) {
            DashboardState::Degraded
        } else {
            DashboardState::Ok
        };

        self.registry.set_ready(true).await;

        let elapsed = started.elapsed().as_secs_f64();
        self.metrics.observe_refresh_latency(elapsed);
        self.metrics.set_instances_enriched(enriched.len() as i64);
        self.metrics.inc_refreshes_completed();

        let degraded: Vec<&str> = [
            (feeds::CLOUD_INVENTORY, !listed.is_available()),
            (feeds::CARBON, !headline_carbon.is_available()),
            (feeds::BILLING, !hourly.is_available()),
        ]
        .iter()
        .filter(|(_, down)| *down)
        .map(|(name, _)| *name)
        .collect();
        self.logger.log_refresh(enriched.len(), elapsed, &degraded);

        DashboardData {
            state,
            refreshed_at: now,
            instances: enriched,
            totals,
            scenarios,
            series,
            carbon: headline_carbon.into_option(),
            monthly_cost: monthly.into_option(),
            validation_factor: factor,
        }
    }

    async fn list_instances(&self) -> Availability<Vec<InstanceDescriptor>> {
        match self.cloud.list_instances().await {
            Ok(instances) => Availability::Available(instances),
            Err(ProviderError::AuthExpired) => Availability::AuthRequired,
            Err(e) => {
                self.metrics.inc_gateway_failures();
                warn!(error = %e, "Instance listing failed");
                Availability::Unavailable
            }
        }
    }
}
