//! Billing gateway: unit prices, monthly aggregates and the hourly series

use crate::cache::{CacheCategory, CacheStore};
use crate::error::{Availability, ProviderError};
use crate::models::CostPoint;
use crate::observability::EngineMetrics;
use crate::providers::CloudApi;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::warn;

pub struct BillingGateway {
    api: Arc<dyn CloudApi>,
    cache: CacheStore,
    metrics: EngineMetrics,
    /// Fixed USD to EUR conversion rate, applied in exactly one place
    exchange_rate: f64,
}

impl BillingGateway {
    pub fn new(api: Arc<dyn CloudApi>, cache: CacheStore, exchange_rate: f64) -> Self {
        Self {
            api,
            cache,
            metrics: EngineMetrics::new(),
            exchange_rate,
        }
    }

    /// On-demand hourly price in USD, cached for a week
    pub async fn unit_price(&self, instance_type: &str, region: &str) -> Availability<f64> {
        let key = format!("{}__{}", instance_type, region);

        if let Some(price) = self.cache.read_fresh::<f64>(CacheCategory::Pricing, &key) {
            self.metrics.inc_cache_hits();
            return Availability::Available(price);
        }
        self.metrics.inc_cache_misses();

        match self.api.on_demand_price(instance_type, region).await {
            Ok(Some(price)) if price >= 0.0 => {
                self.cache.write(CacheCategory::Pricing, &key, &price);
                Availability::Available(price)
            }
            Ok(Some(price)) => {
                warn!(instance_type, region, price, "Rejecting negative unit price");
                Availability::Unavailable
            }
            Ok(None) => Availability::Unavailable,
            Err(ProviderError::AuthExpired) => Availability::AuthRequired,
            Err(e) => {
                self.metrics.inc_gateway_failures();
                warn!(instance_type, region, error = %e, "Unit-price lookup failed");
                Availability::Unavailable
            }
        }
    }

    /// Month-to-date aggregate billing cost
    pub async fn monthly_cost(&self) -> Availability<CostPoint> {
        if let Some(point) = self
            .cache
            .read_fresh::<CostPoint>(CacheCategory::CostData, "monthly")
        {
            self.metrics.inc_cache_hits();
            return Availability::Available(point);
        }
        self.metrics.inc_cache_misses();

        match self.api.monthly_cost().await {
            Ok(amount_usd) if amount_usd >= 0.0 => {
                let point = CostPoint::from_usd(Utc::now(), amount_usd, self.exchange_rate);
                self.cache.write(CacheCategory::CostData, "monthly", &point);
                Availability::Available(point)
            }
            Ok(amount_usd) => {
                warn!(amount_usd, "Rejecting negative monthly cost");
                Availability::Unavailable
            }
            Err(ProviderError::AuthExpired) => Availability::AuthRequired,
            Err(e) => {
                self.metrics.inc_gateway_failures();
                warn!(error = %e, "Monthly cost lookup failed");
                Availability::Unavailable
            }
        }
    }

    /// Hourly cost series over a trailing lookback window
    ///
    /// The billing API only answers hour-granularity queries one day at a
    /// time, so the window is split into per-day sub-requests, concatenated,
    /// re-sorted chronologically and clipped to the window (the API has been
    /// observed returning more than asked).
    pub async fn hourly_series(
        &self,
        lookback: Duration,
        now: DateTime<Utc>,
    ) -> Availability<Vec<CostPoint>> {
        if let Some(series) = self
            .cache
            .read_fresh::<Vec<CostPoint>>(CacheCategory::CostSeries, "hourly")
        {
            self.metrics.inc_cache_hits();
            return Availability::Available(series);
        }
        self.metrics.inc_cache_misses();

        let window_start = now - lookback;
        let mut raw = Vec::new();
        let mut failed_days = 0usize;
        let mut day = window_start.date_naive();
        let last_day = now.date_naive();

        while day <= last_day {
            match self.api.hourly_costs(day).await {
                Ok(points) => raw.extend(points),
                Err(ProviderError::AuthExpired) => return Availability::AuthRequired,
                Err(e) => {
                    failed_days += 1;
                    self.metrics.inc_gateway_failures();
                    warn!(day = %day, error = %e, "Hourly cost sub-request failed");
                }
            }
            day = match day.succ_opt() {
                Some(next) => next,
                None => break,
            };
        }

        if raw.is_empty() && failed_days > 0 {
            return Availability::Unavailable;
        }

        raw.sort_by_key(|p| p.timestamp);
        let series: Vec<CostPoint> = raw
            .into_iter()
            .filter(|p| p.timestamp >= window_start)
            .map(|p| CostPoint::from_usd(p.timestamp, p.amount_usd, self.exchange_rate))
            .collect();

        self.cache.write(CacheCategory::CostSeries, "hourly", &series);
        Availability::Available(series)
    }
}
