//! Observability infrastructure for the dashboard engine
//!
//! Provides:
//! - Prometheus metrics (refresh latency, cache traffic, feed failures)
//! - Structured JSON logging with tracing

use prometheus::{register_histogram, register_int_gauge, Histogram, IntGauge};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for refresh latency (in seconds); a full refresh fans
/// out to three remote feeds so the tail stretches well past a second
const REFRESH_BUCKETS: &[f64] = &[0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<EngineMetricsInner> = OnceLock::new();

/// Inner metrics structure that holds the actual Prometheus metrics
struct EngineMetricsInner {
    refresh_latency_seconds: Histogram,
    cache_hits: IntGauge,
    cache_misses: IntGauge,
    gateway_failures: IntGauge,
    stale_fallbacks: IntGauge,
    instances_enriched: IntGauge,
    refreshes_completed: IntGauge,
}

impl EngineMetricsInner {
    fn new() -> Self {
        Self {
            refresh_latency_seconds: register_histogram!(
                "gridcost_refresh_latency_seconds",
                "Time spent running a full dashboard refresh",
                REFRESH_BUCKETS.to_vec()
            )
            .expect("Failed to register refresh_latency_seconds"),

            cache_hits: register_int_gauge!(
                "gridcost_cache_hits_total",
                "Gateway lookups answered from a fresh cache entry"
            )
            .expect("Failed to register cache_hits"),

            cache_misses: register_int_gauge!(
                "gridcost_cache_misses_total",
                "Gateway lookups that had to call a remote feed"
            )
            .expect("Failed to register cache_misses"),

            gateway_failures: register_int_gauge!(
                "gridcost_gateway_failures_total",
                "Remote feed calls that failed and degraded to unavailable"
            )
            .expect("Failed to register gateway_failures"),

            stale_fallbacks: register_int_gauge!(
                "gridcost_stale_fallbacks_total",
                "Carbon readings served from an expired cache entry"
            )
            .expect("Failed to register stale_fallbacks"),

            instances_enriched: register_int_gauge!(
                "gridcost_instances_enriched",
                "Instances carried by the most recent dashboard snapshot"
            )
            .expect("Failed to register instances_enriched"),

            refreshes_completed: register_int_gauge!(
                "gridcost_refreshes_completed_total",
                "Dashboard refresh cycles completed"
            )
            .expect("Failed to register refreshes_completed"),
        }
    }
}

/// Engine metrics for Prometheus exposition
///
/// This is a lightweight handle to the global metrics instance.
/// Multiple clones share the same underlying metrics.
#[derive(Clone)]
pub struct EngineMetrics {
    // This is just a marker - we use the global instance
    _private: (),
}

impl Default for EngineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(EngineMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &EngineMetricsInner {
        GLOBAL_METRICS.get().expect("Metrics not initialized")
    }

    /// Record how long a full dashboard refresh took
    pub fn observe_refresh_latency(&self, duration_secs: f64) {
        self.inner().refresh_latency_seconds.observe(duration_secs);
    }

    pub fn inc_cache_hits(&self) {
        self.inner().cache_hits.inc();
    }

    pub fn inc_cache_misses(&self) {
        self.inner().cache_misses.inc();
    }

    pub fn inc_gateway_failures(&self) {
        self.inner().gateway_failures.inc();
    }

    pub fn inc_stale_fallbacks(&self) {
        self.inner().stale_fallbacks.inc();
    }

    pub fn inc_refreshes_completed(&self) {
        self.inner().refreshes_completed.inc();
    }

    /// Update the instance count carried by the current snapshot
    pub fn set_instances_enriched(&self, count: i64) {
        self.inner().instances_enriched.set(count);
    }
}

/// Structured logger for refresh-cycle events
///
/// Provides consistent JSON-formatted logging for refresh outcomes and
/// feed degradation.
#[derive(Clone)]
pub struct RefreshLogger {
    deployment: String,
}

impl RefreshLogger {
    pub fn new(deployment: impl Into<String>) -> Self {
        Self {
            deployment: deployment.into(),
        }
    }

    /// Log a completed refresh cycle
    pub fn log_refresh(&self, instances: usize, duration_secs: f64, degraded_feeds: &[&str]) {
        if degraded_feeds.is_empty() {
            info!(
                event = "refresh_completed",
                deployment = %self.deployment,
                instances = instances,
                duration_secs = duration_secs,
                "Dashboard refresh completed"
            );
        } else {
            warn!(
                event = "refresh_completed",
                deployment = %self.deployment,
                instances = instances,
                duration_secs = duration_secs,
                degraded_feeds = ?degraded_feeds,
                "Dashboard refresh completed with degraded feeds"
            );
        }
    }

    /// Log a feed falling back or going dark
    pub fn log_feed_degraded(&self, feed: &str, reason: &str) {
        warn!(
            event = "feed_degraded",
            deployment = %self.deployment,
            feed = %feed,
            reason = %reason,
            "Data feed degraded"
        );
    }

    /// Log a feed demanding operator attention for credentials
    pub fn log_auth_required(&self, feed: &str) {
        warn!(
            event = "feed_auth_required",
            deployment = %self.deployment,
            feed = %feed,
            "Data feed credentials expired, operator action required"
        );
    }

    /// Log engine startup
    pub fn log_startup(&self, version: &str) {
        info!(
            event = "engine_started",
            deployment = %self.deployment,
            version = %version,
            "Dashboard engine started"
        );
    }

    /// Log engine shutdown
    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "engine_shutdown",
            deployment = %self.deployment,
            reason = %reason,
            "Dashboard engine shutting down"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_metrics_creation() {
        // Prometheus keeps one global registry per process, so this test
        // exercises the handle rather than asserting registry contents.
        let metrics = EngineMetrics::new();

        metrics.observe_refresh_latency(0.2);
        metrics.inc_cache_hits();
        metrics.inc_cache_misses();
        metrics.inc_gateway_failures();
        metrics.inc_stale_fallbacks();
        metrics.inc_refreshes_completed();
        metrics.set_instances_enriched(3);
    }

    #[test]
    fn test_refresh_logger_creation() {
        let logger = RefreshLogger::new("frankfurt-demo");
        assert_eq!(logger.deployment, "frankfurt-demo");
    }
}
