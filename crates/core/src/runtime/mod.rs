//! Runtime reconstruction from lifecycle audit events
//!
//! Reconstructs how long an instance was actually running within a lookback
//! window from a sparse, unordered bag of start/stop/terminate events, and
//! derives trailing CPU utilization. Both results are cached with their own
//! TTLs: audit events are immutable once recorded, so reconstructed runtime
//! keeps for a day, while CPU utilization keeps for three hours.

mod reconstruct;


pub use reconstruct::{reconstruct_runtime, Reconstruction, ReconstructionInput};

use crate::cache::{CacheCategory, CacheStore};
use crate::error::{Availability, ProviderError};
use crate::models::InstanceDescriptor;
use crate::observability::EngineMetrics;
use crate::providers::CloudApi;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// Cached reconstruction result, kept with its audit trail for debugging
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeRecord {
    pub hours: f64,
    pub computed_at: DateTime<Utc>,
    pub event_count: usize,
}

pub struct RuntimeService {
    api: Arc<dyn CloudApi>,
    cache: CacheStore,
    metrics: EngineMetrics,
    /// Audit-log lookback; retention beyond this simply does not exist
    lookback: Duration,
    /// Trailing window for CPU utilization averaging
    cpu_window: Duration,
}

impl RuntimeService {
    pub fn new(api: Arc<dyn CloudApi>, cache: CacheStore, lookback: Duration) -> Self {
        Self {
            api,
            cache,
            metrics: EngineMetrics::new(),
            lookback,
            cpu_window: Duration::hours(24),
        }
    }

    /// Total hours the instance was running within the lookback window
    ///
    /// "Unavailable" is a first-class answer here: zero events on a stopped
    /// instance means the runtime is unknown, not zero. Zero would falsely
    /// claim "measured and found idle".
    pub async fn runtime_hours(&self, descriptor: &InstanceDescriptor) -> Availability<f64> {
        if let Some(record) = self
            .cache
            .read_fresh::<RuntimeRecord>(CacheCategory::CloudtrailRuntime, &descriptor.id)
        {
            self.metrics.inc_cache_hits();
            return Availability::Available(record.hours);
        }
        self.metrics.inc_cache_misses();

        let now = Utc::now();
        let window_start = now - self.lookback;
        // Pull the query window back to just before launch so the opening
        // start event cannot be missed by an off-by-minutes window edge.
        let query_start = match descriptor.launched_at {
            Some(launch) if launch - Duration::hours(1) < window_start => {
                launch - Duration::hours(1)
            }
            _ => window_start,
        };

        let events = match self
            .api
            .audit_events(&descriptor.region, query_start, now)
            .await
        {
            Ok(events) => events,
            Err(ProviderError::AuthExpired) => return Availability::AuthRequired,
            Err(e) => {
                self.metrics.inc_gateway_failures();
                warn!(instance = %descriptor.id, error = %e, "Audit event lookup failed");
                return Availability::Unavailable;
            }
        };

        let result = reconstruct_runtime(&ReconstructionInput {
            events: &events,
            instance_id: &descriptor.id,
            window_start,
            now,
            launched_at: descriptor.launched_at,
            state: descriptor.state,
        });

        match result.hours {
            Some(hours) => {
                let record = RuntimeRecord {
                    hours,
                    computed_at: now,
                    event_count: result.event_count,
                };
                debug!(
                    instance = %descriptor.id,
                    hours,
                    events = result.event_count,
                    "Reconstructed runtime"
                );
                self.cache
                    .write(CacheCategory::CloudtrailRuntime, &descriptor.id, &record);
                Availability::Available(hours)
            }
            // Unknown runtime is not cached; the next refresh retries
            None => Availability::Unavailable,
        }
    }

    /// Average CPU utilization over the trailing window, in percent
    ///
    /// Zero data points propagate as unavailable. A silently invented
    /// average would bias the power and cost figures downstream.
    pub async fn cpu_utilization(&self, descriptor: &InstanceDescriptor) -> Availability<f64> {
        if let Some(avg) = self
            .cache
            .read_fresh::<f64>(CacheCategory::CpuUtilization, &descriptor.id)
        {
            self.metrics.inc_cache_hits();
            return Availability::Available(avg);
        }
        self.metrics.inc_cache_misses();

        let now = Utc::now();
        let samples = match self
            .api
            .cpu_samples(&descriptor.id, &descriptor.region, now - self.cpu_window, now)
            .await
        {
            Ok(samples) => samples,
            Err(ProviderError::AuthExpired) => return Availability::AuthRequired,
            Err(e) => {
                self.metrics.inc_gateway_failures();
                warn!(instance = %descriptor.id, error = %e, "CPU metric lookup failed");
                return Availability::Unavailable;
            }
        };

        if samples.is_empty() {
            return Availability::Unavailable;
        }

        let avg = samples.iter().sum::<f64>() / samples.len() as f64;
        let avg = (avg * 100.0).round() / 100.0;
        self.cache
            .write(CacheCategory::CpuUtilization, &descriptor.id, &avg);
        Availability::Available(avg)
    }
}
