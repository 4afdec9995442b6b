//! Interface boundary to the three external collaborators
//!
//! The core treats the cloud provider, the grid carbon-intensity API and the
//! hardware power-model API as opaque blocking calls with bounded timeouts.
//! Only the contracts below matter to the engine; request construction and
//! auth live in the concrete clients.

mod carbon_api;
mod power_api;
mod snapshot;

#[cfg(test)]
pub(crate) mod fake;

pub use carbon_api::ElectricityMapsClient;
pub use power_api::BoaviztaClient;
pub use snapshot::SnapshotCloudApi;

use crate::error::ProviderError;
use crate::models::{AuditEvent, InstanceDescriptor, PowerModel};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

pub use async_trait::async_trait;

/// A cost figure as returned by the billing API, USD-native
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawCostPoint {
    pub timestamp: DateTime<Utc>,
    pub amount_usd: f64,
}

/// An intensity reading as returned by the carbon API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawIntensity {
    pub intensity_g_per_kwh: f64,
    pub recorded_at: DateTime<Utc>,
}

/// Cloud provider compute/billing API
///
/// The hourly cost endpoint accepts a single day per call; the billing
/// gateway owns the day-splitting.
#[async_trait]
pub trait CloudApi: Send + Sync {
    /// List instances with their current lifecycle state
    async fn list_instances(&self) -> Result<Vec<InstanceDescriptor>, ProviderError>;

    /// Lifecycle audit events within a time range, unfiltered and unordered
    async fn audit_events(
        &self,
        region: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<AuditEvent>, ProviderError>;

    /// Hourly CPU utilization samples (percent) for one instance
    async fn cpu_samples(
        &self,
        instance_id: &str,
        region: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<f64>, ProviderError>;

    /// On-demand hourly price in USD, `None` if the catalog has no entry
    async fn on_demand_price(
        &self,
        instance_type: &str,
        region: &str,
    ) -> Result<Option<f64>, ProviderError>;

    /// Month-to-date aggregate cost in USD
    async fn monthly_cost(&self) -> Result<f64, ProviderError>;

    /// Hourly cost points for a single day
    async fn hourly_costs(&self, day: NaiveDate) -> Result<Vec<RawCostPoint>, ProviderError>;
}

/// Grid carbon-intensity API, keyed by grid zone (not cloud region)
#[async_trait]
pub trait CarbonApi: Send + Sync {
    async fn current_intensity(&self, zone: &str) -> Result<RawIntensity, ProviderError>;

    async fn history_24h(&self, zone: &str) -> Result<Vec<RawIntensity>, ProviderError>;
}

/// Hardware power-model API, stateless and cacheable for days
#[async_trait]
pub trait PowerApi: Send + Sync {
    async fn power_model(
        &self,
        instance_type: &str,
        location_hint: &str,
    ) -> Result<PowerModel, ProviderError>;
}
