//! Core data models for the GridCost engine

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state reported by the cloud provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstanceState {
    Running,
    Stopped,
    Terminated,
    #[serde(other)]
    Unknown,
}

impl InstanceState {
    pub fn is_running(&self) -> bool {
        matches!(self, InstanceState::Running)
    }
}

/// Identity snapshot of one compute instance, re-fetched on every refresh
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceDescriptor {
    pub id: String,
    pub instance_type: String,
    pub state: InstanceState,
    pub region: String,
    pub launched_at: Option<DateTime<Utc>>,
    pub name: Option<String>,
}

/// One audit-log record in provider-native form
///
/// Events arrive unordered and may reference several resources; the runtime
/// service filters them down to lifecycle events for a single instance.
/// Audit retention is bounded by the lookback window (30 days by default);
/// older history simply does not exist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub name: String,
    pub occurred_at: DateTime<Utc>,
    pub resources: Vec<String>,
}

/// Lifecycle event kinds relevant to runtime reconstruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Start,
    Stop,
    Terminate,
}

impl EventKind {
    /// Map a provider-native event name to a lifecycle kind
    pub fn from_event_name(name: &str) -> Option<Self> {
        match name {
            "StartInstances" | "RunInstances" => Some(EventKind::Start),
            "StopInstances" => Some(EventKind::Stop),
            "TerminateInstances" => Some(EventKind::Terminate),
            _ => None,
        }
    }

    /// Stop and terminate both close an open interval
    pub fn closes_interval(&self) -> bool {
        matches!(self, EventKind::Stop | EventKind::Terminate)
    }
}

/// Hardware power curve for one instance type, static for our purposes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerModel {
    pub instance_type: String,
    pub avg_watts: f64,
    pub min_watts: f64,
    pub max_watts: f64,
}

/// Origin of a carbon-intensity sample
///
/// `StaleCache` marks the sole sanctioned fallback: an expired cache entry
/// re-served because the live call failed. `SelfCollected` marks samples
/// recorded by our own hourly collector. Downstream consumers and tests can
/// always tell these apart from a fresh reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CarbonSource {
    Live,
    StaleCache,
    SelfCollected,
}

/// A grid carbon-intensity reading in gCO2/kWh
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarbonSample {
    pub intensity_g_per_kwh: f64,
    pub recorded_at: DateTime<Utc>,
    pub zone: String,
    pub source: CarbonSource,
    pub fetched_at: DateTime<Utc>,
}

/// How a cost figure was computed
///
/// Bottom-up (unit price x runtime) and billing (aggregate pull) figures are
/// never merged; their ratio surfaces as the validation factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostBasis {
    BottomUp,
    Billing,
}

/// One cost figure, carried in both currencies
///
/// EUR is always derived from USD at the single configured exchange rate so
/// the two can never drift apart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostPoint {
    pub timestamp: DateTime<Utc>,
    pub amount_usd: f64,
    pub amount_eur: f64,
}

impl CostPoint {
    pub fn from_usd(timestamp: DateTime<Utc>, amount_usd: f64, exchange_rate: f64) -> Self {
        Self {
            timestamp,
            amount_usd,
            amount_eur: amount_usd * exchange_rate,
        }
    }
}

/// Data-quality tag derived from which enrichment inputs actually arrived
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataQuality {
    /// Runtime, CPU, effective power and cost were all measured
    Measured,
    /// At least one of the four inputs was measured
    Partial,
    /// None of the four inputs was available
    Limited,
}

/// Confidence tag derived from the count of successful data sources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

/// Fully-priced, fully-emitting instance record
///
/// Built fresh on every refresh; only the inputs are ever cached, never this
/// record itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichedInstance {
    #[serde(flatten)]
    pub descriptor: InstanceDescriptor,
    pub runtime_hours: Option<f64>,
    pub cpu_utilization_pct: Option<f64>,
    pub rated_power_watts: Option<f64>,
    pub effective_power_watts: Option<f64>,
    pub unit_price_usd: Option<f64>,
    pub hourly_co2_g: Option<f64>,
    pub total_co2_kg: Option<f64>,
    pub cost_usd: Option<f64>,
    pub cost_eur: Option<f64>,
    pub data_quality: DataQuality,
    pub confidence: Confidence,
}

/// One point of the aligned hourly series
///
/// The hour key is local time truncated to the top of the hour with the
/// timezone stripped; carbon intensity is absent where no sample matched the
/// bucket (no silent interpolation here).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub hour: NaiveDateTime,
    pub cost_usd: f64,
    pub co2_g: f64,
    pub carbon_intensity: Option<f64>,
}
