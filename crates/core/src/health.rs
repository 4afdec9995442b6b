//! Health tracking for the external data feeds
//!
//! The dashboard keeps rendering while feeds drop out, so health here means
//! "which feeds fed the current snapshot", reported through liveness and
//! readiness probes.

use crate::error::Availability;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Health status of a data feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedStatus {
    /// Feed answered during the last refresh
    Healthy,
    /// Feed failed; the snapshot carries gaps or tagged stale data
    Degraded,
    /// Feed rejected our credentials and needs operator action
    Unhealthy,
}

impl FeedStatus {
    /// Returns true if the feed contributed at least partial data
    pub fn is_operational(&self) -> bool {
        matches!(self, FeedStatus::Healthy | FeedStatus::Degraded)
    }
}

/// Information about a feed's health
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedHealth {
    pub status: FeedStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub last_check_timestamp: i64,
}

impl FeedHealth {
    pub fn healthy() -> Self {
        Self {
            status: FeedStatus::Healthy,
            message: None,
            last_check_timestamp: chrono::Utc::now().timestamp(),
        }
    }

    pub fn degraded(message: impl Into<String>) -> Self {
        Self {
            status: FeedStatus::Degraded,
            message: Some(message.into()),
            last_check_timestamp: chrono::Utc::now().timestamp(),
        }
    }

    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self {
            status: FeedStatus::Unhealthy,
            message: Some(message.into()),
            last_check_timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

/// Overall health response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: FeedStatus,
    pub feeds: HashMap<String, FeedHealth>,
}

impl HealthResponse {
    /// Compute overall status from individual feed statuses
    pub fn compute_status(feeds: &HashMap<String, FeedHealth>) -> FeedStatus {
        let mut has_degraded = false;

        for health in feeds.values() {
            match health.status {
                FeedStatus::Unhealthy => return FeedStatus::Unhealthy,
                FeedStatus::Degraded => has_degraded = true,
                FeedStatus::Healthy => {}
            }
        }

        if has_degraded {
            FeedStatus::Degraded
        } else {
            FeedStatus::Healthy
        }
    }
}

/// Readiness response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Feed names for health tracking
pub mod feeds {
    pub const CLOUD_INVENTORY: &str = "cloud_inventory";
    pub const CARBON: &str = "carbon_intensity";
    pub const POWER: &str = "power_model";
    pub const BILLING: &str = "billing";
}

/// Registry tracking per-feed health across refresh cycles
#[derive(Debug, Clone)]
pub struct FeedRegistry {
    feeds: Arc<RwLock<HashMap<String, FeedHealth>>>,
    ready: Arc<RwLock<bool>>,
}

impl Default for FeedRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FeedRegistry {
    pub fn new() -> Self {
        Self {
            feeds: Arc::new(RwLock::new(HashMap::new())),
            ready: Arc::new(RwLock::new(false)),
        }
    }

    /// Register a feed with initial healthy status
    pub async fn register(&self, name: &str) {
        let mut feeds = self.feeds.write().await;
        feeds.insert(name.to_string(), FeedHealth::healthy());
    }

    /// Update feed health
    pub async fn update(&self, name: &str, health: FeedHealth) {
        let mut feeds = self.feeds.write().await;
        feeds.insert(name.to_string(), health);
    }

    pub async fn set_healthy(&self, name: &str) {
        self.update(name, FeedHealth::healthy()).await;
    }

    pub async fn set_degraded(&self, name: &str, message: impl Into<String>) {
        self.update(name, FeedHealth::degraded(message)).await;
    }

    pub async fn set_unhealthy(&self, name: &str, message: impl Into<String>) {
        self.update(name, FeedHealth::unhealthy(message)).await;
    }

    /// Record a feed's health from the outcome of its last lookup
    pub async fn record_outcome<T>(&self, name: &str, outcome: &Availability<T>) {
        match outcome {
            Availability::Available(_) => self.set_healthy(name).await,
            Availability::Unavailable => {
                self.set_degraded(name, "Feed unavailable during last refresh")
                    .await
            }
            Availability::AuthRequired => {
                self.set_unhealthy(name, "Credentials expired, operator action required")
                    .await
            }
        }
    }

    /// Set readiness; flipped once the first refresh cycle completes
    pub async fn set_ready(&self, ready: bool) {
        let mut r = self.ready.write().await;
        *r = ready;
    }

    /// Get health response
    pub async fn health(&self) -> HealthResponse {
        let feeds = self.feeds.read().await.clone();
        let status = HealthResponse::compute_status(&feeds);
        HealthResponse { status, feeds }
    }

    /// Get readiness response
    ///
    /// Degraded feeds do not block readiness: a snapshot with gaps is still
    /// a snapshot the dashboard can serve.
    pub async fn readiness(&self) -> ReadinessResponse {
        let ready = *self.ready.read().await;

        if !ready {
            ReadinessResponse {
                ready: false,
                reason: Some("First refresh not yet completed".to_string()),
            }
        } else {
            ReadinessResponse {
                ready: true,
                reason: None,
            }
        }
    }
}
