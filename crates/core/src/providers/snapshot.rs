//! Disk-backed cloud provider for demo deployments and tests
//!
//! The production cloud client is a deployment concern; this implementation
//! serves provider-native JSON snapshots from a directory so the dashboard
//! runs end to end without cloud credentials. Missing snapshot files read as
//! empty result sets, which exercises the engine's degraded paths.
//!
//! Layout under the snapshot directory:
//! - `instances.json`: `[InstanceDescriptor]`
//! - `audit_events.json`: `[AuditEvent]`
//! - `cpu/<instance>.json`: `[f64]` hourly utilization percentages
//! - `prices.json`: map `"<type>__<region>"` to USD hourly price
//! - `monthly_cost.json`: month-to-date USD total
//! - `hourly/<YYYY-MM-DD>.json`: `[RawCostPoint]` for one day

use super::{CloudApi, RawCostPoint};
use crate::error::ProviderError;
use crate::models::{AuditEvent, InstanceDescriptor};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

pub struct SnapshotCloudApi {
    dir: PathBuf,
}

impl SnapshotCloudApi {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn load<T: DeserializeOwned>(&self, relative: &str) -> Result<Option<T>, ProviderError> {
        let path = self.dir.join(relative);
        if !path.exists() {
            debug!(path = %path.display(), "Snapshot file missing");
            return Ok(None);
        }
        let data = std::fs::read(&path)
            .map_err(|e| ProviderError::Transport(format!("{}: {}", path.display(), e)))?;
        let value = serde_json::from_slice(&data)
            .map_err(|e| ProviderError::Malformed(format!("{}: {}", path.display(), e)))?;
        Ok(Some(value))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl CloudApi for SnapshotCloudApi {
    async fn list_instances(&self) -> Result<Vec<InstanceDescriptor>, ProviderError> {
        Ok(self.load("instances.json")?.unwrap_or_default())
    }

    async fn audit_events(
        &self,
        _region: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<AuditEvent>, ProviderError> {
        let events: Vec<AuditEvent> = self.load("audit_events.json")?.unwrap_or_default();
        Ok(events
            .into_iter()
            .filter(|e| e.occurred_at >= start && e.occurred_at <= end)
            .collect())
    }

    async fn cpu_samples(
        &self,
        instance_id: &str,
        _region: &str,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
    ) -> Result<Vec<f64>, ProviderError> {
        Ok(self
            .load(&format!("cpu/{}.json", instance_id))?
            .unwrap_or_default())
    }

    async fn on_demand_price(
        &self,
        instance_type: &str,
        region: &str,
    ) -> Result<Option<f64>, ProviderError> {
        let prices: HashMap<String, f64> = self.load("prices.json")?.unwrap_or_default();
        Ok(prices
            .get(&format!("{}__{}", instance_type, region))
            .copied())
    }

    async fn monthly_cost(&self) -> Result<f64, ProviderError> {
        self.load("monthly_cost.json")?
            .ok_or_else(|| ProviderError::Malformed("monthly_cost.json missing".to_string()))
    }

    async fn hourly_costs(&self, day: NaiveDate) -> Result<Vec<RawCostPoint>, ProviderError> {
        Ok(self
            .load(&format!("hourly/{}.json", day.format("%Y-%m-%d")))?
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn write(dir: &Path, relative: &str, contents: &str) {
        let path = dir.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, contents).unwrap();
    }

    #[tokio::test]
    async fn test_missing_files_read_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let api = SnapshotCloudApi::new(dir.path());

        assert!(api.list_instances().await.unwrap().is_empty());
        assert!(api
            .cpu_samples("i-1", "eu-central-1", Utc::now(), Utc::now())
            .await
            .unwrap()
            .is_empty());
        assert_eq!(api.on_demand_price("t3.micro", "eu-central-1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_audit_events_filtered_to_range() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "audit_events.json",
            r#"[
                {"name": "StartInstances", "occurred_at": "2024-03-01T08:00:00Z", "resources": ["i-1"]},
                {"name": "StopInstances", "occurred_at": "2024-03-20T08:00:00Z", "resources": ["i-1"]}
            ]"#,
        );

        let api = SnapshotCloudApi::new(dir.path());
        let start = Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 3, 31, 0, 0, 0).unwrap();
        let events = api.audit_events("eu-central-1", start, end).await.unwrap();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].name, "StopInstances");
    }

    #[tokio::test]
    async fn test_prices_keyed_by_type_and_region() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "prices.json",
            r#"{"t3.micro__eu-central-1": 0.0114}"#,
        );

        let api = SnapshotCloudApi::new(dir.path());
        assert_eq!(
            api.on_demand_price("t3.micro", "eu-central-1").await.unwrap(),
            Some(0.0114)
        );
        assert_eq!(api.on_demand_price("t3.micro", "us-east-1").await.unwrap(), None);
    }
}
