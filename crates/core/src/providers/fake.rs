//! In-crate provider fakes shared by the gateway, runtime and pipeline tests

use super::{CarbonApi, CloudApi, PowerApi, RawCostPoint, RawIntensity};
use crate::error::ProviderError;
use crate::models::{AuditEvent, InstanceDescriptor, PowerModel};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Failure mode a fake can be pinned to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FakeFailure {
    None,
    Timeout,
    AuthExpired,
}

impl FakeFailure {
    fn check(&self) -> Result<(), ProviderError> {
        match self {
            FakeFailure::None => Ok(()),
            FakeFailure::Timeout => Err(ProviderError::Timeout),
            FakeFailure::AuthExpired => Err(ProviderError::AuthExpired),
        }
    }
}

#[derive(Default)]
pub struct FakeCloudApi {
    pub instances: Vec<InstanceDescriptor>,
    pub events: Vec<AuditEvent>,
    pub cpu: Vec<f64>,
    pub price: Option<f64>,
    pub monthly_usd: f64,
    pub hourly: Vec<RawCostPoint>,
    pub failure: Option<FakeFailure>,
    pub calls: AtomicUsize,
}

impl FakeCloudApi {
    pub fn failing(failure: FakeFailure) -> Self {
        Self {
            failure: Some(failure),
            ..Default::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn tick(&self) -> Result<(), ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.failure.unwrap_or(FakeFailure::None).check()
    }
}

#[async_trait]
impl CloudApi for FakeCloudApi {
    async fn list_instances(&self) -> Result<Vec<InstanceDescriptor>, ProviderError> {
        self.tick()?;
        Ok(self.instances.clone())
    }

    async fn audit_events(
        &self,
        _region: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<AuditEvent>, ProviderError> {
        self.tick()?;
        Ok(self
            .events
            .iter()
            .filter(|e| e.occurred_at >= start && e.occurred_at <= end)
            .cloned()
            .collect())
    }

    async fn cpu_samples(
        &self,
        _instance_id: &str,
        _region: &str,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
    ) -> Result<Vec<f64>, ProviderError> {
        self.tick()?;
        Ok(self.cpu.clone())
    }

    async fn on_demand_price(
        &self,
        _instance_type: &str,
        _region: &str,
    ) -> Result<Option<f64>, ProviderError> {
        self.tick()?;
        Ok(self.price)
    }

    async fn monthly_cost(&self) -> Result<f64, ProviderError> {
        self.tick()?;
        Ok(self.monthly_usd)
    }

    async fn hourly_costs(&self, day: NaiveDate) -> Result<Vec<RawCostPoint>, ProviderError> {
        self.tick()?;
        Ok(self
            .hourly
            .iter()
            .filter(|p| p.timestamp.date_naive() == day)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct FakeCarbonApi {
    pub current: Option<RawIntensity>,
    pub history: Vec<RawIntensity>,
    pub failure: Option<FakeFailure>,
    pub calls: AtomicUsize,
}

impl FakeCarbonApi {
    pub fn with_current(intensity: f64, recorded_at: DateTime<Utc>) -> Self {
        Self {
            current: Some(RawIntensity {
                intensity_g_per_kwh: intensity,
                recorded_at,
            }),
            ..Default::default()
        }
    }

    pub fn failing(failure: FakeFailure) -> Self {
        Self {
            failure: Some(failure),
            ..Default::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn tick(&self) -> Result<(), ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.failure.unwrap_or(FakeFailure::None).check()
    }
}

#[async_trait]
impl CarbonApi for FakeCarbonApi {
    async fn current_intensity(&self, _zone: &str) -> Result<RawIntensity, ProviderError> {
        self.tick()?;
        self.current
            .clone()
            .ok_or_else(|| ProviderError::Malformed("no current sample configured".into()))
    }

    async fn history_24h(&self, _zone: &str) -> Result<Vec<RawIntensity>, ProviderError> {
        self.tick()?;
        if self.history.is_empty() {
            return Err(ProviderError::Http(404));
        }
        Ok(self.history.clone())
    }
}

#[derive(Default)]
pub struct FakePowerApi {
    pub model: Option<PowerModel>,
    pub failure: Option<FakeFailure>,
    pub calls: AtomicUsize,
}

impl FakePowerApi {
    pub fn with_model(avg: f64, min: f64, max: f64) -> Self {
        Self {
            model: Some(PowerModel {
                instance_type: String::new(),
                avg_watts: avg,
                min_watts: min,
                max_watts: max,
            }),
            ..Default::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn tick(&self) -> Result<(), ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.failure.unwrap_or(FakeFailure::None).check()
    }
}

#[async_trait]
impl PowerApi for FakePowerApi {
    async fn power_model(
        &self,
        instance_type: &str,
        _location_hint: &str,
    ) -> Result<PowerModel, ProviderError> {
        self.tick()?;
        let mut model = self
            .model
            .clone()
            .ok_or(ProviderError::Http(404))?;
        model.instance_type = instance_type.to_string();
        Ok(model)
    }
}

/// Descriptor helper used across test modules
pub fn test_instance(id: &str, state: crate::models::InstanceState) -> InstanceDescriptor {
    InstanceDescriptor {
        id: id.to_string(),
        instance_type: "t3.medium".to_string(),
        state,
        region: "eu-central-1".to_string(),
        launched_at: None,
        name: Some("demo".to_string()),
    }
}
