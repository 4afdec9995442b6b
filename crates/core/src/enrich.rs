//! Instance enrichment: fusing runtime, power, price and carbon intensity
//!
//! Every derived figure is computed only when its inputs are actually
//! present; a missing input leaves the field `None` and downgrades the
//! row's quality tag instead of being papered over with a default.

use crate::error::Availability;
use crate::gateway::{BillingGateway, PowerGateway};
use crate::models::{
    CarbonSample, Confidence, CostPoint, DataQuality, EnrichedInstance, InstanceDescriptor,
    PowerModel,
};
use crate::runtime::RuntimeService;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Share of rated average draw consumed at zero CPU utilization
pub const IDLE_POWER_FRACTION: f64 = 0.3;

/// Share of rated average draw that scales with CPU utilization
pub const UTILIZATION_POWER_FRACTION: f64 = 0.7;

/// Utilization-scaled power draw in watts
///
/// Linear interpolation between 30% and 100% of the rated average,
/// reflecting the empirical idle-vs-peak ratio for commodity servers.
/// Utilization outside [0, 100] is clamped.
pub fn effective_power_watts(rated_avg_watts: f64, cpu_pct: f64) -> f64 {
    let load = cpu_pct.clamp(0.0, 100.0) / 100.0;
    rated_avg_watts * (IDLE_POWER_FRACTION + UTILIZATION_POWER_FRACTION * load)
}

/// Everything known about one instance going into enrichment
pub struct EnrichmentInputs<'a> {
    pub descriptor: &'a InstanceDescriptor,
    pub runtime_hours: Availability<f64>,
    pub cpu_pct: Availability<f64>,
    pub power: Availability<PowerModel>,
    pub unit_price_usd: Availability<f64>,
    pub carbon: Availability<CarbonSample>,
    pub exchange_rate: f64,
    pub now: DateTime<Utc>,
}

/// Fuse the available inputs into a dashboard row
///
/// Each derivation step is independently optional; nothing here returns an
/// error for missing data.
pub fn enrich_instance(inputs: EnrichmentInputs<'_>) -> EnrichedInstance {
    let runtime_hours = inputs.runtime_hours.into_option();
    let cpu_pct = inputs.cpu_pct.into_option();
    let power = inputs.power.into_option();
    let unit_price = inputs.unit_price_usd.into_option();
    let carbon = inputs.carbon.into_option();

    let rated_watts = power.as_ref().map(|p| p.avg_watts);

    // Effective power exists only when both the curve and a CPU signal do;
    // the raw curve is never used for emissions directly
    let effective_watts = match (rated_watts, cpu_pct) {
        (Some(rated), Some(cpu)) => Some(round2(effective_power_watts(rated, cpu))),
        _ => None,
    };

    let hourly_co2_g = match (effective_watts, runtime_hours, carbon.as_ref()) {
        (Some(watts), Some(_), Some(sample)) => {
            Some(round2(watts / 1000.0 * sample.intensity_g_per_kwh))
        }
        _ => None,
    };

    let total_co2_kg = match (hourly_co2_g, runtime_hours) {
        (Some(g_per_h), Some(hours)) => Some(round2(g_per_h * hours / 1000.0)),
        _ => None,
    };

    // The exchange rate is applied in CostPoint::from_usd and nowhere else
    let cost = match (unit_price, runtime_hours) {
        (Some(price), Some(hours)) => Some(CostPoint::from_usd(
            inputs.now,
            round2(price * hours),
            inputs.exchange_rate,
        )),
        _ => None,
    };

    let data_quality = quality(
        runtime_hours.is_some(),
        cpu_pct.is_some(),
        effective_watts.is_some(),
        cost.is_some(),
    );
    let confidence = confidence(
        runtime_hours.is_some(),
        cpu_pct.is_some(),
        power.is_some(),
        unit_price.is_some(),
        carbon.is_some(),
    );

    EnrichedInstance {
        descriptor: inputs.descriptor.clone(),
        runtime_hours,
        cpu_utilization_pct: cpu_pct,
        rated_power_watts: rated_watts,
        effective_power_watts: effective_watts,
        unit_price_usd: unit_price,
        hourly_co2_g,
        total_co2_kg,
        cost_usd: cost.as_ref().map(|c| c.amount_usd),
        cost_eur: cost.as_ref().map(|c| c.amount_eur),
        data_quality,
        confidence,
    }
}

/// Measured needs all four derived inputs; partial needs any one
fn quality(runtime: bool, cpu: bool, effective_power: bool, cost: bool) -> DataQuality {
    let inputs = [runtime, cpu, effective_power, cost];
    if inputs.iter().all(|present| *present) {
        DataQuality::Measured
    } else if inputs.iter().any(|present| *present) {
        DataQuality::Partial
    } else {
        DataQuality::Limited
    }
}

/// Count of distinct feeds that contributed; the descriptor always counts
fn confidence(runtime: bool, cpu: bool, power: bool, price: bool, carbon: bool) -> Confidence {
    let sources = 1 + [runtime, cpu, power, price, carbon]
        .iter()
        .filter(|present| **present)
        .count();
    if sources >= 4 {
        Confidence::High
    } else if sources >= 3 {
        Confidence::Medium
    } else {
        Confidence::Low
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Per-instance fan-out over the gateways
pub struct EnrichmentEngine {
    power: PowerGateway,
    billing: Arc<BillingGateway>,
    runtime: RuntimeService,
    exchange_rate: f64,
}

impl EnrichmentEngine {
    pub fn new(
        power: PowerGateway,
        billing: Arc<BillingGateway>,
        runtime: RuntimeService,
        exchange_rate: f64,
    ) -> Self {
        Self {
            power,
            billing,
            runtime,
            exchange_rate,
        }
    }

    /// Enrich one instance; the carbon sample is fetched once per region by
    /// the caller and shared across the region's instances
    pub async fn enrich(
        &self,
        descriptor: &InstanceDescriptor,
        carbon: &Availability<CarbonSample>,
    ) -> EnrichedInstance {
        let runtime_hours = self.runtime.runtime_hours(descriptor).await;
        let cpu_pct = self.runtime.cpu_utilization(descriptor).await;
        let power = self
            .power
            .model(&descriptor.instance_type, &descriptor.region)
            .await;
        let unit_price_usd = self
            .billing
            .unit_price(&descriptor.instance_type, &descriptor.region)
            .await;

        enrich_instance(EnrichmentInputs {
            descriptor,
            runtime_hours,
            cpu_pct,
            power,
            unit_price_usd,
            carbon: carbon.clone(),
            exchange_rate: self.exchange_rate,
            now: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CarbonSource, InstanceState};
    use crate::providers::fake::test_instance;
    use chrono::TimeZone;

    fn sample(intensity: f64, source: CarbonSource) -> CarbonSample {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
        CarbonSample {
            intensity_g_per_kwh: intensity,
            recorded_at: at,
            zone: "DE".to_string(),
            source,
            fetched_at: at,
        }
    }

    fn model(avg: f64) -> PowerModel {
        PowerModel {
            instance_type: "t3.medium".to_string(),
            avg_watts: avg,
            min_watts: avg * 0.4,
            max_watts: avg * 1.8,
        }
    }

    fn full_inputs(descriptor: &InstanceDescriptor) -> EnrichmentInputs<'_> {
        EnrichmentInputs {
            descriptor,
            runtime_hours: Availability::Available(10.0),
            cpu_pct: Availability::Available(50.0),
            power: Availability::Available(model(100.0)),
            unit_price_usd: Availability::Available(0.05),
            carbon: Availability::Available(sample(400.0, CarbonSource::Live)),
            exchange_rate: 0.92,
            now: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_effective_power_scales_between_idle_and_rated() {
        assert_eq!(effective_power_watts(100.0, 0.0), 30.0);
        // 0.3 + 0.7 * 0.5 lands a hair under 0.65 in binary
        assert!((effective_power_watts(100.0, 50.0) - 65.0).abs() < 1e-9);
        assert_eq!(effective_power_watts(100.0, 100.0), 100.0);
    }

    #[test]
    fn test_effective_power_clamps_out_of_range_utilization() {
        assert_eq!(effective_power_watts(100.0, 140.0), 100.0);
        assert_eq!(effective_power_watts(100.0, -5.0), 30.0);
    }

    #[test]
    fn test_fully_measured_row() {
        let descriptor = test_instance("i-abc123", InstanceState::Running);
        let row = enrich_instance(full_inputs(&descriptor));

        assert_eq!(row.effective_power_watts, Some(65.0));
        // 65 W at 400 g/kWh is 26 g/h; over 10 h that is 0.26 kg
        assert_eq!(row.hourly_co2_g, Some(26.0));
        assert_eq!(row.total_co2_kg, Some(0.26));
        assert_eq!(row.cost_usd, Some(0.5));
        assert!((row.cost_eur.unwrap() - 0.46).abs() < 1e-9);
        assert_eq!(row.data_quality, DataQuality::Measured);
        assert_eq!(row.confidence, Confidence::High);
    }

    #[test]
    fn test_missing_cpu_blocks_effective_power() {
        let descriptor = test_instance("i-abc123", InstanceState::Running);
        let mut inputs = full_inputs(&descriptor);
        inputs.cpu_pct = Availability::Unavailable;
        let row = enrich_instance(inputs);

        // The raw curve never stands in for effective power
        assert_eq!(row.rated_power_watts, Some(100.0));
        assert_eq!(row.effective_power_watts, None);
        assert_eq!(row.hourly_co2_g, None);
        assert_eq!(row.data_quality, DataQuality::Partial);
    }

    #[test]
    fn test_missing_carbon_leaves_emissions_empty() {
        let descriptor = test_instance("i-abc123", InstanceState::Running);
        let mut inputs = full_inputs(&descriptor);
        inputs.carbon = Availability::Unavailable;
        let row = enrich_instance(inputs);

        assert_eq!(row.hourly_co2_g, None);
        assert_eq!(row.total_co2_kg, None);
        // Cost does not depend on carbon and survives
        assert_eq!(row.cost_usd, Some(0.5));
        assert_eq!(row.data_quality, DataQuality::Measured);
    }

    #[test]
    fn test_missing_runtime_blocks_cost_and_totals() {
        let descriptor = test_instance("i-abc123", InstanceState::Stopped);
        let mut inputs = full_inputs(&descriptor);
        inputs.runtime_hours = Availability::Unavailable;
        let row = enrich_instance(inputs);

        assert_eq!(row.total_co2_kg, None);
        assert_eq!(row.hourly_co2_g, None);
        assert_eq!(row.cost_usd, None);
        assert_eq!(row.data_quality, DataQuality::Partial);
        // CPU, power curve, price and carbon still contributed
        assert_eq!(row.confidence, Confidence::High);
    }

    #[test]
    fn test_nothing_available_is_limited_and_low() {
        let descriptor = test_instance("i-abc123", InstanceState::Stopped);
        let row = enrich_instance(EnrichmentInputs {
            descriptor: &descriptor,
            runtime_hours: Availability::Unavailable,
            cpu_pct: Availability::Unavailable,
            power: Availability::Unavailable,
            unit_price_usd: Availability::Unavailable,
            carbon: Availability::Unavailable,
            exchange_rate: 0.92,
            now: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
        });

        assert_eq!(row.data_quality, DataQuality::Limited);
        assert_eq!(row.confidence, Confidence::Low);
        assert_eq!(row.cost_usd, None);
        assert_eq!(row.total_co2_kg, None);
    }

    #[test]
    fn test_auth_required_inputs_render_as_gaps() {
        let descriptor = test_instance("i-abc123", InstanceState::Running);
        let mut inputs = full_inputs(&descriptor);
        inputs.unit_price_usd = Availability::AuthRequired;
        let row = enrich_instance(inputs);

        assert_eq!(row.unit_price_usd, None);
        assert_eq!(row.cost_usd, None);
        assert_eq!(row.data_quality, DataQuality::Partial);
    }
}
