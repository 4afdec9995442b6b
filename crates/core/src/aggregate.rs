//! Fleet totals and fixed-percentage optimization scenarios

use crate::models::{DataQuality, EnrichedInstance};
use serde::{Deserialize, Serialize};

/// Summed figures across all enriched instances
///
/// Instances with a missing figure contribute nothing to that total, and a
/// negative upstream figure is clamped out rather than displayed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardTotals {
    pub instance_count: usize,
    pub running_count: usize,
    pub measured_count: usize,
    pub total_runtime_hours: f64,
    pub total_cost_usd: f64,
    pub total_cost_eur: f64,
    pub total_co2_kg: f64,
}

pub fn summarize(instances: &[EnrichedInstance]) -> DashboardTotals {
    let mut totals = DashboardTotals {
        instance_count: instances.len(),
        ..Default::default()
    };

    for instance in instances {
        if instance.descriptor.state.is_running() {
            totals.running_count += 1;
        }
        if instance.data_quality == DataQuality::Measured {
            totals.measured_count += 1;
        }
        totals.total_runtime_hours += positive(instance.runtime_hours);
        totals.total_cost_usd += positive(instance.cost_usd);
        totals.total_cost_eur += positive(instance.cost_eur);
        totals.total_co2_kg += positive(instance.total_co2_kg);
    }

    totals.total_runtime_hours = round2(totals.total_runtime_hours);
    totals.total_cost_usd = round2(totals.total_cost_usd);
    totals.total_cost_eur = round2(totals.total_cost_eur);
    totals.total_co2_kg = round2(totals.total_co2_kg);
    totals
}

fn positive(value: Option<f64>) -> f64 {
    value.unwrap_or(0.0).max(0.0)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// A what-if lever with its assumed savings share
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioSpec {
    pub name: String,
    pub description: String,
    /// Share of cost and emissions assumed saved, in [0, 1]
    pub savings_fraction: f64,
}

/// The three levers shown by the dashboard, plain data rather than logic
/// so a deployment can override them from configuration
pub fn default_scenarios() -> Vec<ScenarioSpec> {
    vec![
        ScenarioSpec {
            name: "off_hours_shutdown".to_string(),
            description: "Stop non-production instances outside working hours".to_string(),
            savings_fraction: 0.65,
        },
        ScenarioSpec {
            name: "weekend_shutdown".to_string(),
            description: "Stop non-production instances over the weekend".to_string(),
            savings_fraction: 0.30,
        },
        ScenarioSpec {
            name: "rightsizing".to_string(),
            description: "Downsize instances with persistently low utilization".to_string(),
            savings_fraction: 0.25,
        },
    ]
}

/// A scenario projected against the current totals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioProjection {
    pub spec: ScenarioSpec,
    pub saved_cost_eur: f64,
    pub saved_co2_kg: f64,
    pub projected_cost_eur: f64,
    pub projected_co2_kg: f64,
}

pub fn project_scenarios(
    totals: &DashboardTotals,
    specs: &[ScenarioSpec],
) -> Vec<ScenarioProjection> {
    specs
        .iter()
        .map(|spec| {
            let fraction = spec.savings_fraction.clamp(0.0, 1.0);
            let saved_cost_eur = round2(totals.total_cost_eur * fraction);
            let saved_co2_kg = round2(totals.total_co2_kg * fraction);
            ScenarioProjection {
                spec: spec.clone(),
                saved_cost_eur,
                saved_co2_kg,
                projected_cost_eur: round2(totals.total_cost_eur - saved_cost_eur),
                projected_co2_kg: round2(totals.total_co2_kg - saved_co2_kg),
            }
        })
        .collect()
}
