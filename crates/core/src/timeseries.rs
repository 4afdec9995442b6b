//! Time alignment between the hourly cost and carbon series
//!
//! Cost and carbon arrive from different APIs with different timezone
//! conventions. Both are normalized to the same local, minute-zero hour
//! bucket before matching. The normalization is deliberately lossy: two
//! distinct UTC offsets mapping to the same local hour share a bucket.
//! Internally everything stays timezone-aware UTC; local conversion happens
//! only here, at the bucket boundary.

use crate::cache::{CacheCategory, CacheStore};
use crate::models::{CarbonSample, CostPoint, SeriesPoint};
use chrono::{DateTime, Duration, Local, NaiveDateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Trailing window the aligned series covers
pub const ALIGNMENT_WINDOW_HOURS: i64 = 48;

/// Merged cost and carbon series with its alignment diagnostics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignedSeries {
    pub points: Vec<SeriesPoint>,
    /// Fraction of cost-hours with a matching carbon sample; `None` when
    /// there were no cost-hours at all
    pub coverage: Option<f64>,
    /// Cost-hours that found a carbon sample
    pub aligned_hours: usize,
}

impl AlignedSeries {
    pub fn empty() -> Self {
        Self {
            points: Vec::new(),
            coverage: None,
            aligned_hours: 0,
        }
    }
}

/// Local, minute-zero hour bucket used as the alignment key
fn local_hour_bucket(ts: DateTime<Utc>) -> NaiveDateTime {
    let local = ts.with_timezone(&Local).naive_local();
    // Hour 0..=23 is always constructible
    local.date().and_hms_opt(local.hour(), 0, 0).unwrap_or(local)
}

/// Merge hourly cost points with hourly carbon samples
///
/// Cost-hours are restricted to the trailing 48 hours; when none fall in
/// that window, all available cost-hours are kept rather than returning an
/// empty series. Per-hour CO₂ is the fleet total amortized evenly across
/// the retained hours, a documented simplification: true hourly CO₂ would
/// need hourly power and runtime data that may not exist. Missing carbon
/// samples stay `None` in their points, never interpolated.
pub fn build_aligned_series(
    hourly_costs: &[CostPoint],
    carbon_history: &[CarbonSample],
    total_co2_g: f64,
    now: DateTime<Utc>,
) -> AlignedSeries {
    let mut cost_by_hour: BTreeMap<NaiveDateTime, f64> = BTreeMap::new();
    for point in hourly_costs {
        *cost_by_hour.entry(local_hour_bucket(point.timestamp)).or_insert(0.0) +=
            point.amount_usd;
    }

    let mut carbon_by_hour: HashMap<NaiveDateTime, f64> = HashMap::new();
    for sample in carbon_history {
        carbon_by_hour.insert(local_hour_bucket(sample.recorded_at), sample.intensity_g_per_kwh);
    }

    if cost_by_hour.is_empty() {
        return AlignedSeries::empty();
    }

    let cutoff = local_hour_bucket(now - Duration::hours(ALIGNMENT_WINDOW_HOURS));
    let windowed: BTreeMap<NaiveDateTime, f64> = cost_by_hour
        .iter()
        .filter(|(hour, _)| **hour >= cutoff)
        .map(|(hour, cost)| (*hour, *cost))
        .collect();
    let retained = if windowed.is_empty() { cost_by_hour } else { windowed };

    let co2_per_hour_g = total_co2_g / retained.len() as f64;

    let mut aligned_hours = 0usize;
    let points: Vec<SeriesPoint> = retained
        .into_iter()
        .map(|(hour, cost_usd)| {
            let carbon_intensity = carbon_by_hour.get(&hour).copied();
            if carbon_intensity.is_some() {
                aligned_hours += 1;
            }
            SeriesPoint {
                hour,
                cost_usd,
                co2_g: co2_per_hour_g,
                carbon_intensity,
            }
        })
        .collect();

    let coverage = Some(aligned_hours as f64 / points.len() as f64);

    AlignedSeries {
        points,
        coverage,
        aligned_hours,
    }
}

/// Aggregate billing divided by the bottom-up estimate
///
/// Purely diagnostic: surfaced as an accuracy indicator, never used to
/// rescale the bottom-up numbers. Both amounts must already be in the same
/// currency. A zero or missing side yields the neutral 1.0.
pub fn validation_factor(aggregate_billing: Option<f64>, bottom_up_estimate: Option<f64>) -> f64 {
    match (aggregate_billing, bottom_up_estimate) {
        (Some(billing), Some(estimate)) if billing > 0.0 && estimate > 0.0 => billing / estimate,
        _ => 1.0,
    }
}

/// Builds the aligned series and keeps the last known one on disk
pub struct TimeseriesService {
    cache: CacheStore,
}

const SERIES_CACHE_ID: &str = "dashboard";

impl TimeseriesService {
    pub fn new(cache: CacheStore) -> Self {
        Self { cache }
    }

    /// Build, persist and return the aligned series
    pub fn build(
        &self,
        hourly_costs: &[CostPoint],
        carbon_history: &[CarbonSample],
        total_co2_g: f64,
        now: DateTime<Utc>,
    ) -> AlignedSeries {
        let series = build_aligned_series(hourly_costs, carbon_history, total_co2_g, now);
        if !series.points.is_empty() {
            self.cache
                .write(CacheCategory::Timeseries, SERIES_CACHE_ID, &series);
        }
        debug!(
            points = series.points.len(),
            aligned = series.aligned_hours,
            "Built aligned series"
        );
        series
    }

    /// Last persisted series, regardless of age; a stale chart beats a
    /// blank one when the cost feed is down
    pub fn last_known(&self) -> Option<AlignedSeries> {
        self.cache
            .read_any(CacheCategory::Timeseries, SERIES_CACHE_ID)
    }
}
