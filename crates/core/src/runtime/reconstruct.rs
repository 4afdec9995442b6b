//! Pure interval-walk over lifecycle audit events
//!
//! Kept free of I/O and clocks so every edge case is testable with plain
//! values: orphan stops, overlapping starts, open intervals, empty logs.

use crate::models::{AuditEvent, EventKind, InstanceState};
use chrono::{DateTime, Utc};

pub struct ReconstructionInput<'a> {
    pub events: &'a [AuditEvent],
    pub instance_id: &'a str,
    /// Start of the reporting window; credit never reaches further back
    pub window_start: DateTime<Utc>,
    pub now: DateTime<Utc>,
    pub launched_at: Option<DateTime<Utc>>,
    pub state: InstanceState,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reconstruction {
    /// Total running hours, or `None` when the log supports no answer
    pub hours: Option<f64>,
    /// Lifecycle events that mentioned the instance, cached alongside
    pub event_count: usize,
}

/// Reconstruct running hours from a bag of lifecycle events
///
/// The walk keeps a single open-interval pointer: a start event opens it
/// (a second start simply moves it, the earlier one had no matching stop),
/// a stop or terminate closes it. A stop with no open interval means the
/// matching start predates the log; the interval is credited from the
/// window start, or from launch when the instance launched inside the
/// window. An interval still open at the end only counts if the instance
/// is actually running now.
pub fn reconstruct_runtime(input: &ReconstructionInput<'_>) -> Reconstruction {
    let mut relevant: Vec<(EventKind, DateTime<Utc>)> = input
        .events
        .iter()
        .filter(|e| e.resources.iter().any(|r| r == input.instance_id))
        .filter_map(|e| EventKind::from_event_name(&e.name).map(|k| (k, e.occurred_at)))
        .collect();
    relevant.sort_by_key(|(_, at)| *at);

    let event_count = relevant.len();

    if relevant.is_empty() {
        // No lifecycle history. A running instance with a known launch
        // time has run continuously since launch; anything else is
        // unknown, not zero.
        let hours = match (input.state.is_running(), input.launched_at) {
            (true, Some(launch)) => {
                let from = launch.max(input.window_start);
                Some(hours_between(from, input.now))
            }
            _ => None,
        };
        return Reconstruction {
            hours: hours.map(round2),
            event_count,
        };
    }

    // Orphan-stop credit starts at the window edge, or at launch when the
    // instance launched inside the window.
    let credit_start = match input.launched_at {
        Some(launch) => launch.max(input.window_start),
        None => input.window_start,
    };

    let mut total_hours = 0.0;
    let mut open: Option<DateTime<Utc>> = None;

    for (kind, at) in relevant {
        if kind.closes_interval() {
            match open.take() {
                Some(started) => total_hours += hours_between(started, at),
                None => total_hours += hours_between(credit_start, at),
            }
        } else {
            open = Some(at);
        }
    }

    // An open interval reaching the present only counts while the
    // instance is still running; an orphan start on a stopped instance
    // means the stop event was lost and the duration is unknowable, so
    // it earns nothing.
    if let Some(started) = open {
        if input.state.is_running() {
            total_hours += hours_between(started, input.now);
        }
    }

    Reconstruction {
        hours: Some(round2(total_hours.max(0.0))),
        event_count,
    }
}

fn hours_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    let seconds = (to - from).num_seconds().max(0);
    seconds as f64 / 3600.0
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
