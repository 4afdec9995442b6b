//! Core library for the GridCost carbon-aware FinOps dashboard
//!
//! This crate provides the core functionality for:
//! - On-disk JSON caching with per-category TTLs
//! - Cached gateways over the carbon, power and billing feeds
//! - Runtime reconstruction from lifecycle audit events
//! - Per-instance cost/CO2 enrichment
//! - Hourly time alignment and cost validation
//! - Health tracking and observability

pub mod aggregate;
pub mod cache;
pub mod enrich;
pub mod error;
pub mod gateway;
pub mod health;
pub mod models;
pub mod observability;
pub mod pipeline;
pub mod providers;
pub mod runtime;
pub mod timeseries;

pub use aggregate::{default_scenarios, DashboardTotals, ScenarioProjection, ScenarioSpec};
pub use error::{Availability, ProviderError};
pub use health::{feeds, FeedHealth, FeedRegistry, FeedStatus, HealthResponse, ReadinessResponse};
pub use models::*;
pub use observability::{EngineMetrics, RefreshLogger};
pub use pipeline::{DashboardData, DashboardEngine, DashboardState, EngineConfig};
