//! HTTP API: dashboard snapshots, health checks and Prometheus metrics

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use gridcost_core::{DashboardEngine, FeedRegistry, FeedStatus};
use prometheus::{Encoder, TextEncoder};
use std::sync::Arc;
use tracing::info;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<DashboardEngine>,
    pub registry: FeedRegistry,
}

impl AppState {
    pub fn new(engine: Arc<DashboardEngine>) -> Self {
        let registry = engine.registry();
        Self { engine, registry }
    }
}

/// Full dashboard snapshot; every request runs a refresh, with the disk
/// cache absorbing the cost of repeated loads
async fn dashboard(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let data = state.engine.refresh().await;
    (StatusCode::OK, Json(data))
}

/// Aligned cost and carbon series only
async fn timeseries(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let data = state.engine.refresh().await;
    (StatusCode::OK, Json(data.series))
}

/// Health check - 200 while feeds are at worst degraded, 503 when a feed
/// needs credentials
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.registry.health().await;

    let status_code = match health.status {
        FeedStatus::Healthy => StatusCode::OK,
        FeedStatus::Degraded => StatusCode::OK, // Still renders a snapshot
        FeedStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check - 200 once the first refresh has completed
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response()
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/dashboard", get(dashboard))
        .route("/api/v1/timeseries", get(timeseries))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
