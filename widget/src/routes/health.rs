//! Health check endpoint.
//!
//! Reports whether Prometheus data is currently reachable.

use crate::state::AppState;
use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `healthy`, or `degraded` while every metric is failing.
    pub status: &'static str,
    /// Service name.
    pub service: &'static str,
    /// Service version.
    pub version: &'static str,
    /// Reason for degradation, empty when healthy.
    pub message: String,
}

/// Creates the health check routes.
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

/// Health check handler.
///
/// Always answers 200. The body reports whether data collection works.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let status = state.status();
    Json(HealthResponse {
        status: if status.ok { "healthy" } else { "degraded" },
        service: "meteo-widget",
        version: env!("CARGO_PKG_VERSION"),
        message: status.message,
    })
}
