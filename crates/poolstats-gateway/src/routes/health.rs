//! Health check endpoint.

use axum::{extract::State, routing::get, Json, Router};
use poolstats_core::LifecycleState;

use crate::json::HealthResponse;
use crate::AppState;

/// Health check routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

/// Health check handler.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let exporter_state = state.exporter.as_ref().map(|exporter| exporter.state());

    // Pull mode has no background task that could have died
    let healthy = exporter_state.map_or(true, |s| s == LifecycleState::Running);

    Json(HealthResponse {
        status: if healthy { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        mode: state.config.mode.as_str().to_string(),
        exporter_state: exporter_state.map(|s| s.to_string()),
    })
}
