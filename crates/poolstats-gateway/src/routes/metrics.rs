//! Prometheus scrape endpoint.

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use poolstats_core::LifecycleState;
use prometheus::{Encoder, TextEncoder};

use crate::error::AppError;
use crate::AppState;

/// Metrics routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/metrics", get(scrape))
}

/// Encode everything in the registry in the text exposition format.
async fn scrape(State(state): State<AppState>) -> Result<Response, AppError> {
    if let Some(exporter) = &state.exporter {
        let current = exporter.state();
        if current >= LifecycleState::Stopping {
            return Err(AppError::Unavailable(format!("exporter is {}", current)));
        }
    }

    let encoder = TextEncoder::new();
    let families = state.registry.gather();
    let mut buffer = Vec::new();
    encoder.encode(&families, &mut buffer)?;

    Ok(([(header::CONTENT_TYPE, encoder.format_type().to_string())], buffer).into_response())
}
