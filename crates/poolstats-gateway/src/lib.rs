//! Pool stats HTTP gateway.
//!
//! Serves the pool gauges in prometheus text format so a prometheus server can
//! scrape them. Stats are read from a JSON snapshot file, either on a timer
//! (periodic mode) or at scrape time (pull mode).

pub mod config;
pub mod error;
pub mod json;
pub mod routes;
pub mod source;

pub use config::{Args, ExportMode, GatewayConfig};
pub use error::AppError;
pub use source::JsonFileSource;

use std::sync::Arc;

use axum::Router;
use poolstats_core::{Error, Exporter, ExporterHandle, ExporterObserver, PoolStatsCollector};
use tower_http::trace::TraceLayer;

/// Application state shared across all routes.
#[derive(Clone)]
pub struct AppState {
    /// Registry served on `/metrics`.
    pub registry: prometheus::Registry,
    /// Gateway configuration.
    pub config: GatewayConfig,
    /// View of the periodic exporter; `None` in pull mode.
    pub exporter: Option<ExporterObserver>,
}

impl AppState {
    /// Create new application state.
    pub fn new(
        registry: prometheus::Registry,
        config: GatewayConfig,
        exporter: Option<ExporterObserver>,
    ) -> Self {
        Self {
            registry,
            config,
            exporter,
        }
    }
}

/// Create the router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(routes::health::routes())
        .merge(routes::metrics::routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Hook the stats file up to `registry` according to the configured mode.
///
/// Periodic mode returns the running exporter's handle; pull mode registers a
/// scrape-time collector and returns `None`.
pub fn start_export(
    config: &GatewayConfig,
    registry: &prometheus::Registry,
) -> poolstats_core::Result<Option<ExporterHandle>> {
    let source = JsonFileSource::new(&config.stats_file);

    match config.mode {
        ExportMode::Periodic => {
            let exporter_config = config.exporter_config(Arc::new(registry.clone()));
            let handle = Exporter::new(source, exporter_config).start()?;
            Ok(Some(handle))
        }
        ExportMode::Pull => {
            let collector = PoolStatsCollector::with_prefix(
                source,
                config.namespace.as_deref(),
                config.subsystem.as_deref(),
            )?;
            let name = collector
                .metrics()
                .gauges()
                .first()
                .map(|gauge| gauge.name().to_string())
                .unwrap_or_default();

            registry.register(Box::new(collector)).map_err(|e| match e {
                prometheus::Error::AlreadyReg => Error::RegistrationConflict { name },
                other => Error::Registration {
                    name,
                    reason: other.to_string(),
                },
            })?;
            Ok(None)
        }
    }
}
