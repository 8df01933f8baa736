//! Pool stats gateway binary.

use clap::Parser;
use poolstats_gateway::{create_router, start_export, AppState, Args, GatewayConfig};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "poolstats_gateway=info,poolstats_core=info".into()),
        )
        .init();

    // Parse command line args
    let args = Args::parse();
    let config = GatewayConfig::from(&args);

    info!(
        listen = %config.listen_addr,
        stats_file = %config.stats_file.display(),
        mode = config.mode.as_str(),
        interval_ms = config.interval.as_millis() as u64,
        "Starting pool stats gateway"
    );

    let registry = prometheus::Registry::new();
    let mut exporter = start_export(&config, &registry)?;
    let observer = exporter.as_ref().map(|handle| handle.observer());

    let state = AppState::new(registry, config.clone(), observer);
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    info!("Gateway listening on {}", config.listen_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(handle) = exporter.as_mut() {
        handle.stop().await;
    }
    info!("Gateway stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
