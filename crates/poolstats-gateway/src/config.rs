//! Gateway configuration.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use poolstats_core::{ExporterConfig, SharedRegistry};

/// Default address the scrape endpoint listens on.
pub const DEFAULT_LISTEN_ADDRESS: &str = "0.0.0.0:9121";

/// Default sampling interval in milliseconds.
pub const DEFAULT_INTERVAL_MS: u64 = 1000;

/// How pool stats reach the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportMode {
    /// Sample on a timer into registered gauges.
    Periodic,
    /// Sample inside every scrape.
    Pull,
}

impl ExportMode {
    /// Lowercase name, as accepted on the command line.
    pub fn as_str(self) -> &'static str {
        match self {
            ExportMode::Periodic => "periodic",
            ExportMode::Pull => "pull",
        }
    }
}

/// Pool stats gateway command line arguments.
#[derive(Debug, Parser)]
#[command(name = "poolstats-gateway")]
#[command(version, about = "Prometheus scrape endpoint for connection pool statistics")]
pub struct Args {
    /// Address to listen on for scrapes.
    #[arg(short, long, default_value = DEFAULT_LISTEN_ADDRESS)]
    pub listen: String,

    /// JSON file holding the latest pool stats snapshot.
    #[arg(short, long)]
    pub stats_file: PathBuf,

    /// Metric namespace (default prefix is go_redis_pool_stats_).
    #[arg(long)]
    pub namespace: Option<String>,

    /// Metric subsystem.
    #[arg(long)]
    pub subsystem: Option<String>,

    /// Sampling interval in milliseconds (periodic mode).
    #[arg(long, default_value_t = DEFAULT_INTERVAL_MS)]
    pub interval_ms: u64,

    /// Export mode.
    #[arg(long, value_enum, default_value_t = ExportMode::Periodic)]
    pub mode: ExportMode,
}

/// Gateway configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Address to listen on for scrapes.
    pub listen_addr: String,
    /// JSON file holding the latest pool stats snapshot.
    pub stats_file: PathBuf,
    /// Metric namespace.
    pub namespace: Option<String>,
    /// Metric subsystem.
    pub subsystem: Option<String>,
    /// Sampling interval.
    pub interval: Duration,
    /// Export mode.
    pub mode: ExportMode,
}

impl GatewayConfig {
    /// Exporter settings for periodic mode, registering with `registry`.
    pub fn exporter_config(&self, registry: SharedRegistry) -> ExporterConfig {
        let mut config = ExporterConfig::new()
            .with_interval(self.interval)
            .with_registry(registry);
        if let Some(namespace) = &self.namespace {
            config = config.with_namespace(namespace.clone());
        }
        if let Some(subsystem) = &self.subsystem {
            config = config.with_subsystem(subsystem.clone());
        }
        config
    }
}

impl From<&Args> for GatewayConfig {
    fn from(args: &Args) -> Self {
        Self {
            listen_addr: args.listen.clone(),
            stats_file: args.stats_file.clone(),
            namespace: args.namespace.clone(),
            subsystem: args.subsystem.clone(),
            interval: Duration::from_millis(args.interval_ms),
            mode: args.mode,
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listen_addr: DEFAULT_LISTEN_ADDRESS.to_string(),
            stats_file: PathBuf::from("pool-stats.json"),
            namespace: None,
            subsystem: None,
            interval: Duration::from_millis(DEFAULT_INTERVAL_MS),
            mode: ExportMode::Periodic,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_parse_defaults() {
        let args = Args::parse_from(["poolstats-gateway", "--stats-file", "/tmp/stats.json"]);
        let config = GatewayConfig::from(&args);

        assert_eq!(config.listen_addr, DEFAULT_LISTEN_ADDRESS);
        assert_eq!(config.stats_file, PathBuf::from("/tmp/stats.json"));
        assert_eq!(config.interval, Duration::from_secs(1));
        assert_eq!(config.mode, ExportMode::Periodic);
        assert!(config.namespace.is_none());
    }

    #[test]
    fn test_parse_overrides() {
        let args = Args::parse_from([
            "poolstats-gateway",
            "-s",
            "stats.json",
            "--listen",
            "127.0.0.1:9999",
            "--namespace",
            "shop",
            "--subsystem",
            "sessions",
            "--interval-ms",
            "250",
            "--mode",
            "pull",
        ]);
        let config = GatewayConfig::from(&args);

        assert_eq!(config.listen_addr, "127.0.0.1:9999");
        assert_eq!(config.namespace.as_deref(), Some("shop"));
        assert_eq!(config.subsystem.as_deref(), Some("sessions"));
        assert_eq!(config.interval, Duration::from_millis(250));
        assert_eq!(config.mode, ExportMode::Pull);
    }

    #[test]
    fn test_stats_file_is_required() {
        assert!(Args::try_parse_from(["poolstats-gateway"]).is_err());
    }

    #[test]
    fn test_exporter_config() {
        let config = GatewayConfig {
            namespace: Some("shop".to_string()),
            ..GatewayConfig::default()
        };
        let exporter = config.exporter_config(Arc::new(prometheus::Registry::new()));
        assert_eq!(exporter.metric_prefix(), "shop_");
        assert_eq!(exporter.interval, Duration::from_secs(1));

        let exporter = GatewayConfig::default().exporter_config(Arc::new(prometheus::Registry::new()));
        assert_eq!(exporter.metric_prefix(), "go_redis_pool_stats_");
    }
}
