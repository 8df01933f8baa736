//! Exporter configuration.

use std::time::Duration;

use crate::error::{Error, Result};
use crate::metrics::{default_registry, resolve_prefix, SharedRegistry};
use crate::ticker::Ticker;

/// Default sampling interval.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

/// Exporter configuration.
///
/// Every field is optional and defaults to the behaviour of an unconfigured
/// exporter: `go_redis_pool_stats_` metric names, one sample per second, the
/// process-global prometheus registry and a wall-clock ticker.
pub struct ExporterConfig {
    /// Metric namespace. Unset together with `subsystem` selects the default prefix.
    pub namespace: Option<String>,

    /// Metric subsystem.
    pub subsystem: Option<String>,

    /// Time between samples when no custom ticker is given.
    pub interval: Duration,

    /// Registry the gauges are registered with. `None` uses the global registry.
    pub registry: Option<SharedRegistry>,

    /// Custom tick source. `None` ticks every `interval` on the wall clock.
    pub ticker: Option<Box<dyn Ticker>>,
}

impl ExporterConfig {
    /// Create a configuration with all defaults.
    pub fn new() -> Self {
        Self {
            namespace: None,
            subsystem: None,
            interval: DEFAULT_INTERVAL,
            registry: None,
            ticker: None,
        }
    }

    /// Set the metric namespace. An empty string is the same as leaving it unset.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Set the metric subsystem. An empty string is the same as leaving it unset.
    pub fn with_subsystem(mut self, subsystem: impl Into<String>) -> Self {
        self.subsystem = Some(subsystem.into());
        self
    }

    /// Set the sampling interval.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Register gauges with the given registry instead of the global one.
    pub fn with_registry(mut self, registry: SharedRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Drive sampling from a custom ticker.
    pub fn with_ticker(mut self, ticker: impl Ticker + 'static) -> Self {
        self.ticker = Some(Box::new(ticker));
        self
    }

    /// The registry to use, falling back to the process-global one.
    pub fn registry(&self) -> SharedRegistry {
        self.registry.clone().unwrap_or_else(default_registry)
    }

    /// The metric name prefix these settings produce, e.g. `go_redis_pool_stats_`.
    pub fn metric_prefix(&self) -> String {
        let (namespace, subsystem) =
            resolve_prefix(self.namespace.as_deref(), self.subsystem.as_deref());
        [namespace, subsystem]
            .iter()
            .filter(|part| !part.is_empty())
            .map(|part| format!("{}_", part))
            .collect()
    }

    /// Check the settings before anything is registered.
    pub fn validate(&self) -> Result<()> {
        if self.ticker.is_none() && self.interval.is_zero() {
            return Err(Error::Config("sampling interval must be non-zero".to_string()));
        }
        Ok(())
    }
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ExporterConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExporterConfig")
            .field("namespace", &self.namespace)
            .field("subsystem", &self.subsystem)
            .field("interval", &self.interval)
            .field("custom_registry", &self.registry.is_some())
            .field("custom_ticker", &self.ticker.is_some())
            .finish()
    }
}
