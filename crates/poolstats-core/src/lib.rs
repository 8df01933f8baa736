//! poolstats core - connection pool statistics as prometheus gauges.
//!
//! A stats source reports six pool counters (hits, misses, timeouts, total,
//! idle and stale connections). This crate samples them on a ticker and keeps
//! six registered gauges up to date, or samples them at scrape time through a
//! collector.
//!
//! # Quick Start
//!
//! ```ignore
//! use poolstats_core::{Exporter, ExporterConfig, FnSource, PoolSnapshot};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let source = FnSource::new(move || PoolSnapshot {
//!         hits: pool.hits(),
//!         ..Default::default()
//!     });
//!
//!     let mut handle = Exporter::new(source, ExporterConfig::new()).start()?;
//!
//!     // go_redis_pool_stats_* gauges are now in the global registry
//!
//!     handle.stop().await;
//!     Ok(())
//! }
//! ```

pub mod collector;
pub mod config;
pub mod error;
pub mod exporter;
pub mod metrics;
pub mod stats;
pub mod ticker;

pub use collector::PoolStatsCollector;
pub use config::{ExporterConfig, DEFAULT_INTERVAL};
pub use error::{Error, Result};
pub use exporter::{start, Exporter, ExporterHandle, ExporterObserver, LifecycleState};
pub use metrics::{
    default_registry, MetricDescriptor, MetricKind, PoolGauge, PoolMetrics, Registry,
    SharedRegistry,
};
pub use stats::{FnSource, PoolSnapshot, PoolStat, StatsSource};
pub use ticker::{IntervalTicker, ManualTicker, TickController, Ticker};

/// Re-export of the prometheus crate the gauges are built on.
pub use prometheus;
