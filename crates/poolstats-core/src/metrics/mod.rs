//! Pool gauges and the registry they are exported through.
//!
//! # Usage
//!
//! ```ignore
//! use poolstats_core::metrics::{register_all, PoolMetrics};
//!
//! let registry = prometheus::Registry::new();
//! let metrics = PoolMetrics::new(Some("myapp"), Some("db_pool"))?;
//!
//! // All six gauges or none
//! register_all(&registry, &metrics)?;
//!
//! metrics.record(&snapshot);
//! ```

mod registry;
mod set;

pub use registry::{default_registry, register_all, unregister_all, Registry, SharedRegistry};
pub use set::{
    resolve_prefix, MetricDescriptor, MetricKind, PoolGauge, PoolMetrics, DEFAULT_NAMESPACE,
    DEFAULT_SUBSYSTEM,
};
