//! Registry adapter.
//!
//! The exporter only needs two capabilities from a metrics registry: adding a
//! gauge and removing it again. [`Registry`] captures those, and is implemented
//! for `prometheus::Registry` so any prometheus registry (the process-global one
//! included) can be injected.

use std::sync::Arc;

use tracing::{debug, warn};

use super::set::{PoolGauge, PoolMetrics};
use crate::error::{Error, Result};

/// A metrics sink the exporter registers its gauges with.
pub trait Registry: Send + Sync {
    /// Register a gauge. Fails if a metric with the same name is present.
    fn register(&self, gauge: &PoolGauge) -> Result<()>;

    /// Remove a gauge. Returns true if it was registered.
    fn unregister(&self, gauge: &PoolGauge) -> bool;
}

impl Registry for prometheus::Registry {
    fn register(&self, gauge: &PoolGauge) -> Result<()> {
        prometheus::Registry::register(self, gauge.collector()).map_err(|e| match e {
            prometheus::Error::AlreadyReg => Error::RegistrationConflict {
                name: gauge.name().to_string(),
            },
            other => Error::Registration {
                name: gauge.name().to_string(),
                reason: other.to_string(),
            },
        })
    }

    fn unregister(&self, gauge: &PoolGauge) -> bool {
        prometheus::Registry::unregister(self, gauge.collector()).is_ok()
    }
}

impl<T: Registry + ?Sized> Registry for Arc<T> {
    fn register(&self, gauge: &PoolGauge) -> Result<()> {
        (**self).register(gauge)
    }

    fn unregister(&self, gauge: &PoolGauge) -> bool {
        (**self).unregister(gauge)
    }
}

/// Shared registry handle.
pub type SharedRegistry = Arc<dyn Registry>;

/// Handle on the process-global prometheus registry.
pub fn default_registry() -> SharedRegistry {
    Arc::new(prometheus::default_registry().clone())
}

/// Register every gauge of `metrics`, all or nothing.
///
/// If any registration fails, the gauges registered so far are removed again
/// before the error is returned.
pub fn register_all(registry: &dyn Registry, metrics: &PoolMetrics) -> Result<()> {
    let mut registered: Vec<&PoolGauge> = Vec::with_capacity(metrics.gauges().len());

    for gauge in metrics.gauges() {
        if let Err(e) = registry.register(gauge) {
            warn!(
                metric = %gauge.name(),
                error = %e,
                rolled_back = registered.len(),
                "Metric registration failed, rolling back"
            );
            for done in registered.iter().rev() {
                if !registry.unregister(done) {
                    warn!(metric = %done.name(), "Rollback could not unregister metric");
                }
            }
            return Err(e);
        }
        registered.push(gauge);
    }

    debug!(count = registered.len(), "Registered pool metrics");
    Ok(())
}

/// Unregister every gauge of `metrics`, continuing past failures.
///
/// Returns the number of gauges that were actually removed.
pub fn unregister_all(registry: &dyn Registry, metrics: &PoolMetrics) -> usize {
    let mut removed = 0;
    for gauge in metrics.gauges() {
        if registry.unregister(gauge) {
            removed += 1;
        } else {
            warn!(metric = %gauge.name(), "Metric was not registered at teardown");
        }
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::PoolStat;

    fn family_names(registry: &prometheus::Registry) -> Vec<String> {
        registry
            .gather()
            .iter()
            .map(|family| family.get_name().to_string())
            .collect()
    }

    #[test]
    fn test_register_and_unregister() {
        let registry = prometheus::Registry::new();
        let metrics = PoolMetrics::new(Some("reg"), Some("basic")).unwrap();
        let gauge = metrics.get(PoolStat::Hits);

        Registry::register(&registry, gauge).unwrap();
        assert_eq!(family_names(&registry), vec!["reg_basic_hits"]);

        assert!(Registry::unregister(&registry, gauge));
        assert!(!Registry::unregister(&registry, gauge));
        assert!(family_names(&registry).is_empty());
    }

    #[test]
    fn test_conflict() {
        let registry = prometheus::Registry::new();
        let first = PoolMetrics::new(Some("reg"), Some("conflict")).unwrap();
        let second = PoolMetrics::new(Some("reg"), Some("conflict")).unwrap();

        Registry::register(&registry, first.get(PoolStat::Misses)).unwrap();
        let err = Registry::register(&registry, second.get(PoolStat::Misses)).unwrap_err();
        match err {
            Error::RegistrationConflict { name } => assert_eq!(name, "reg_conflict_misses"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_register_all_rolls_back() {
        let registry = prometheus::Registry::new();
        let blocker = PoolMetrics::new(Some("reg"), Some("rollback")).unwrap();
        Registry::register(&registry, blocker.get(PoolStat::IdleConns)).unwrap();

        let metrics = PoolMetrics::new(Some("reg"), Some("rollback")).unwrap();
        let err = register_all(&registry, &metrics).unwrap_err();
        assert!(matches!(err, Error::RegistrationConflict { .. }));

        assert_eq!(family_names(&registry), vec!["reg_rollback_idle_conns"]);
    }

    #[test]
    fn test_unregister_all_counts() {
        let registry = prometheus::Registry::new();
        let metrics = PoolMetrics::new(Some("reg"), Some("teardown")).unwrap();
        register_all(&registry, &metrics).unwrap();
        assert_eq!(family_names(&registry).len(), 6);

        Registry::unregister(&registry, metrics.get(PoolStat::Timeouts));
        assert_eq!(unregister_all(&registry, &metrics), 5);
        assert!(family_names(&registry).is_empty());
    }

    #[test]
    fn test_shared_registry() {
        let inner = prometheus::Registry::new();
        let shared: SharedRegistry = Arc::new(inner.clone());
        let metrics = PoolMetrics::new(Some("reg"), Some("shared")).unwrap();

        register_all(shared.as_ref(), &metrics).unwrap();
        assert_eq!(family_names(&inner).len(), 6);
    }
}
