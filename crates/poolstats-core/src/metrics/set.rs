//! The six pool gauges and their descriptors.

use prometheus::core::Collector;
use prometheus::{IntGauge, Opts};

use crate::error::{Error, Result};
use crate::stats::{PoolSnapshot, PoolStat};

/// Namespace used when neither namespace nor subsystem is configured.
pub const DEFAULT_NAMESPACE: &str = "go_redis";

/// Subsystem used when neither namespace nor subsystem is configured.
pub const DEFAULT_SUBSYSTEM: &str = "pool_stats";

/// Kind of exported metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    /// A value that can go up and down.
    Gauge,
}

/// Name, help text and kind of one exported metric.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricDescriptor {
    /// Fully-qualified name (`namespace_subsystem_name`).
    pub name: String,
    /// Help text.
    pub help: &'static str,
    /// Metric kind.
    pub kind: MetricKind,
}

/// Resolve the namespace and subsystem actually used for metric names.
///
/// An empty string counts as unset. Leaving both unset selects the
/// `go_redis_pool_stats_` prefix; setting either one opts out of the default.
pub fn resolve_prefix(namespace: Option<&str>, subsystem: Option<&str>) -> (String, String) {
    let namespace = namespace.filter(|ns| !ns.is_empty());
    let subsystem = subsystem.filter(|sub| !sub.is_empty());
    match (namespace, subsystem) {
        (None, None) => (DEFAULT_NAMESPACE.to_string(), DEFAULT_SUBSYSTEM.to_string()),
        (ns, sub) => (
            ns.unwrap_or_default().to_string(),
            sub.unwrap_or_default().to_string(),
        ),
    }
}

/// A gauge bound to one pool stat.
///
/// Cloning is cheap and clones share the same value cell.
#[derive(Clone)]
pub struct PoolGauge {
    stat: PoolStat,
    descriptor: MetricDescriptor,
    gauge: IntGauge,
}

impl PoolGauge {
    fn new(stat: PoolStat, namespace: &str, subsystem: &str) -> Result<Self> {
        let opts = Opts::new(stat.name(), stat.help())
            .namespace(namespace)
            .subsystem(subsystem);
        let name = opts.fq_name();
        let gauge = IntGauge::with_opts(opts)
            .map_err(|e| Error::InvalidMetric(format!("{}: {}", name, e)))?;

        Ok(Self {
            stat,
            descriptor: MetricDescriptor {
                name,
                help: stat.help(),
                kind: MetricKind::Gauge,
            },
            gauge,
        })
    }

    /// The stat this gauge reports.
    pub fn stat(&self) -> PoolStat {
        self.stat
    }

    /// The metric descriptor.
    pub fn descriptor(&self) -> &MetricDescriptor {
        &self.descriptor
    }

    /// Fully-qualified metric name.
    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    /// Set the current value.
    pub fn set(&self, value: u64) {
        self.gauge.set(i64::try_from(value).unwrap_or(i64::MAX));
    }

    /// Read the current value.
    pub fn get(&self) -> u64 {
        u64::try_from(self.gauge.get()).unwrap_or(0)
    }

    /// The underlying prometheus gauge.
    pub fn as_prometheus(&self) -> &IntGauge {
        &self.gauge
    }

    /// A boxed collector suitable for `prometheus::Registry::{register, unregister}`.
    pub fn collector(&self) -> Box<dyn Collector> {
        Box::new(self.gauge.clone())
    }
}

impl std::fmt::Debug for PoolGauge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolGauge")
            .field("name", &self.descriptor.name)
            .field("value", &self.gauge.get())
            .finish()
    }
}

/// The full set of six pool gauges sharing one namespace and subsystem.
#[derive(Debug, Clone)]
pub struct PoolMetrics {
    gauges: Vec<PoolGauge>,
}

impl PoolMetrics {
    /// Build the six gauges. Nothing is registered.
    pub fn new(namespace: Option<&str>, subsystem: Option<&str>) -> Result<Self> {
        let (namespace, subsystem) = resolve_prefix(namespace, subsystem);
        let gauges = PoolStat::ALL
            .iter()
            .map(|stat| PoolGauge::new(*stat, &namespace, &subsystem))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { gauges })
    }

    /// Gauges in canonical order (hits, misses, timeouts, total, idle, stale).
    pub fn gauges(&self) -> &[PoolGauge] {
        &self.gauges
    }

    /// Descriptors in canonical order.
    pub fn descriptors(&self) -> Vec<&MetricDescriptor> {
        self.gauges.iter().map(PoolGauge::descriptor).collect()
    }

    /// The gauge for one stat.
    pub fn get(&self, stat: PoolStat) -> &PoolGauge {
        &self.gauges[stat as usize]
    }

    /// Write every counter of `snapshot` into its gauge.
    pub fn record(&self, snapshot: &PoolSnapshot) {
        for gauge in &self.gauges {
            gauge.set(snapshot.get(gauge.stat));
        }
    }

    /// Current gauge values.
    pub fn values(&self) -> PoolSnapshot {
        let mut snapshot = PoolSnapshot::default();
        for gauge in &self.gauges {
            snapshot.set(gauge.stat, gauge.get());
        }
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_prefix() {
        let metrics = PoolMetrics::new(None, None).unwrap();
        let names: Vec<_> = metrics.gauges().iter().map(|g| g.name().to_string()).collect();
        assert_eq!(
            names,
            vec![
                "go_redis_pool_stats_hits",
                "go_redis_pool_stats_misses",
                "go_redis_pool_stats_timeouts",
                "go_redis_pool_stats_total_conns",
                "go_redis_pool_stats_idle_conns",
                "go_redis_pool_stats_stale_conns",
            ]
        );
    }

    #[test]
    fn test_custom_prefix() {
        let metrics = PoolMetrics::new(Some("app"), Some("cache")).unwrap();
        assert_eq!(metrics.get(PoolStat::Hits).name(), "app_cache_hits");

        let metrics = PoolMetrics::new(Some("app"), None).unwrap();
        assert_eq!(metrics.get(PoolStat::IdleConns).name(), "app_idle_conns");

        let metrics = PoolMetrics::new(None, Some("pool")).unwrap();
        assert_eq!(metrics.get(PoolStat::Misses).name(), "pool_misses");

        let metrics = PoolMetrics::new(Some(""), Some("pool")).unwrap();
        assert_eq!(metrics.get(PoolStat::Timeouts).name(), "pool_timeouts");
    }

    #[test]
    fn test_empty_prefix_parts_keep_default() {
        let metrics = PoolMetrics::new(Some(""), Some("")).unwrap();
        assert_eq!(
            metrics.get(PoolStat::Timeouts).name(),
            "go_redis_pool_stats_timeouts"
        );

        let metrics = PoolMetrics::new(Some(""), None).unwrap();
        assert_eq!(metrics.get(PoolStat::Hits).name(), "go_redis_pool_stats_hits");
    }

    #[test]
    fn test_descriptors() {
        let metrics = PoolMetrics::new(None, None).unwrap();
        let descriptors = metrics.descriptors();
        assert_eq!(descriptors.len(), 6);
        assert!(descriptors.iter().all(|d| d.kind == MetricKind::Gauge));
        assert_eq!(
            descriptors[3].help,
            "Number of total connections in the pool."
        );
    }

    #[test]
    fn test_invalid_name() {
        let err = PoolMetrics::new(Some("bad-namespace"), None).unwrap_err();
        assert!(matches!(err, Error::InvalidMetric(_)));
    }

    #[test]
    fn test_record_and_read() {
        let metrics = PoolMetrics::new(None, None).unwrap();
        assert_eq!(metrics.values(), PoolSnapshot::default());

        let snapshot = PoolSnapshot {
            hits: 5,
            misses: 2,
            timeouts: 0,
            total_conns: 10,
            idle_conns: 3,
            stale_conns: 1,
        };
        metrics.record(&snapshot);
        assert_eq!(metrics.values(), snapshot);
        assert_eq!(metrics.get(PoolStat::TotalConns).as_prometheus().get(), 10);
    }

    #[test]
    fn test_clones_share_values() {
        let metrics = PoolMetrics::new(None, None).unwrap();
        let clone = metrics.clone();
        metrics.get(PoolStat::Hits).set(42);
        assert_eq!(clone.get(PoolStat::Hits).get(), 42);
    }

    #[test]
    fn test_values_saturate() {
        let metrics = PoolMetrics::new(None, None).unwrap();
        metrics.get(PoolStat::Hits).set(u64::MAX);
        assert_eq!(metrics.get(PoolStat::Hits).get(), i64::MAX as u64);
    }
}
