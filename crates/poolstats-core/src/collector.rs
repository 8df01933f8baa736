//! Scrape-time collector.
//!
//! [`PoolStatsCollector`] samples the stats source inside every scrape instead
//! of on a timer. There is no background task and no ticker; the registry owns
//! the collector once it is registered.

use std::sync::Arc;

use parking_lot::Mutex;
use prometheus::core::{Collector, Desc};
use prometheus::proto::{Gauge, Metric, MetricFamily, MetricType};
use tracing::warn;

use crate::error::Result;
use crate::metrics::{MetricDescriptor, PoolMetrics};
use crate::stats::{PoolSnapshot, StatsSource};

/// Prometheus collector reporting pool stats at scrape time.
///
/// Every scrape builds its families from its own snapshot, so concurrent
/// scrapes never mix values from two reads.
pub struct PoolStatsCollector {
    source: Arc<dyn StatsSource>,
    metrics: PoolMetrics,
    last: Mutex<Option<PoolSnapshot>>,
}

impl PoolStatsCollector {
    /// Create a collector using the default `go_redis_pool_stats_` names.
    pub fn new(source: impl StatsSource + 'static) -> Result<Self> {
        Self::with_prefix(source, None, None)
    }

    /// Create a collector with an explicit namespace and subsystem.
    pub fn with_prefix(
        source: impl StatsSource + 'static,
        namespace: Option<&str>,
        subsystem: Option<&str>,
    ) -> Result<Self> {
        Ok(Self {
            source: Arc::new(source),
            metrics: PoolMetrics::new(namespace, subsystem)?,
            last: Mutex::new(None),
        })
    }

    /// The metric set providing names and descriptors.
    pub fn metrics(&self) -> &PoolMetrics {
        &self.metrics
    }

    /// The snapshot reported by the most recent successful scrape.
    pub fn last_snapshot(&self) -> Option<PoolSnapshot> {
        *self.last.lock()
    }
}

fn gauge_family(descriptor: &MetricDescriptor, value: u64) -> MetricFamily {
    let mut gauge = Gauge::default();
    gauge.set_value(i64::try_from(value).unwrap_or(i64::MAX) as f64);

    let mut metric = Metric::default();
    metric.set_gauge(gauge);

    let mut family = MetricFamily::default();
    family.set_name(descriptor.name.clone());
    family.set_help(descriptor.help.to_string());
    family.set_field_type(MetricType::GAUGE);
    family.mut_metric().push(metric);
    family
}

impl Collector for PoolStatsCollector {
    fn desc(&self) -> Vec<&Desc> {
        self.metrics
            .gauges()
            .iter()
            .flat_map(|gauge| gauge.as_prometheus().desc())
            .collect()
    }

    fn collect(&self) -> Vec<MetricFamily> {
        let snapshot = self
            .source
            .pool_stats()
            .and_then(|snapshot| snapshot.validate().map(|()| snapshot));

        match snapshot {
            Ok(snapshot) => {
                *self.last.lock() = Some(snapshot);
                self.metrics
                    .gauges()
                    .iter()
                    .map(|gauge| gauge_family(gauge.descriptor(), snapshot.get(gauge.stat())))
                    .collect()
            }
            Err(e) => {
                warn!(error = %e, "Pool stats unavailable for scrape");
                Vec::new()
            }
        }
    }
}

impl std::fmt::Debug for PoolStatsCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolStatsCollector")
            .field("metrics", &self.metrics)
            .field("last", &self.last_snapshot())
            .finish_non_exhaustive()
    }
}
