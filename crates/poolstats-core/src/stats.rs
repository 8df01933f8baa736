//! Pool statistics snapshots and the sources that produce them.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Counters reported by a connection pool at one instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolSnapshot {
    /// Number of times a free connection was found in the pool.
    pub hits: u64,
    /// Number of times a free connection was not found in the pool.
    pub misses: u64,
    /// Number of times a wait timeout occurred.
    pub timeouts: u64,
    /// Number of total connections in the pool.
    pub total_conns: u64,
    /// Number of idle connections in the pool.
    pub idle_conns: u64,
    /// Number of stale connections removed from the pool.
    pub stale_conns: u64,
}

impl PoolSnapshot {
    /// Read the counter for a single stat.
    pub fn get(&self, stat: PoolStat) -> u64 {
        match stat {
            PoolStat::Hits => self.hits,
            PoolStat::Misses => self.misses,
            PoolStat::Timeouts => self.timeouts,
            PoolStat::TotalConns => self.total_conns,
            PoolStat::IdleConns => self.idle_conns,
            PoolStat::StaleConns => self.stale_conns,
        }
    }

    /// Set the counter for a single stat.
    pub fn set(&mut self, stat: PoolStat, value: u64) {
        match stat {
            PoolStat::Hits => self.hits = value,
            PoolStat::Misses => self.misses = value,
            PoolStat::Timeouts => self.timeouts = value,
            PoolStat::TotalConns => self.total_conns = value,
            PoolStat::IdleConns => self.idle_conns = value,
            PoolStat::StaleConns => self.stale_conns = value,
        }
    }

    /// Reject snapshots whose connection counts contradict each other.
    pub fn validate(&self) -> Result<()> {
        if self.idle_conns > self.total_conns {
            return Err(Error::InconsistentStats(format!(
                "idle connections ({}) exceed total connections ({})",
                self.idle_conns, self.total_conns
            )));
        }
        Ok(())
    }
}

/// One of the six exported pool counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PoolStat {
    /// Free connection found.
    Hits,
    /// Free connection not found.
    Misses,
    /// Wait timeouts.
    Timeouts,
    /// Total connections.
    TotalConns,
    /// Idle connections.
    IdleConns,
    /// Stale connections removed.
    StaleConns,
}

impl PoolStat {
    /// All stats, in the order they are written on every sample.
    pub const ALL: [PoolStat; 6] = [
        PoolStat::Hits,
        PoolStat::Misses,
        PoolStat::Timeouts,
        PoolStat::TotalConns,
        PoolStat::IdleConns,
        PoolStat::StaleConns,
    ];

    /// Metric base name, appended to the namespace/subsystem prefix.
    pub fn name(self) -> &'static str {
        match self {
            PoolStat::Hits => "hits",
            PoolStat::Misses => "misses",
            PoolStat::Timeouts => "timeouts",
            PoolStat::TotalConns => "total_conns",
            PoolStat::IdleConns => "idle_conns",
            PoolStat::StaleConns => "stale_conns",
        }
    }

    /// Help text exposed with the metric.
    pub fn help(self) -> &'static str {
        match self {
            PoolStat::Hits => "Number of times free connection was found in the pool.",
            PoolStat::Misses => "Number of times free connection was NOT found in the pool.",
            PoolStat::Timeouts => "Number of times a wait timeout occurred.",
            PoolStat::TotalConns => "Number of total connections in the pool.",
            PoolStat::IdleConns => "Number of idle connections in the pool.",
            PoolStat::StaleConns => "Number of stale connections removed from the pool.",
        }
    }
}

/// Anything that can report pool statistics on demand.
///
/// Implementations should return quickly and never panic. A failed read is
/// reported as an error; the sampling task skips that tick and keeps the
/// previously exported values.
pub trait StatsSource: Send + Sync {
    /// Capture the current pool counters.
    fn pool_stats(&self) -> Result<PoolSnapshot>;
}

impl<T: StatsSource + ?Sized> StatsSource for Arc<T> {
    fn pool_stats(&self) -> Result<PoolSnapshot> {
        (**self).pool_stats()
    }
}

impl<T: StatsSource + ?Sized> StatsSource for Box<T> {
    fn pool_stats(&self) -> Result<PoolSnapshot> {
        (**self).pool_stats()
    }
}

/// Adapts an infallible closure into a [`StatsSource`].
///
/// ```ignore
/// let source = FnSource::new(move || pool.stats().into());
/// ```
pub struct FnSource<F> {
    read: F,
}

impl<F> FnSource<F>
where
    F: Fn() -> PoolSnapshot + Send + Sync,
{
    /// Wrap a closure returning the current snapshot.
    pub fn new(read: F) -> Self {
        Self { read }
    }
}

impl<F> StatsSource for FnSource<F>
where
    F: Fn() -> PoolSnapshot + Send + Sync,
{
    fn pool_stats(&self) -> Result<PoolSnapshot> {
        Ok((self.read)())
    }
}

impl<F> std::fmt::Debug for FnSource<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnSource").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PoolSnapshot {
        PoolSnapshot {
            hits: 5,
            misses: 2,
            timeouts: 0,
            total_conns: 10,
            idle_conns: 3,
            stale_conns: 1,
        }
    }

    #[test]
    fn test_get_and_set() {
        let mut snapshot = PoolSnapshot::default();
        for (i, stat) in PoolStat::ALL.iter().enumerate() {
            snapshot.set(*stat, i as u64 + 1);
        }
        assert_eq!(snapshot.hits, 1);
        assert_eq!(snapshot.stale_conns, 6);
        assert_eq!(snapshot.get(PoolStat::TotalConns), 4);
    }

    #[test]
    fn test_validate() {
        assert!(sample().validate().is_ok());

        let broken = PoolSnapshot {
            idle_conns: 11,
            ..sample()
        };
        let err = broken.validate().unwrap_err();
        assert!(matches!(err, Error::InconsistentStats(_)));
    }

    #[test]
    fn test_names_are_unique() {
        let mut names: Vec<_> = PoolStat::ALL.iter().map(|s| s.name()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), 6);
    }

    #[test]
    fn test_json_roundtrip_with_missing_fields() {
        let snapshot: PoolSnapshot =
            serde_json::from_str(r#"{"hits": 7, "total_conns": 4}"#).unwrap();
        assert_eq!(snapshot.hits, 7);
        assert_eq!(snapshot.total_conns, 4);
        assert_eq!(snapshot.misses, 0);
    }

    #[test]
    fn test_fn_source() {
        let source = FnSource::new(sample);
        assert_eq!(source.pool_stats().unwrap(), sample());

        let shared: Arc<dyn StatsSource> = Arc::new(FnSource::new(sample));
        assert_eq!(shared.pool_stats().unwrap().hits, 5);
    }
}
