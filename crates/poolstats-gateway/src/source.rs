//! Stats source backed by a JSON snapshot file.

use std::path::{Path, PathBuf};

use poolstats_core::{Error, PoolSnapshot, Result, StatsSource};

/// Reads the pool snapshot from a JSON file on every sample.
///
/// The file holds one object with the six counters, e.g.
/// `{"hits": 5, "misses": 2, "timeouts": 0, "total_conns": 10, "idle_conns": 3, "stale_conns": 1}`.
/// Missing counters read as zero.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    /// Create a source for the given file. The file need not exist yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the snapshot file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StatsSource for JsonFileSource {
    fn pool_stats(&self) -> Result<PoolSnapshot> {
        let data = std::fs::read(&self.path)
            .map_err(|e| Error::Sampling(format!("{}: {}", self.path.display(), e)))?;
        serde_json::from_slice(&data)
            .map_err(|e| Error::Sampling(format!("{}: invalid snapshot: {}", self.path.display(), e)))
    }
}
