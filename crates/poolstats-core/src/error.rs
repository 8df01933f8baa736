//! Core error types.

use thiserror::Error;

/// Errors produced while exporting pool statistics.
#[derive(Debug, Error)]
pub enum Error {
    /// A metric with the same name is already present in the registry.
    #[error("metric {name} is already registered")]
    RegistrationConflict {
        /// Fully-qualified metric name.
        name: String,
    },

    /// The registry rejected a metric for a reason other than a name conflict.
    #[error("failed to register metric {name}: {reason}")]
    Registration {
        /// Fully-qualified metric name.
        name: String,
        /// Reason reported by the registry.
        reason: String,
    },

    /// A metric could not be constructed (bad name or help text).
    #[error("invalid metric: {0}")]
    InvalidMetric(String),

    /// The stats source failed to produce a snapshot.
    #[error("failed to read pool stats: {0}")]
    Sampling(String),

    /// The stats source produced a snapshot that does not add up.
    #[error("inconsistent pool stats: {0}")]
    InconsistentStats(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// The sampling task needs a tokio runtime and none is running.
    #[error("no tokio runtime available to run the sampling task")]
    NoRuntime,

    /// The tokio runtime has no time driver, so the interval ticker cannot run.
    #[error("tokio runtime has timers disabled; enable them or configure a custom ticker")]
    TimersDisabled,
}

impl Error {
    /// Whether the error only affects a single sample and sampling may continue.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Sampling(_) | Error::InconsistentStats(_))
    }
}

/// Result alias for pool statistics operations.
pub type Result<T> = std::result::Result<T, Error>;
