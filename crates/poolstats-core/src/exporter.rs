//! Exporter lifecycle: registration, background sampling and teardown.
//!
//! An [`Exporter`] is started exactly once. Starting registers the six pool
//! gauges (all or nothing) and spawns one sampling task on the current tokio
//! runtime. The returned [`ExporterHandle`] stops the task and unregisters
//! the gauges.
//!
//! ```ignore
//! let config = ExporterConfig::new().with_namespace("myapp");
//! let mut handle = Exporter::new(source, config).start()?;
//!
//! // ... serve scrapes ...
//!
//! handle.stop().await;
//! ```

use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::ExporterConfig;
use crate::error::{Error, Result};
use crate::metrics::{register_all, unregister_all, PoolMetrics, SharedRegistry};
use crate::stats::{PoolSnapshot, StatsSource};
use crate::ticker::{next_tick, IntervalTicker, Ticker};

/// Lifecycle state of an exporter. States only ever move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LifecycleState {
    /// Created, not started.
    Idle,
    /// Registering gauges.
    Starting,
    /// Sampling task running.
    Running,
    /// Stop requested, task winding down.
    Stopping,
    /// Task exited and gauges unregistered. Terminal.
    Stopped,
}

impl LifecycleState {
    /// Lowercase name, for logs and status output.
    pub fn as_str(self) -> &'static str {
        match self {
            LifecycleState::Idle => "idle",
            LifecycleState::Starting => "starting",
            LifecycleState::Running => "running",
            LifecycleState::Stopping => "stopping",
            LifecycleState::Stopped => "stopped",
        }
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
struct StateCell(Arc<Mutex<LifecycleState>>);

impl StateCell {
    fn new() -> Self {
        Self(Arc::new(Mutex::new(LifecycleState::Idle)))
    }

    fn get(&self) -> LifecycleState {
        *self.0.lock()
    }

    fn advance(&self, to: LifecycleState) {
        let mut state = self.0.lock();
        if to > *state {
            debug!(from = state.as_str(), to = to.as_str(), "Exporter state change");
            *state = to;
        }
    }
}

/// Samples a stats source into registered gauges until stopped.
pub struct Exporter {
    source: Arc<dyn StatsSource>,
    config: ExporterConfig,
    state: StateCell,
}

impl Exporter {
    /// Create an exporter. Nothing is registered until [`Exporter::start`].
    pub fn new(source: impl StatsSource + 'static, config: ExporterConfig) -> Self {
        Self {
            source: Arc::new(source),
            config,
            state: StateCell::new(),
        }
    }

    /// Register the gauges and spawn the sampling task.
    ///
    /// Must be called from within a tokio runtime. On error nothing stays
    /// registered and no task is spawned.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] for a zero interval without a custom ticker.
    /// - [`Error::NoRuntime`] outside a tokio runtime.
    /// - [`Error::TimersDisabled`] when the runtime has no time driver and no
    ///   custom ticker is configured.
    /// - [`Error::InvalidMetric`], [`Error::RegistrationConflict`] or
    ///   [`Error::Registration`] when the gauges cannot be built or registered.
    pub fn start(self) -> Result<ExporterHandle> {
        self.start_until(std::future::pending::<()>())
    }

    /// Like [`Exporter::start`], but the task also stops (and tears down) when
    /// `shutdown` completes.
    pub fn start_until<F>(self, shutdown: F) -> Result<ExporterHandle>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let Exporter {
            source,
            config,
            state,
        } = self;

        state.advance(LifecycleState::Starting);
        let result = launch(source, config, state.clone(), shutdown);
        if let Err(e) = &result {
            warn!(error = %e, "Pool stats exporter failed to start");
            state.advance(LifecycleState::Stopped);
        }
        result
    }
}

impl std::fmt::Debug for Exporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Exporter")
            .field("config", &self.config)
            .field("state", &self.state.get())
            .finish()
    }
}

/// Start exporting `source` with `config`. Shorthand for `Exporter::new(..).start()`.
pub fn start(source: impl StatsSource + 'static, config: ExporterConfig) -> Result<ExporterHandle> {
    Exporter::new(source, config).start()
}

fn launch<F>(
    source: Arc<dyn StatsSource>,
    config: ExporterConfig,
    state: StateCell,
    shutdown: F,
) -> Result<ExporterHandle>
where
    F: Future<Output = ()> + Send + 'static,
{
    config.validate()?;
    let runtime = tokio::runtime::Handle::try_current().map_err(|_| Error::NoRuntime)?;

    let prefix = config.metric_prefix();
    let registry = config.registry();
    let metrics = PoolMetrics::new(config.namespace.as_deref(), config.subsystem.as_deref())?;

    let custom_ticker = config.ticker.is_some();
    let ticker: Box<dyn Ticker> = match config.ticker {
        Some(ticker) => ticker,
        None => Box::new(IntervalTicker::try_new(config.interval)?),
    };

    register_all(registry.as_ref(), &metrics)?;

    let (stop_tx, stop_rx) = oneshot::channel();
    let task = SamplingTask {
        source,
        ticker,
        metrics: metrics.clone(),
        teardown: Teardown {
            registry: registry.clone(),
            metrics: metrics.clone(),
            state: state.clone(),
        },
    };

    state.advance(LifecycleState::Running);
    let handle = runtime.spawn(task.run(stop_rx, shutdown));

    info!(
        prefix = %prefix,
        interval_ms = config.interval.as_millis() as u64,
        custom_ticker,
        "Pool stats exporter started"
    );

    Ok(ExporterHandle {
        stop_tx: Some(stop_tx),
        task: Some(handle),
        metrics,
        state,
    })
}

/// Unregisters the gauges when the sampling task ends, including by panic.
struct Teardown {
    registry: SharedRegistry,
    metrics: PoolMetrics,
    state: StateCell,
}

impl Drop for Teardown {
    fn drop(&mut self) {
        self.state.advance(LifecycleState::Stopping);
        let removed = unregister_all(self.registry.as_ref(), &self.metrics);
        self.state.advance(LifecycleState::Stopped);
        info!(unregistered = removed, "Pool stats exporter stopped");
    }
}

struct SamplingTask {
    source: Arc<dyn StatsSource>,
    ticker: Box<dyn Ticker>,
    metrics: PoolMetrics,
    teardown: Teardown,
}

impl SamplingTask {
    async fn run<F>(self, mut stop_rx: oneshot::Receiver<()>, shutdown: F)
    where
        F: Future<Output = ()> + Send,
    {
        let SamplingTask {
            source,
            mut ticker,
            metrics,
            teardown,
        } = self;
        tokio::pin!(shutdown);

        loop {
            // Stop signals are checked before the tick so a pending stop never samples.
            tokio::select! {
                biased;

                _ = &mut stop_rx => {
                    debug!("Stop requested");
                    break;
                }
                () = &mut shutdown => {
                    info!("Shutdown signal received");
                    break;
                }
                tick = next_tick(ticker.as_mut()) => match tick {
                    Some(()) => sample(source.as_ref(), &metrics),
                    None => {
                        info!("Ticker closed");
                        break;
                    }
                },
            }
        }

        ticker.stop();
        drop(teardown);
    }
}

/// Take one snapshot and write it out. Failed reads leave the gauges untouched.
fn sample(source: &dyn StatsSource, metrics: &PoolMetrics) {
    let snapshot = source
        .pool_stats()
        .and_then(|snapshot| snapshot.validate().map(|()| snapshot));

    match snapshot {
        Ok(snapshot) => {
            metrics.record(&snapshot);
            debug!(
                hits = snapshot.hits,
                misses = snapshot.misses,
                timeouts = snapshot.timeouts,
                total_conns = snapshot.total_conns,
                idle_conns = snapshot.idle_conns,
                stale_conns = snapshot.stale_conns,
                "Sampled pool stats"
            );
        }
        Err(e) if e.is_transient() => {
            warn!(error = %e, "Skipping pool stats sample");
        }
        Err(e) => {
            error!(error = %e, "Pool stats source failed");
        }
    }
}

/// Handle on a running exporter.
///
/// [`ExporterHandle::stop`] waits until sampling has ended and every gauge is
/// unregistered. Dropping the handle without stopping also ends sampling; the
/// teardown then completes in the background.
pub struct ExporterHandle {
    stop_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
    metrics: PoolMetrics,
    state: StateCell,
}

impl ExporterHandle {
    /// The exported gauges.
    pub fn metrics(&self) -> &PoolMetrics {
        &self.metrics
    }

    /// Current gauge values.
    pub fn values(&self) -> PoolSnapshot {
        self.metrics.values()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> LifecycleState {
        self.state.get()
    }

    /// A cloneable read-only view of this exporter.
    pub fn observer(&self) -> ExporterObserver {
        ExporterObserver {
            metrics: self.metrics.clone(),
            state: self.state.clone(),
        }
    }

    /// Whether the sampling task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Stop sampling and unregister the gauges.
    ///
    /// Returns once the task has exited and teardown is complete. Calling it
    /// again is a no-op.
    pub async fn stop(&mut self) {
        let Some(task) = self.task.take() else {
            return;
        };

        self.state.advance(LifecycleState::Stopping);
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }

        if let Err(e) = task.await {
            warn!(error = %e, "Sampling task did not exit cleanly");
        }
    }
}

impl Drop for ExporterHandle {
    fn drop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
    }
}

impl std::fmt::Debug for ExporterHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExporterHandle")
            .field("state", &self.state.get())
            .field("values", &self.metrics.values())
            .finish()
    }
}

/// Read-only view of a running exporter, for health checks and status pages.
#[derive(Debug, Clone)]
pub struct ExporterObserver {
    metrics: PoolMetrics,
    state: StateCell,
}

impl ExporterObserver {
    /// Current lifecycle state.
    pub fn state(&self) -> LifecycleState {
        self.state.get()
    }

    /// Current gauge values.
    pub fn values(&self) -> PoolSnapshot {
        self.metrics.values()
    }
}
