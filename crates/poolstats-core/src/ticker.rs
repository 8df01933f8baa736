//! Tick sources that drive the sampling loop.
//!
//! [`IntervalTicker`] fires on the wall clock. [`ManualTicker`] fires only when
//! its [`TickController`] says so, which makes sampling deterministic in tests.

use std::future::poll_fn;
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{Instant, Interval, MissedTickBehavior};

use crate::error::{Error, Result};

/// A repeating wake-up signal.
pub trait Ticker: Send {
    /// Poll for the next tick.
    ///
    /// Returns `Ready(Some(()))` when a tick is due and `Ready(None)` once the
    /// ticker is stopped or closed and will never tick again.
    fn poll_tick(&mut self, cx: &mut Context<'_>) -> Poll<Option<()>>;

    /// Release timer resources. Calling it more than once is harmless.
    fn stop(&mut self);
}

impl<T: Ticker + ?Sized> Ticker for Box<T> {
    fn poll_tick(&mut self, cx: &mut Context<'_>) -> Poll<Option<()>> {
        (**self).poll_tick(cx)
    }

    fn stop(&mut self) {
        (**self).stop()
    }
}

/// Wait for the next tick.
pub async fn next_tick<T: Ticker + ?Sized>(ticker: &mut T) -> Option<()> {
    poll_fn(|cx| ticker.poll_tick(cx)).await
}

/// Wall-clock ticker backed by a tokio interval.
///
/// The first tick fires one full period after creation. Ticks missed while
/// the consumer was busy are skipped rather than replayed.
#[derive(Debug)]
pub struct IntervalTicker {
    interval: Option<Interval>,
}

impl IntervalTicker {
    /// Create a ticker with the given period. Must be called inside a tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if `period` is zero or the runtime has timers disabled.
    pub fn new(period: Duration) -> Self {
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self {
            interval: Some(interval),
        }
    }

    /// Like [`IntervalTicker::new`], but reports a runtime without timers as
    /// an error instead of panicking.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] for a zero period. [`Error::TimersDisabled`] when the
    /// current runtime was built without the time driver or there is no
    /// runtime at all.
    pub fn try_new(period: Duration) -> Result<Self> {
        if period.is_zero() {
            return Err(Error::Config("tick period must be non-zero".into()));
        }
        std::panic::catch_unwind(|| Self::new(period)).map_err(|_| Error::TimersDisabled)
    }

    /// The tick period, or `None` once stopped.
    pub fn period(&self) -> Option<Duration> {
        self.interval.as_ref().map(Interval::period)
    }
}

impl Ticker for IntervalTicker {
    fn poll_tick(&mut self, cx: &mut Context<'_>) -> Poll<Option<()>> {
        match self.interval.as_mut() {
            Some(interval) => interval.poll_tick(cx).map(|_| Some(())),
            None => Poll::Ready(None),
        }
    }

    fn stop(&mut self) {
        self.interval = None;
    }
}

/// Ticker that only fires when told to.
#[derive(Debug)]
pub struct ManualTicker {
    rx: mpsc::Receiver<()>,
    stopped: bool,
}

/// Sending side of a [`ManualTicker`].
#[derive(Debug, Clone)]
pub struct TickController {
    tx: mpsc::Sender<()>,
}

impl ManualTicker {
    /// Create a ticker and the controller that fires it.
    pub fn new() -> (Self, TickController) {
        // One slot: a tick that arrives while another is pending is dropped.
        let (tx, rx) = mpsc::channel(1);
        (
            Self { rx, stopped: false },
            TickController { tx },
        )
    }
}

impl Ticker for ManualTicker {
    fn poll_tick(&mut self, cx: &mut Context<'_>) -> Poll<Option<()>> {
        if self.stopped {
            return Poll::Ready(None);
        }
        self.rx.poll_recv(cx)
    }

    fn stop(&mut self) {
        if !self.stopped {
            self.stopped = true;
            self.rx.close();
        }
    }
}

impl TickController {
    /// Fire a tick.
    ///
    /// Returns false if the ticker is gone or stopped. A tick fired while the
    /// previous one has not been consumed yet is coalesced into it.
    pub fn tick(&self) -> bool {
        match self.tx.try_send(()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(())) => true,
            Err(mpsc::error::TrySendError::Closed(())) => false,
        }
    }

    /// Whether the ticker on the other side has been stopped or dropped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_new_without_timers() {
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let _guard = runtime.enter();
        let err = IntervalTicker::try_new(Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, Error::TimersDisabled));
    }

    #[tokio::test]
    async fn test_try_new_rejects_zero_period() {
        let err = IntervalTicker::try_new(Duration::ZERO).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[tokio::test]
    async fn test_manual_ticker() {
        let (mut ticker, controller) = ManualTicker::new();

        assert!(controller.tick());
        assert_eq!(next_tick(&mut ticker).await, Some(()));

        // Coalesced: two fires, one pending tick
        assert!(controller.tick());
        assert!(controller.tick());
        assert_eq!(next_tick(&mut ticker).await, Some(()));
        let pending = poll_fn(|cx| Poll::Ready(ticker.poll_tick(cx))).await;
        assert!(pending.is_pending());
    }

    #[tokio::test]
    async fn test_manual_ticker_stop_is_idempotent() {
        let (mut ticker, controller) = ManualTicker::new();
        ticker.stop();
        ticker.stop();

        assert!(!controller.tick());
        assert!(controller.is_closed());
        assert_eq!(next_tick(&mut ticker).await, None);
    }

    #[tokio::test]
    async fn test_manual_ticker_closes_with_controller() {
        let (mut ticker, controller) = ManualTicker::new();
        drop(controller);
        assert_eq!(next_tick(&mut ticker).await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_ticker_does_not_fire_immediately() {
        let start = Instant::now();
        let mut ticker = IntervalTicker::new(Duration::from_secs(1));
        assert_eq!(ticker.period(), Some(Duration::from_secs(1)));

        assert_eq!(next_tick(&mut ticker).await, Some(()));
        assert!(start.elapsed() >= Duration::from_secs(1));

        assert_eq!(next_tick(&mut ticker).await, Some(()));
        assert!(start.elapsed() >= Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_ticker_skips_missed_ticks() {
        let start = Instant::now();
        let mut ticker = IntervalTicker::new(Duration::from_secs(1));

        tokio::time::advance(Duration::from_millis(3500)).await;

        // One late tick, then back on the original schedule
        assert_eq!(next_tick(&mut ticker).await, Some(()));
        assert_eq!(next_tick(&mut ticker).await, Some(()));
        assert!(start.elapsed() >= Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_ticker_stop() {
        let mut ticker = IntervalTicker::new(Duration::from_secs(1));
        ticker.stop();
        ticker.stop();
        assert_eq!(ticker.period(), None);
        assert_eq!(next_tick(&mut ticker).await, None);
    }
}
