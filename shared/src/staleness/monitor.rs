//! The staleness monitor event loop.
//!
//! One task owns the [`StalenessState`]. Readers of the source report accepted
//! readings through a [`RefreshHandle`]; the monitor multiplexes those reports
//! with a one second check interval, so no state is written from two tasks.

use super::dedup::LogDedup;
use super::state::{StalenessPolicy, StalenessState};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::{interval, Instant, MissedTickBehavior};

/// Process exit status reserved for "no updates received".
pub const NO_UPDATES_EXIT_CODE: i32 = 2;

/// How often the thresholds are checked.
pub const CHECK_INTERVAL: Duration = Duration::from_secs(1);

/// Window in which the repeated stale warning is suppressed.
pub const STALE_LOG_WINDOW: Duration = Duration::from_secs(30);

const STALE_MESSAGE: &str = "TTL expired on last measurement - setting all measurements to NaN";

/// The set of gauges exported for one source.
pub trait GaugeSet: Send + Sync {
    /// Sets every gauge to NaN, keeping the series present but unknown.
    fn mark_unavailable(&self);
}

impl<G: GaugeSet + ?Sized> GaugeSet for Arc<G> {
    fn mark_unavailable(&self) {
        (**self).mark_unavailable();
    }
}

/// The source has been silent for longer than the exit threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("no updates for {silence:?} (limit {exit_after:?})")]
pub struct NoUpdates {
    /// How long the source had been silent.
    pub silence: Duration,
    /// The configured exit threshold.
    pub exit_after: Duration,
}

/// Sending side used by readers to report accepted readings.
#[derive(Debug, Clone)]
pub struct RefreshHandle {
    tx: mpsc::UnboundedSender<Instant>,
}

impl RefreshHandle {
    /// Records that a reading was accepted at `at`.
    pub fn record_refresh(&self, at: Instant) {
        if self.tx.send(at).is_err() {
            tracing::debug!("Staleness monitor has stopped, dropping refresh");
        }
    }
}

/// Watches one source and degrades its gauges when it goes quiet.
pub struct StalenessMonitor<G> {
    state: StalenessState,
    gauges: G,
    dedup: LogDedup,
    refreshes: mpsc::UnboundedReceiver<Instant>,
    check_interval: Duration,
}

impl<G: GaugeSet> StalenessMonitor<G> {
    /// Creates a monitor whose silence starts counting now, together with the
    /// handle readers use to report readings.
    #[must_use]
    pub fn new(policy: StalenessPolicy, gauges: G) -> (Self, RefreshHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let monitor = Self {
            state: StalenessState::new(policy, Instant::now()),
            gauges,
            dedup: LogDedup::new(STALE_LOG_WINDOW),
            refreshes: rx,
            check_interval: CHECK_INTERVAL,
        };
        (monitor, RefreshHandle { tx })
    }

    /// Overrides the check interval.
    #[must_use]
    pub fn with_check_interval(mut self, check_interval: Duration) -> Self {
        self.check_interval = check_interval;
        self
    }

    /// Returns the current refresh bookkeeping.
    #[must_use]
    pub fn state(&self) -> &StalenessState {
        &self.state
    }

    /// Performs one check at `now`.
    ///
    /// Pending refreshes are applied first. Both thresholds are evaluated
    /// independently: a stale source has its gauges marked unavailable, and an
    /// expired source yields [`NoUpdates`].
    pub fn check(&mut self, now: Instant) -> Option<NoUpdates> {
        while let Ok(at) = self.refreshes.try_recv() {
            self.state.record_refresh(at);
        }

        let policy = self.state.policy();
        let silence = self.state.silence(now);

        if self.state.is_stale(now) {
            if self.dedup.should_emit(STALE_MESSAGE, now) {
                tracing::error!(
                    silence_secs = silence.as_secs(),
                    ttl_secs = policy.ttl.as_secs(),
                    "{}",
                    STALE_MESSAGE
                );
            }
            self.gauges.mark_unavailable();
        }

        if self.state.is_expired(now) {
            tracing::error!(
                silence_secs = silence.as_secs(),
                exit_after_secs = policy.exit_after.as_secs(),
                "No updates received - exiting"
            );
            return Some(NoUpdates {
                silence,
                exit_after: policy.exit_after,
            });
        }

        None
    }

    /// Runs until the source has been silent past the exit threshold.
    ///
    /// If every [`RefreshHandle`] is dropped the loop keeps checking, so a dead
    /// reader eventually leads to [`NoUpdates`] as well.
    pub async fn run(mut self) -> NoUpdates {
        let mut ticker = interval(self.check_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut refreshes_open = true;

        loop {
            tokio::select! {
                refresh = self.refreshes.recv(), if refreshes_open => match refresh {
                    Some(at) => self.state.record_refresh(at),
                    None => {
                        tracing::warn!("All refresh handles dropped, no further readings can arrive");
                        refreshes_open = false;
                    }
                },
                _ = ticker.tick() => {
                    if let Some(exit) = self.check(Instant::now()) {
                        return exit;
                    }
                }
            }
        }
    }
}
