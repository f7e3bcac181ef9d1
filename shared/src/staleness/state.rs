//! Staleness policy and refresh bookkeeping.

use std::time::Duration;
use tokio::time::Instant;

/// How many TTLs of silence are tolerated before the process gives up.
pub const EXIT_AFTER_TTL_MULTIPLE: u32 = 10;

/// Thresholds for a monitored source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StalenessPolicy {
    /// Silence after which readings are considered stale.
    pub ttl: Duration,
    /// Silence after which the process should exit.
    pub exit_after: Duration,
}

impl StalenessPolicy {
    /// Creates a policy that exits after [`EXIT_AFTER_TTL_MULTIPLE`] TTLs.
    /// The exit threshold saturates at [`Duration::MAX`].
    ///
    /// # Examples
    ///
    /// ```
    /// use shared::staleness::StalenessPolicy;
    /// use std::time::Duration;
    ///
    /// let policy = StalenessPolicy::new(Duration::from_secs(600));
    /// assert_eq!(policy.exit_after, Duration::from_secs(6000));
    /// ```
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            exit_after: ttl.saturating_mul(EXIT_AFTER_TTL_MULTIPLE),
        }
    }
}

/// Time of the last accepted reading for one source.
#[derive(Debug, Clone)]
pub struct StalenessState {
    last_refresh: Instant,
    policy: StalenessPolicy,
}

impl StalenessState {
    /// Creates state that counts silence from `started_at`.
    #[must_use]
    pub fn new(policy: StalenessPolicy, started_at: Instant) -> Self {
        Self {
            last_refresh: started_at,
            policy,
        }
    }

    /// Records an accepted reading. Older instants than the current one are
    /// ignored so the refresh time never moves backwards.
    pub fn record_refresh(&mut self, at: Instant) {
        if at > self.last_refresh {
            self.last_refresh = at;
        }
    }

    /// Returns when the last reading was accepted.
    #[must_use]
    pub fn last_refresh(&self) -> Instant {
        self.last_refresh
    }

    /// Returns the policy in force.
    #[must_use]
    pub fn policy(&self) -> StalenessPolicy {
        self.policy
    }

    /// Returns the silence observed at `now`.
    #[must_use]
    pub fn silence(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_refresh)
    }

    /// Returns true once the silence exceeds the TTL.
    #[must_use]
    pub fn is_stale(&self, now: Instant) -> bool {
        self.silence(now) > self.policy.ttl
    }

    /// Returns true once the silence exceeds the exit threshold.
    #[must_use]
    pub fn is_expired(&self, now: Instant) -> bool {
        self.silence(now) > self.policy.exit_after
    }
}
