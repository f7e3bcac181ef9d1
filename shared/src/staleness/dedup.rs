//! Suppression of repeated log lines.

use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

/// Remembers when each message was last emitted so that a persisting
/// condition logs once per window instead of once per check.
#[derive(Debug, Clone)]
pub struct LogDedup {
    window: Duration,
    last_emitted: HashMap<String, Instant>,
}

impl LogDedup {
    /// Creates a tracker that lets identical messages through once per `window`.
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_emitted: HashMap::new(),
        }
    }

    /// Returns true if `message` should be logged at `now`, and if so records it.
    pub fn should_emit(&mut self, message: &str, now: Instant) -> bool {
        match self.last_emitted.get(message) {
            Some(last) if now.saturating_duration_since(*last) <= self.window => false,
            _ => {
                self.last_emitted.insert(message.to_string(), now);
                true
            }
        }
    }
}
