//! Health signals and the aggregate status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Display;
use std::sync::{Arc, RwLock};
use tokio::sync::mpsc;

/// Message shown while every tracked metric is failing.
pub const UNAVAILABLE_MESSAGE: &str = "Unable to fetch latest data";

/// Outcome of one poll attempt for one metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthSignal {
    /// The metric the attempt was for.
    pub metric: String,
    /// Whether a value was obtained.
    pub ok: bool,
    /// Why the attempt failed, if it did.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// When the attempt finished.
    pub observed_at: DateTime<Utc>,
}

impl HealthSignal {
    /// Creates a successful signal for `metric`.
    #[must_use]
    pub fn ok(metric: impl Into<String>) -> Self {
        Self {
            metric: metric.into(),
            ok: true,
            error: None,
            observed_at: Utc::now(),
        }
    }

    /// Creates a failing signal for `metric` carrying `error`.
    #[must_use]
    pub fn failure(metric: impl Into<String>, error: impl Display) -> Self {
        Self {
            metric: metric.into(),
            ok: false,
            error: Some(error.to_string()),
            observed_at: Utc::now(),
        }
    }
}

/// Aggregate status of all data collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    /// False only when every tracked metric is failing.
    pub ok: bool,
    /// Human-readable explanation, empty when ok.
    pub message: String,
}

impl Default for Status {
    fn default() -> Self {
        Self {
            ok: true,
            message: String::new(),
        }
    }
}

/// Keeps the latest signal per metric and derives the [`Status`] from them.
#[derive(Debug, Default)]
pub struct HealthTracker {
    latest: HashMap<String, HealthSignal>,
}

impl HealthTracker {
    /// Creates a tracker with no metrics.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a signal, replacing any earlier one for the same metric, and
    /// returns the recomputed status.
    pub fn record(&mut self, signal: HealthSignal) -> Status {
        self.latest.insert(signal.metric.clone(), signal);
        self.status()
    }

    /// Computes the status from every tracked metric.
    #[must_use]
    pub fn status(&self) -> Status {
        let all_failing = !self.latest.is_empty() && self.latest.values().all(|s| !s.ok);
        if all_failing {
            Status {
                ok: false,
                message: UNAVAILABLE_MESSAGE.to_string(),
            }
        } else {
            Status::default()
        }
    }

    /// Returns the latest signal for a metric.
    #[must_use]
    pub fn get(&self, metric: &str) -> Option<&HealthSignal> {
        self.latest.get(metric)
    }

    /// Returns the number of tracked metrics.
    #[must_use]
    pub fn len(&self) -> usize {
        self.latest.len()
    }

    /// Returns true if no metric has reported yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.latest.is_empty()
    }
}

/// Shared handle onto the current [`Status`].
///
/// Written by the signal processor, read by request handlers.
#[derive(Debug, Clone, Default)]
pub struct SharedStatus {
    inner: Arc<RwLock<Status>>,
}

impl SharedStatus {
    /// Creates a handle holding the default (ok) status.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the current status.
    ///
    /// A poisoned lock still yields the last written status.
    #[must_use]
    pub fn get(&self) -> Status {
        match self.inner.read() {
            Ok(status) => status.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Replaces the current status.
    pub fn set(&self, status: Status) {
        match self.inner.write() {
            Ok(mut current) => *current = status,
            Err(poisoned) => *poisoned.into_inner() = status,
        }
    }
}

/// Consumes health signals until every sender is dropped, publishing the
/// recomputed status after each one.
pub async fn process_signals(mut signals: mpsc::Receiver<HealthSignal>, status: SharedStatus) {
    let mut tracker = HealthTracker::new();

    while let Some(signal) = signals.recv().await {
        if let Some(error) = &signal.error {
            tracing::debug!(metric = %signal.metric, %error, "Received failing health signal");
        }

        let next = tracker.record(signal);
        let previous = status.get();
        if previous.ok != next.ok {
            if next.ok {
                tracing::info!("Data collection recovered");
            } else {
                tracing::warn!(
                    metrics = tracker.len(),
                    message = %next.message,
                    "All metrics failing"
                );
            }
        }
        status.set(next);
    }

    tracing::debug!("Health signal channel closed");
}

#[cfg(test)]
mod tests {
    use super::*;

    const METRICS: [&str; 4] = ["temperature", "humidity", "rain", "wind"];

    fn all_ok_tracker() -> HealthTracker {
        let mut tracker = HealthTracker::new();
        for metric in METRICS {
            tracker.record(HealthSignal::ok(metric));
        }
        tracker
    }

    #[test]
    fn test_status_default_is_ok() {
        let status = Status::default();
        assert!(status.ok);
        assert!(status.message.is_empty());
    }

    #[test]
    fn test_empty_tracker_is_ok() {
        let tracker = HealthTracker::new();
        assert!(tracker.is_empty());
        assert!(tracker.status().ok);
    }

    #[test]
    fn test_only_errors_on_full_failure() {
        let mut tracker = all_ok_tracker();

        for (i, metric) in METRICS.iter().enumerate() {
            let status = tracker.record(HealthSignal::failure(*metric, "server error: 502"));
            if i < 3 {
                assert!(status.ok, "{} failing metrics should still be ok", i + 1);
            } else {
                assert!(!status.ok);
                assert_eq!(status.message, UNAVAILABLE_MESSAGE);
            }
        }
    }

    #[test]
    fn test_single_recovery_restores_ok() {
        let mut tracker = HealthTracker::new();
        for metric in METRICS {
            tracker.record(HealthSignal::failure(metric, "timeout"));
        }
        assert!(!tracker.status().ok);

        let status = tracker.record(HealthSignal::ok("rain"));
        assert!(status.ok);
        assert!(status.message.is_empty());
    }

    #[test]
    fn test_latest_signal_overwrites() {
        let mut tracker = HealthTracker::new();
        tracker.record(HealthSignal::failure("temperature", "no data"));
        tracker.record(HealthSignal::ok("temperature"));

        assert_eq!(tracker.len(), 1);
        let latest = tracker.get("temperature").unwrap();
        assert!(latest.ok);
        assert!(latest.error.is_none());
    }

    #[test]
    fn test_failure_carries_error_text() {
        let signal = HealthSignal::failure("humidity", "invalid float literal");
        assert!(!signal.ok);
        assert_eq!(signal.error.as_deref(), Some("invalid float literal"));
    }

    #[test]
    fn test_shared_status_roundtrip() {
        let status = SharedStatus::new();
        let reader = status.clone();

        status.set(Status {
            ok: false,
            message: UNAVAILABLE_MESSAGE.to_string(),
        });

        assert!(!reader.get().ok);
    }

    #[tokio::test]
    async fn test_process_signals_publishes_status() {
        let (tx, rx) = mpsc::channel(16);
        let status = SharedStatus::new();
        let task = tokio::spawn(process_signals(rx, status.clone()));

        tx.send(HealthSignal::failure("temperature", "no such host"))
            .await
            .unwrap();
        tx.send(HealthSignal::failure("humidity", "no such host"))
            .await
            .unwrap();
        drop(tx);
        tokio_test::assert_ok!(task.await);

        let current = status.get();
        assert!(!current.ok);
        assert_eq!(current.message, UNAVAILABLE_MESSAGE);
    }

    #[tokio::test]
    async fn test_process_signals_one_ok_keeps_status_ok() {
        let (tx, rx) = mpsc::channel(16);
        let status = SharedStatus::new();
        let task = tokio::spawn(process_signals(rx, status.clone()));

        tx.send(HealthSignal::failure("temperature", "502"))
            .await
            .unwrap();
        tx.send(HealthSignal::ok("humidity")).await.unwrap();
        drop(tx);
        task.await.unwrap();

        assert!(status.get().ok);
    }
}
