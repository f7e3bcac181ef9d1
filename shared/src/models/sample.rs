//! Metric sample data model.
//!
//! A `MetricSample` is a single decoded reading, produced after an MQTT payload
//! or a time-series query result has been parsed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single reading of a named metric.
///
/// # Example
///
/// ```
/// use shared::models::MetricSample;
///
/// let sample = MetricSample::new("temperature", 22.29);
/// assert_eq!(sample.name, "temperature");
/// assert_eq!(sample.value, 22.29);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    /// The name of the metric (e.g., "temperature").
    pub name: String,

    /// The decoded value.
    pub value: f64,

    /// When the value was observed.
    pub observed_at: DateTime<Utc>,
}

impl MetricSample {
    /// Creates a new sample observed now.
    #[must_use]
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
            observed_at: Utc::now(),
        }
    }

    /// Sets the observation timestamp.
    #[must_use]
    pub fn with_observed_at(mut self, observed_at: DateTime<Utc>) -> Self {
        self.observed_at = observed_at;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_sample_new() {
        let before = Utc::now();
        let sample = MetricSample::new("humidity", 58.18);

        assert_eq!(sample.name, "humidity");
        assert!((sample.value - 58.18).abs() < f64::EPSILON);
        assert!(sample.observed_at >= before);
    }

    #[test]
    fn test_sample_with_observed_at() {
        let ts = Utc::now() - Duration::minutes(5);
        let sample = MetricSample::new("co2", 538.0).with_observed_at(ts);

        assert_eq!(sample.observed_at, ts);
    }

    #[test]
    fn test_sample_serialization() {
        let sample = MetricSample::new("rainfall", 1.2);
        let json = serde_json::to_string(&sample).unwrap();

        assert!(json.contains("\"name\":\"rainfall\""));
        assert!(json.contains("\"value\":1.2"));
    }
}
