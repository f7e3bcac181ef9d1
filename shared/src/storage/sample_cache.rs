//! Sample cache with outlier dampening.
//!
//! Provides the `SampleCache` that holds the last accepted value per metric,
//! and the `evaluate` decision that every candidate value goes through.

use crate::models::MetricSample;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};
use thiserror::Error;

/// Largest relative change (`|new - old| / old`) accepted for a dampened metric.
pub const MAX_RELATIVE_CHANGE: f64 = 0.5;

/// Errors that can occur during sample cache operations.
#[derive(Debug, Error)]
pub enum SampleCacheError {
    /// Failed to acquire lock on the cache.
    #[error("Failed to acquire lock on sample cache")]
    LockError,
}

/// Outcome of evaluating a candidate value against the cached one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SampleUpdate {
    /// The cached value was `0.0`, so the candidate is taken as the first reading.
    ///
    /// A genuine reading of exactly zero is indistinguishable from "never set".
    Initial,
    /// The candidate equals the cached value.
    Unchanged,
    /// The candidate replaces the cached value.
    Accepted,
    /// The candidate moved too far from the cached value and was dropped.
    Rejected {
        /// The computed `|new - old| / old` (NaN when either side is NaN).
        relative_change: f64,
    },
}

impl SampleUpdate {
    /// Returns true unless the candidate was rejected.
    #[must_use]
    pub fn is_accepted(&self) -> bool {
        !matches!(self, Self::Rejected { .. })
    }
}

/// Decides whether `new` may replace `old`.
///
/// NaN never compares equal, so a NaN on either side routes into the
/// relative-change check, where the NaN ratio fails `<= MAX_RELATIVE_CHANGE`.
///
/// # Examples
///
/// ```
/// use shared::storage::{evaluate, SampleUpdate};
///
/// assert_eq!(evaluate(10.0, 12.0, true), SampleUpdate::Accepted);
/// assert!(!evaluate(10.0, 20.0, true).is_accepted());
/// assert_eq!(evaluate(0.0, 1000.0, true), SampleUpdate::Initial);
/// ```
#[must_use]
#[allow(clippy::float_cmp)]
pub fn evaluate(old: f64, new: f64, dampen: bool) -> SampleUpdate {
    if old == 0.0 {
        return SampleUpdate::Initial;
    }
    if new == old {
        return SampleUpdate::Unchanged;
    }
    if !dampen {
        return SampleUpdate::Accepted;
    }

    let relative_change = (new - old).abs() / old;
    if relative_change <= MAX_RELATIVE_CHANGE {
        SampleUpdate::Accepted
    } else {
        SampleUpdate::Rejected { relative_change }
    }
}

/// Tells the cache which metrics get outlier dampening.
pub trait DampenPolicy {
    /// Returns true if outliers of `metric` should be rejected.
    fn dampens(&self, metric: &str) -> bool;
}

impl DampenPolicy for bool {
    fn dampens(&self, _metric: &str) -> bool {
        *self
    }
}

impl DampenPolicy for HashMap<String, bool> {
    fn dampens(&self, metric: &str) -> bool {
        self.get(metric).copied().unwrap_or(false)
    }
}

impl DampenPolicy for HashSet<String> {
    fn dampens(&self, metric: &str) -> bool {
        self.contains(metric)
    }
}

/// Summary of applying one batch to the cache.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateReport {
    /// Number of samples accepted (including unchanged ones).
    pub accepted: usize,
    /// Names of the metrics whose samples were rejected as outliers.
    pub rejected: Vec<String>,
}

/// Latest accepted value per metric name.
///
/// Cloning the cache yields another handle onto the same values, so the poll
/// loop and the request handlers can each hold one. Unknown metrics read as
/// `0.0`.
#[derive(Debug, Clone, Default)]
pub struct SampleCache {
    samples: Arc<RwLock<HashMap<String, f64>>>,
}

impl SampleCache {
    /// Creates a new empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a cache pre-populated with values.
    #[must_use]
    pub fn with_samples<I, K>(samples: I) -> Self
    where
        I: IntoIterator<Item = (K, f64)>,
        K: Into<String>,
    {
        let samples = samples.into_iter().map(|(k, v)| (k.into(), v)).collect();
        Self {
            samples: Arc::new(RwLock::new(samples)),
        }
    }

    /// Applies a batch of samples, in order, to the cache.
    ///
    /// Rejected samples leave the cached value untouched and are logged.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache lock is poisoned.
    pub fn update<P>(
        &self,
        batch: &[MetricSample],
        policy: &P,
    ) -> Result<UpdateReport, SampleCacheError>
    where
        P: DampenPolicy + ?Sized,
    {
        let mut samples = self
            .samples
            .write()
            .map_err(|_| SampleCacheError::LockError)?;
        let mut report = UpdateReport::default();

        for sample in batch {
            let old = samples.get(&sample.name).copied().unwrap_or(0.0);
            match evaluate(old, sample.value, policy.dampens(&sample.name)) {
                SampleUpdate::Unchanged => report.accepted += 1,
                SampleUpdate::Initial | SampleUpdate::Accepted => {
                    samples.insert(sample.name.clone(), sample.value);
                    report.accepted += 1;
                }
                SampleUpdate::Rejected { relative_change } => {
                    tracing::warn!(
                        metric = %sample.name,
                        old,
                        new = sample.value,
                        relative_change,
                        "Rejecting outlier sample"
                    );
                    report.rejected.push(sample.name.clone());
                }
            }
        }

        Ok(report)
    }

    /// Returns the cached value for a metric, or `0.0` if none was accepted yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache lock is poisoned.
    pub fn value(&self, metric: &str) -> Result<f64, SampleCacheError> {
        let samples = self
            .samples
            .read()
            .map_err(|_| SampleCacheError::LockError)?;
        Ok(samples.get(metric).copied().unwrap_or(0.0))
    }

    /// Returns a copy of every cached value.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache lock is poisoned.
    pub fn snapshot(&self) -> Result<HashMap<String, f64>, SampleCacheError> {
        let samples = self
            .samples
            .read()
            .map_err(|_| SampleCacheError::LockError)?;
        Ok(samples.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(value: f64) -> Vec<MetricSample> {
        vec![MetricSample::new("temperature", value)]
    }

    /// Runs a single dampened update of `temperature` from `old` to `new`.
    fn dampened(old: f64, new: f64) -> f64 {
        let cache = SampleCache::with_samples([("temperature", old)]);
        cache.update(&sample(new), &true).unwrap();
        cache.value("temperature").unwrap()
    }

    #[test]
    fn test_initial_value_accepted_regardless_of_magnitude() {
        assert_eq!(evaluate(0.0, 10.0, true), SampleUpdate::Initial);
        assert_eq!(evaluate(0.0, 1.0e9, true), SampleUpdate::Initial);
        assert_eq!(evaluate(0.0, -40.0, true), SampleUpdate::Initial);

        assert_eq!(dampened(0.0, 10.0), 10.0);
        assert_eq!(dampened(0.0, 1.0e9), 1.0e9);
    }

    #[test]
    fn test_unknown_metric_reads_zero_then_takes_first_value() {
        let cache = SampleCache::new();
        assert_eq!(cache.value("humidity").unwrap(), 0.0);

        let report = cache
            .update(&[MetricSample::new("humidity", 300.0)], &true)
            .unwrap();

        assert_eq!(report.accepted, 1);
        assert_eq!(cache.value("humidity").unwrap(), 300.0);
    }

    #[test]
    fn test_unchanged_value_counts_as_accepted() {
        assert_eq!(evaluate(10.0, 10.0, true), SampleUpdate::Unchanged);

        let cache = SampleCache::with_samples([("temperature", 10.0)]);
        let report = cache.update(&sample(10.0), &true).unwrap();

        assert_eq!(report.accepted, 1);
        assert!(report.rejected.is_empty());
        assert_eq!(cache.value("temperature").unwrap(), 10.0);
    }

    #[test]
    fn test_dampened_changes() {
        let cases = [
            ("20% increase", 12.0, 12.0),
            ("50% increase", 15.0, 15.0),
            ("100% increase", 20.0, 10.0),
            ("150% increase", 25.0, 10.0),
            ("20% decrease", 8.0, 8.0),
            ("50% decrease", 5.0, 5.0),
            ("100% decrease", 0.0, 10.0),
            ("150% decrease", -5.0, 10.0),
        ];

        for (name, new, expected) in cases {
            assert_eq!(dampened(10.0, new), expected, "{name}");
        }
    }

    #[test]
    fn test_boundary_is_inclusive() {
        assert_eq!(evaluate(10.0, 5.0, true), SampleUpdate::Accepted);
        assert_eq!(evaluate(10.0, 15.0, true), SampleUpdate::Accepted);
        assert!(!evaluate(10.0, 15.000_001, true).is_accepted());
    }

    #[test]
    fn test_rejection_reports_relative_change() {
        match evaluate(10.0, 20.0, true) {
            SampleUpdate::Rejected { relative_change } => {
                assert!((relative_change - 1.0).abs() < f64::EPSILON);
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[test]
    fn test_undampened_metric_always_takes_new_value() {
        for new in [20.0, 0.0, -5.0, 1.0e6, f64::NAN] {
            let cache = SampleCache::with_samples([("temperature", 10.0)]);
            cache.update(&sample(new), &false).unwrap();
            let value = cache.value("temperature").unwrap();
            if new.is_nan() {
                assert!(value.is_nan());
            } else {
                assert_eq!(value, new);
            }
        }
    }

    #[test]
    fn test_nan_new_value_is_rejected() {
        assert!(!evaluate(10.0, f64::NAN, true).is_accepted());
        assert_eq!(dampened(10.0, f64::NAN), 10.0);
    }

    #[test]
    fn test_nan_old_value_rejects_finite_update() {
        assert!(!evaluate(f64::NAN, 10.0, true).is_accepted());
        assert!(dampened(f64::NAN, 10.0).is_nan());
    }

    #[test]
    fn test_nan_first_reading_sticks_for_dampened_metric() {
        let cache = SampleCache::new();

        let report = cache
            .update(&[MetricSample::new("temperature", f64::NAN)], &true)
            .unwrap();
        assert_eq!(report.accepted, 1);
        assert!(cache.value("temperature").unwrap().is_nan());

        for value in [20.0, 21.5, 0.0] {
            let report = cache
                .update(&[MetricSample::new("temperature", value)], &true)
                .unwrap();
            assert_eq!(report.rejected, vec!["temperature".to_string()]);
            assert!(cache.value("temperature").unwrap().is_nan());
        }

        // without dampening the next reading replaces it
        cache
            .update(&[MetricSample::new("temperature", 20.0)], &false)
            .unwrap();
        assert_eq!(cache.value("temperature").unwrap(), 20.0);
    }

    #[test]
    fn test_nan_both_is_rejected() {
        assert!(!evaluate(f64::NAN, f64::NAN, true).is_accepted());
    }

    #[test]
    fn test_policy_selects_dampened_metrics() {
        let cache = SampleCache::with_samples([("temperature", 10.0), ("rainfall", 10.0)]);
        let policy: HashMap<String, bool> = [("temperature".to_string(), true)].into();

        let report = cache
            .update(
                &[
                    MetricSample::new("temperature", 30.0),
                    MetricSample::new("rainfall", 30.0),
                ],
                &policy,
            )
            .unwrap();

        assert_eq!(report.accepted, 1);
        assert_eq!(report.rejected, vec!["temperature".to_string()]);
        assert_eq!(cache.value("temperature").unwrap(), 10.0);
        assert_eq!(cache.value("rainfall").unwrap(), 30.0);
    }

    #[test]
    fn test_hash_set_policy() {
        let policy: HashSet<String> = ["wind_gust".to_string()].into();
        assert!(policy.dampens("wind_gust"));
        assert!(!policy.dampens("humidity"));
    }

    #[test]
    fn test_batch_is_applied_in_order() {
        let cache = SampleCache::with_samples([("temperature", 10.0)]);
        cache
            .update(
                &[
                    MetricSample::new("temperature", 14.0),
                    MetricSample::new("temperature", 20.0),
                ],
                &true,
            )
            .unwrap();

        // 14 -> 20 is within 50% of 14
        assert_eq!(cache.value("temperature").unwrap(), 20.0);
    }

    #[test]
    fn test_clone_shares_values() {
        let cache = SampleCache::new();
        let reader = cache.clone();

        cache.update(&sample(21.0), &true).unwrap();

        assert_eq!(reader.value("temperature").unwrap(), 21.0);
        assert_eq!(reader.snapshot().unwrap().len(), 1);
    }
}
