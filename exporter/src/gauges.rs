//! Prometheus gauges for a sensor's metric set.

use prometheus::{Gauge, Opts, Registry};
use shared::staleness::GaugeSet;
use std::fmt::Debug;

/// A fixed enumeration of the readings one sensor exports.
pub trait SensorMetric: Copy + Eq + Debug + Send + Sync + 'static {
    /// Every metric, in registration order.
    const ALL: &'static [Self];

    /// Prometheus metric name.
    fn name(self) -> &'static str;

    /// Help text shown in the exposition.
    fn help(self) -> &'static str;
}

/// One registered gauge per metric of `M`.
pub struct SensorGauges<M> {
    gauges: Vec<(M, Gauge)>,
}

impl<M: SensorMetric> SensorGauges<M> {
    /// Creates a gauge for every metric of `M` and registers it.
    ///
    /// # Errors
    ///
    /// Returns an error if a metric name is invalid or already registered.
    pub fn register(registry: &Registry) -> Result<Self, prometheus::Error> {
        let gauges = M::ALL
            .iter()
            .map(|&metric| {
                let gauge = Gauge::with_opts(Opts::new(metric.name(), metric.help()))?;
                registry.register(Box::new(gauge.clone()))?;
                Ok((metric, gauge))
            })
            .collect::<Result<Vec<_>, prometheus::Error>>()?;

        Ok(Self { gauges })
    }

    /// Sets the gauge of `metric`.
    pub fn set(&self, metric: M, value: f64) {
        if let Some(gauge) = self.gauge(metric) {
            gauge.set(value);
        }
    }

    /// Returns the current value of `metric`.
    #[must_use]
    pub fn value(&self, metric: M) -> Option<f64> {
        self.gauge(metric).map(Gauge::get)
    }

    fn gauge(&self, metric: M) -> Option<&Gauge> {
        self.gauges
            .iter()
            .find(|(m, _)| *m == metric)
            .map(|(_, gauge)| gauge)
    }
}

impl<M: SensorMetric> GaugeSet for SensorGauges<M> {
    fn mark_unavailable(&self) {
        for (_, gauge) in &self.gauges {
            gauge.set(f64::NAN);
        }
    }
}
