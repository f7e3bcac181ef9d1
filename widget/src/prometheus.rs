//! Prometheus poller.
//!
//! Periodically runs each metric's instant query, reports one health signal
//! per metric, and feeds the values that came back into the sample cache.

use serde::Deserialize;
use shared::config::WidgetConfig;
use shared::health::HealthSignal;
use shared::models::MetricSample;
use shared::storage::SampleCache;
use std::num::ParseFloatError;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};

/// Errors that can occur while querying Prometheus.
#[derive(Debug, Error)]
pub enum PollError {
    /// The request could not be sent or the response not read.
    #[error("unable to query Prometheus")]
    Transport(#[from] reqwest::Error),

    /// Prometheus answered with a non-success status and no usable body.
    #[error("Prometheus returned HTTP {0}")]
    Status(u16),

    /// The response body was not a Prometheus API response.
    #[error("unable to decode Prometheus response")]
    Decode(#[from] serde_json::Error),

    /// Prometheus reported an error for the query.
    #[error("Prometheus query failed ({error_type}): {error}")]
    Api {
        /// Prometheus error type (e.g. "`bad_data`").
        error_type: String,
        /// Prometheus error message.
        error: String,
    },

    /// The query returned no samples.
    #[error("no data from Prometheus when scraping {metric} ({query})")]
    NoData {
        /// Metric being fetched.
        metric: String,
        /// Query that returned nothing.
        query: String,
    },

    /// The sample value was not a number.
    #[error("unable to parse value from Prometheus {value:?}")]
    InvalidValue {
        /// The raw value.
        value: String,
        /// Parse failure.
        #[source]
        source: ParseFloatError,
    },

    /// The query produced a result type that has no single value.
    #[error("unsupported Prometheus result type {0}")]
    UnsupportedResult(String),
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    status: String,
    #[serde(default)]
    data: Option<QueryData>,
    #[serde(default, rename = "errorType")]
    error_type: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    warnings: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct QueryData {
    #[serde(rename = "resultType")]
    result_type: String,
    result: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct VectorSample {
    value: (f64, String),
}

/// Minimal client for the Prometheus instant query API.
#[derive(Debug, Clone)]
pub struct PrometheusClient {
    http: reqwest::Client,
    query_url: String,
    timeout: Duration,
}

impl PrometheusClient {
    /// Creates a client for the server at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, PollError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            query_url: format!("{}/api/v1/query", base_url.trim_end_matches('/')),
            timeout,
        })
    }

    /// Runs `query` and returns the value of its last sample.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, Prometheus reports an error,
    /// the result is empty, or the value cannot be parsed.
    pub async fn query_value(&self, metric: &str, query: &str) -> Result<f64, PollError> {
        let timeout = format!("{}s", self.timeout.as_secs().max(1));
        let response = self
            .http
            .get(&self.query_url)
            .query(&[("query", query), ("timeout", timeout.as_str())])
            .send()
            .await?;
        let status = response.status();
        let body = response.bytes().await?;

        let parsed: QueryResponse = match serde_json::from_slice(&body) {
            Ok(parsed) => parsed,
            Err(_) if !status.is_success() => return Err(PollError::Status(status.as_u16())),
            Err(err) => return Err(err.into()),
        };

        if !parsed.warnings.is_empty() {
            tracing::warn!(metric, warnings = ?parsed.warnings, "Prometheus returned warnings");
        }

        if parsed.status != "success" {
            return Err(PollError::Api {
                error_type: parsed.error_type.unwrap_or_else(|| "unknown".to_string()),
                error: parsed.error.unwrap_or_default(),
            });
        }

        let no_data = || PollError::NoData {
            metric: metric.to_string(),
            query: query.to_string(),
        };
        let data = parsed.data.ok_or_else(no_data)?;

        let raw = match data.result_type.as_str() {
            "vector" => {
                let mut samples: Vec<VectorSample> = serde_json::from_value(data.result)?;
                samples.pop().ok_or_else(no_data)?.value.1
            }
            "scalar" => {
                let (_, value): (f64, String) = serde_json::from_value(data.result)?;
                value
            }
            other => return Err(PollError::UnsupportedResult(other.to_string())),
        };

        let parsed = raw.trim().parse::<f64>();
        parsed.map_err(|source| PollError::InvalidValue { value: raw, source })
    }
}

/// Formats an error together with its chain of sources.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// Polls the metrics of one widget into the sample cache.
pub struct Poller {
    client: PrometheusClient,
    widget: WidgetConfig,
    samples: SampleCache,
    signals: mpsc::Sender<HealthSignal>,
    interval: Duration,
}

impl Poller {
    /// Creates a poller for `widget`.
    ///
    /// # Errors
    ///
    /// Returns an error if the Prometheus client cannot be built.
    pub fn new(
        widget: WidgetConfig,
        samples: SampleCache,
        signals: mpsc::Sender<HealthSignal>,
        interval: Duration,
        query_timeout: Duration,
    ) -> Result<Self, PollError> {
        let client = PrometheusClient::new(&widget.prometheus_url, query_timeout)?;
        Ok(Self {
            client,
            widget,
            samples,
            signals,
            interval,
        })
    }

    /// Queries every metric once, reports a signal for each, and applies the
    /// values obtained to the cache. Returns the number of values obtained.
    pub async fn fetch(&self) -> usize {
        tracing::debug!(widget = %self.widget.id, "Polling Prometheus");
        let mut batch = Vec::with_capacity(self.widget.metrics.len());

        for (name, metric) in &self.widget.metrics {
            let signal = match self.client.query_value(name, &metric.prometheus_query).await {
                Ok(value) => {
                    batch.push(MetricSample::new(name.clone(), value));
                    HealthSignal::ok(name.clone())
                }
                Err(err) => {
                    let message = error_chain(&err);
                    tracing::warn!(metric = %name, error = %message, "Failed to fetch metric");
                    HealthSignal::failure(name.clone(), message)
                }
            };

            if self.signals.send(signal).await.is_err() {
                tracing::warn!("Health signal receiver dropped");
            }
        }

        match self.samples.update(&batch, &self.widget) {
            Ok(report) => tracing::debug!(
                accepted = report.accepted,
                rejected = report.rejected.len(),
                "Samples updated"
            ),
            Err(e) => tracing::error!(error = %e, "Failed to update samples"),
        }

        batch.len()
    }

    /// Fetches immediately and then once per interval, forever.
    pub async fn run(self) {
        let mut tick = interval(self.interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tick.tick().await;
            self.fetch().await;
        }
    }
}
