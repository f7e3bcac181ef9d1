//! Widget configuration loaded from TOML.
//!
//! A widget file describes one display widget: who may fetch it, where its
//! data comes from, and how each metric is queried and shown.
//!
//! ```toml
//! id = "sydney"
//! token = "s3cr3t"
//! name = "Sydney"
//! prometheus_url = "http://localhost:9090"
//!
//! [metrics.temperature]
//! display_unit = "°"
//! prometheus_query = "outdoor_temperature_celsius"
//! dampen_outliers = true
//!
//! [metrics.temperature.levels]
//! low = 10
//! medium = 20
//! high = 30
//! ```

use crate::storage::DampenPolicy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use validator::{Validate, ValidationError};

/// Errors that can occur while loading widget configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("Failed to read widget config {}: {source}", .path.display())]
    Read {
        /// Path that was read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML for a widget.
    #[error("Failed to parse widget config: {0}")]
    Parse(#[from] toml::de::Error),

    /// The widget failed validation.
    #[error("Invalid widget config: {0}")]
    Invalid(#[from] validator::ValidationErrors),
}

/// Colour thresholds for a metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Levels {
    /// Values at or above this are "low".
    pub low: i64,
    /// Values at or above this are "medium".
    pub medium: i64,
    /// Values at or above this are "high".
    pub high: i64,
}

impl Levels {
    /// Returns true if `low <= medium <= high`.
    #[must_use]
    pub fn is_ordered(&self) -> bool {
        self.low <= self.medium && self.medium <= self.high
    }
}

/// How to gather and display one metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricConfig {
    /// Suffix appended to the rendered value (e.g. "°", "mm").
    #[serde(default)]
    pub display_unit: String,

    /// `PromQL` expression returning a single value.
    pub prometheus_query: String,

    /// Whether implausible jumps are rejected by the sample cache.
    #[serde(default)]
    pub dampen_outliers: bool,

    /// Optional colour thresholds.
    #[serde(default)]
    pub levels: Option<Levels>,
}

/// A display widget definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct WidgetConfig {
    /// Identifier used in the request path.
    #[validate(length(min = 1, message = "Widget id cannot be empty"))]
    pub id: String,

    /// Token the request must carry.
    #[serde(default)]
    pub token: String,

    /// Display name.
    #[serde(default)]
    pub name: String,

    /// Display description.
    #[serde(default)]
    pub description: String,

    /// Link opened when the widget is tapped.
    #[serde(default)]
    pub widget_url: String,

    /// Base URL of the Prometheus server to poll.
    #[validate(url(message = "prometheus_url must be a valid URL"))]
    pub prometheus_url: String,

    /// Metrics shown on the widget, keyed by the name used as `data_ref`.
    #[serde(default)]
    #[validate(custom(function = "validate_metrics"))]
    pub metrics: BTreeMap<String, MetricConfig>,
}

fn validate_metrics(metrics: &BTreeMap<String, MetricConfig>) -> Result<(), ValidationError> {
    for (name, metric) in metrics {
        if metric.prometheus_query.trim().is_empty() {
            let mut err = ValidationError::new("empty_query");
            err.message = Some(format!("Metric {name} has an empty prometheus_query").into());
            return Err(err);
        }
        if metric.levels.is_some_and(|l| !l.is_ordered()) {
            let mut err = ValidationError::new("unordered_levels");
            err.message = Some(
                format!("Metric {name} levels must satisfy low <= medium <= high").into(),
            );
            return Err(err);
        }
    }
    Ok(())
}

impl WidgetConfig {
    /// Parses and validates a widget from TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a valid widget definition.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let widget: Self = toml::from_str(s)?;
        widget.validate()?;
        Ok(widget)
    }

    /// Loads the widgets described by the file at `path`.
    ///
    /// A file describes a single widget.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or validated.
    pub fn load(path: impl AsRef<Path>) -> Result<Vec<Self>, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(vec![Self::from_toml_str(&content)?])
    }

    /// Returns the configuration of a metric.
    #[must_use]
    pub fn metric(&self, name: &str) -> Option<&MetricConfig> {
        self.metrics.get(name)
    }
}

impl DampenPolicy for WidgetConfig {
    fn dampens(&self, metric: &str) -> bool {
        self.metric(metric).is_some_and(|m| m.dampen_outliers)
    }
}
