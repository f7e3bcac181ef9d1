//! Configuration module for Meteo.
//!
//! This module contains the widget and per-metric configuration shared by the
//! widget server and its Prometheus poller.

pub mod widget;

pub use widget::{ConfigError, Levels, MetricConfig, WidgetConfig};
