//! Data models for the Meteo utilities.
//!
//! This module contains the measurement types that flow from reading sources
//! into the sample cache and the staleness monitor.

pub mod sample;

pub use sample::MetricSample;
