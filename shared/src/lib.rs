//! Meteo Shared Library
//!
//! This crate contains the state machinery shared by the Meteo sensor
//! exporters and the display widget server.
//!
//! # Modules
//!
//! - [`models`] - Data models for metric samples
//! - [`storage`] - The last-known-good sample cache with outlier dampening
//! - [`health`] - Per-metric health signals and the aggregate status
//! - [`staleness`] - Detection of sources that stopped delivering readings
//! - [`config`] - Widget and metric configuration loaded from TOML
//! - [`shutdown`] - Graceful shutdown on SIGTERM/SIGINT
//!
//! # Example
//!
//! ```
//! use shared::models::MetricSample;
//! use shared::storage::SampleCache;
//! use std::collections::HashMap;
//!
//! let cache = SampleCache::new();
//! let no_dampening: HashMap<String, bool> = HashMap::new();
//!
//! cache
//!     .update(&[MetricSample::new("temperature", 21.5)], &no_dampening)
//!     .unwrap();
//!
//! assert_eq!(cache.value("temperature").unwrap(), 21.5);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod health;
pub mod models;
pub mod shutdown;
pub mod staleness;
pub mod storage;

/// Re-export common dependencies for convenience.
pub use chrono;
pub use serde;
pub use serde_json;
pub use validator;
