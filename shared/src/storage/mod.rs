//! Storage for the latest accepted metric samples.
//!
//! The `SampleCache` keeps one scalar per metric name and filters implausible
//! jumps before they reach consumers.

pub mod sample_cache;

pub use sample_cache::{
    evaluate, DampenPolicy, SampleCache, SampleCacheError, SampleUpdate, UpdateReport,
    MAX_RELATIVE_CHANGE,
};
