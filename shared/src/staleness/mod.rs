//! Staleness detection for sensor sources.
//!
//! A source that stops delivering readings first has its gauges marked as
//! unavailable (NaN), and after prolonged silence the monitor asks the process
//! to exit so a supervisor can restart it.

pub mod dedup;
pub mod monitor;
pub mod state;

pub use dedup::LogDedup;
pub use monitor::{GaugeSet, NoUpdates, RefreshHandle, StalenessMonitor, NO_UPDATES_EXIT_CODE};
pub use state::{StalenessPolicy, StalenessState, EXIT_AFTER_TTL_MULTIPLE};
