//! Health feedback from data collectors.
//!
//! Poll attempts report one signal per metric; the signals are folded into a
//! single coarse status that decides what the display renders.

pub mod feedback;

pub use feedback::{process_signals, HealthSignal, HealthTracker, SharedStatus, Status};
