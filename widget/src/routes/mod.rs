//! HTTP route definitions.
//!
//! This module organizes all HTTP routes for the widget server.

mod health;
mod widgets;

pub use health::health_routes;
pub use widgets::widget_routes;
