//! Application state module.
//!
//! Defines the shared application state that is passed to route handlers.

use shared::config::WidgetConfig;
use shared::health::{SharedStatus, Status};
use shared::storage::SampleCache;
use std::sync::Arc;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Widgets that may be requested.
    widgets: Arc<Vec<WidgetConfig>>,
    /// Latest accepted sample per metric.
    samples: SampleCache,
    /// Aggregated health of data collection.
    status: SharedStatus,
}

impl AppState {
    /// Creates a new application state.
    #[must_use]
    pub fn new(widgets: Vec<WidgetConfig>, samples: SampleCache, status: SharedStatus) -> Self {
        Self {
            widgets: Arc::new(widgets),
            samples,
            status,
        }
    }

    /// Finds the widget matching both `id` and `token`.
    #[must_use]
    pub fn widget(&self, id: &str, token: &str) -> Option<&WidgetConfig> {
        self.widgets
            .iter()
            .find(|widget| widget.id == id && widget.token == token)
    }

    /// Returns all configured widgets.
    #[must_use]
    pub fn widgets(&self) -> &[WidgetConfig] {
        &self.widgets
    }

    /// Returns the sample cache.
    #[must_use]
    pub fn samples(&self) -> &SampleCache {
        &self.samples
    }

    /// Returns the current health status.
    #[must_use]
    pub fn status(&self) -> Status {
        self.status.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WIDGET: &str = include_str!("../testdata/config.toml");

    fn state() -> AppState {
        let widget = WidgetConfig::from_toml_str(WIDGET).unwrap();
        AppState::new(vec![widget], SampleCache::new(), SharedStatus::new())
    }

    #[test]
    fn test_widget_lookup_requires_matching_token() {
        let state = state();

        assert!(state.widget("sydney", "s3cr3t").is_some());
        assert!(state.widget("sydney", "wrong").is_none());
        assert!(state.widget("melbourne", "s3cr3t").is_none());
    }

    #[test]
    fn test_app_state_is_clone() {
        let state = state();
        let state2 = state.clone();

        state
            .samples()
            .update(
                &[shared::models::MetricSample::new("temperature", 21.0)],
                &false,
            )
            .unwrap();

        assert_eq!(state2.samples().value("temperature").unwrap(), 21.0);
        assert_eq!(state2.widgets().len(), 1);
    }

    #[test]
    fn test_status_reflects_shared_handle() {
        let status = SharedStatus::new();
        let state = AppState::new(Vec::new(), SampleCache::new(), status.clone());

        status.set(Status {
            ok: false,
            message: "down".to_string(),
        });

        assert!(!state.status().ok);
        assert_eq!(state.status().message, "down");
    }
}
