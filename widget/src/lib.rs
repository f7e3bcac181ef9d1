//! Meteo Widget Server
//!
//! This crate serves the JSON documents polled by a small physical display.
//! Values are fetched periodically from Prometheus, passed through the shared
//! sample cache, and rendered into either a weather layout or an error layout
//! depending on the aggregated health of the fetches.
//!
//! # Example
//!
//! ```no_run
//! use widget::run_server;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     run_server().await
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod config;
pub mod layout;
pub mod prometheus;
pub mod render;
mod routes;
mod state;

pub use config::Config;
pub use state::AppState;

use anyhow::{Context, Result};
use axum::Router;
use prometheus::Poller;
use shared::config::WidgetConfig;
use shared::health::{process_signals, SharedStatus};
use shared::shutdown::shutdown_signal;
use shared::storage::SampleCache;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tower_http::trace::TraceLayer;

const SIGNAL_BUFFER: usize = 1024;

/// Runs the widget server.
///
/// Configuration is read from environment variables. The server shuts down
/// gracefully on SIGTERM/SIGINT.
///
/// # Errors
///
/// Returns an error if:
/// - Configuration cannot be loaded from environment
/// - The widget definition cannot be read or is invalid
/// - The server fails to bind to the configured address
pub async fn run_server() -> Result<()> {
    let config = Config::from_env()?;
    run_server_with_config(config).await
}

/// Runs the widget server with the provided configuration.
///
/// # Errors
///
/// Returns an error if:
/// - The widget definition cannot be read or is invalid
/// - The Prometheus client cannot be built
/// - The server fails to bind to the configured address
pub async fn run_server_with_config(config: Config) -> Result<()> {
    let addr = config.socket_addr()?;
    let widgets = WidgetConfig::load(&config.widgets_path).with_context(|| {
        format!(
            "Failed to load widgets from {}",
            config.widgets_path.display()
        )
    })?;

    tracing::info!(
        host = %config.host,
        port = %config.port,
        widgets = widgets.len(),
        "Meteo widget server starting"
    );

    let samples = SampleCache::new();
    let status = SharedStatus::new();
    let (signal_tx, signal_rx) = mpsc::channel(SIGNAL_BUFFER);
    tokio::spawn(process_signals(signal_rx, status.clone()));

    // A single poller keeps the cache single-writer.
    if let Some(widget) = widgets.first() {
        let poller = Poller::new(
            widget.clone(),
            samples.clone(),
            signal_tx,
            config.poll_interval,
            config.query_timeout,
        )
        .context("Failed to create Prometheus poller")?;
        tracing::info!(
            widget = %widget.id,
            prometheus = %widget.prometheus_url,
            interval = ?config.poll_interval,
            "Polling Prometheus"
        );
        tokio::spawn(poller.run());
    }

    let app = create_router(AppState::new(widgets, samples, status));
    let listener = TcpListener::bind(addr).await?;

    tracing::info!(%addr, "Listening for connections");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Creates the main application router with all routes and middleware.
///
/// This function is public to allow testing the router without starting a full server.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(routes::health_routes())
        .merge(routes::widget_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn app() -> Router {
        create_router(AppState::new(
            Vec::new(),
            SampleCache::new(),
            SharedStatus::new(),
        ))
    }

    #[tokio::test]
    async fn test_health_endpoint_returns_200() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unknown_route_returns_404() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/nope")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_config_default_values() {
        let config = Config::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 10002);
    }
}
