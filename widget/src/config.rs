//! Server configuration module.
//!
//! Handles loading configuration from environment variables with sensible defaults.

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 10002;
const DEFAULT_WIDGETS_PATH: &str = "config.toml";
const DEFAULT_POLL_INTERVAL_SECS: u64 = 90;
const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 10;

/// Server configuration.
///
/// Configuration values can be set via environment variables:
/// - `METEO_WIDGET_HOST`: The host address to bind to (default: "0.0.0.0")
/// - `METEO_WIDGET_PORT`: The port to listen on (default: 10002)
/// - `METEO_WIDGET_CONFIG`: Path to the widget TOML file (default: "config.toml")
/// - `METEO_POLL_INTERVAL_SECS`: Seconds between Prometheus polls (default: 90)
/// - `METEO_QUERY_TIMEOUT_SECS`: Timeout for each Prometheus query (default: 10)
#[derive(Debug, Clone)]
pub struct Config {
    /// The host address to bind to.
    pub host: String,
    /// The port to listen on.
    pub port: u16,
    /// Path to the widget definition.
    pub widgets_path: PathBuf,
    /// Time between Prometheus polls.
    pub poll_interval: Duration,
    /// Timeout applied to each Prometheus query.
    pub query_timeout: Duration,
}

impl Config {
    /// Creates a new configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a numeric variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self> {
        let host = std::env::var("METEO_WIDGET_HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string());

        let port = std::env::var("METEO_WIDGET_PORT")
            .ok()
            .map(|p| p.parse::<u16>())
            .transpose()
            .context("METEO_WIDGET_PORT must be a port number")?
            .unwrap_or(DEFAULT_PORT);

        let widgets_path = std::env::var("METEO_WIDGET_CONFIG")
            .map_or_else(|_| PathBuf::from(DEFAULT_WIDGETS_PATH), PathBuf::from);

        let poll_interval = secs_from_env("METEO_POLL_INTERVAL_SECS", DEFAULT_POLL_INTERVAL_SECS)?;
        let query_timeout = secs_from_env("METEO_QUERY_TIMEOUT_SECS", DEFAULT_QUERY_TIMEOUT_SECS)?;

        Ok(Self {
            host,
            port,
            widgets_path,
            poll_interval,
            query_timeout,
        })
    }

    /// Returns the socket address for binding.
    ///
    /// # Errors
    ///
    /// Returns an error if the host and port do not form a valid socket address.
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        let addr = if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        };
        addr.parse()
            .with_context(|| format!("Invalid listen address {addr}"))
    }
}

fn secs_from_env(name: &str, default: u64) -> Result<Duration> {
    let secs = std::env::var(name)
        .ok()
        .map(|v| v.parse::<u64>())
        .transpose()
        .with_context(|| format!("{name} must be a whole number of seconds"))?
        .unwrap_or(default);
    Ok(Duration::from_secs(secs))
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            widgets_path: PathBuf::from(DEFAULT_WIDGETS_PATH),
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            query_timeout: Duration::from_secs(DEFAULT_QUERY_TIMEOUT_SECS),
        }
    }
}
