//! Meteo Exporters
//!
//! Bridges readings that sensors publish over MQTT into Prometheus gauges.
//! Each process exports one sensor. A staleness monitor marks the gauges as
//! NaN when readings stop and asks the process to exit after prolonged
//! silence, so a supervisor restarts it.
//!
//! # Example
//!
//! ```no_run
//! use exporter::sensors::Misol;
//! use exporter::{run, ExporterConfig, Shutdown};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ExporterConfig {
//!         mqtt_host: "::1".to_string(),
//!         mqtt_port: 1883,
//!         listen: "[::]:10000".parse()?,
//!         ttl: Duration::from_secs(600),
//!     };
//!     if let Shutdown::NoUpdates(_) = run(Misol::default(), config).await? {
//!         std::process::exit(2);
//!     }
//!     Ok(())
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod cli;
pub mod gauges;
pub mod mqtt;
pub mod sensors;
pub mod server;

use anyhow::{Context, Result};
use gauges::SensorGauges;
use mqtt::Listener;
use prometheus::Registry;
use sensors::Sensor;
use shared::shutdown::shutdown_signal;
use shared::staleness::{NoUpdates, StalenessMonitor, StalenessPolicy};
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

/// Runtime settings of an exporter.
#[derive(Debug, Clone)]
pub struct ExporterConfig {
    /// Hostname or address of the MQTT broker.
    pub mqtt_host: String,
    /// TCP port of the MQTT broker.
    pub mqtt_port: u16,
    /// Address the `/metrics` endpoint listens on.
    pub listen: SocketAddr,
    /// Silence after which gauges are marked unavailable.
    pub ttl: Duration,
}

/// Why an exporter stopped.
#[derive(Debug)]
pub enum Shutdown {
    /// A shutdown signal was received.
    Signal,
    /// The sensor stayed silent past the exit threshold.
    NoUpdates(NoUpdates),
}

/// Runs the exporter for `sensor` until a shutdown signal arrives or the
/// sensor goes silent for too long.
///
/// # Errors
///
/// Returns an error if:
/// - The gauges cannot be registered
/// - The metrics endpoint fails to bind or stops serving
pub async fn run<S: Sensor>(sensor: S, config: ExporterConfig) -> Result<Shutdown> {
    let registry = Registry::new();
    let gauges = Arc::new(
        SensorGauges::<S::Metric>::register(&registry).context("Failed to register gauges")?,
    );

    let policy = StalenessPolicy::new(config.ttl);
    tracing::info!(
        sensor = S::NAME,
        ttl = ?policy.ttl,
        exit_after = ?policy.exit_after,
        "Meteo exporter starting"
    );

    // Started before MQTT so an unreachable broker still degrades the gauges.
    let (monitor, refresh) = StalenessMonitor::new(policy, Arc::clone(&gauges));
    let monitor = tokio::spawn(monitor.run());

    let client_id = mqtt::client_id(S::NAME);
    tracing::info!(
        %client_id,
        host = %config.mqtt_host,
        port = config.mqtt_port,
        topic = %sensor.topic(),
        "Connecting to MQTT broker"
    );
    let options = mqtt::mqtt_options(&client_id, &config.mqtt_host, config.mqtt_port);
    let listener = tokio::spawn(Listener::new(sensor, gauges, refresh).run(options));

    let tcp = TcpListener::bind(config.listen)
        .await
        .with_context(|| format!("Failed to bind metrics endpoint to {}", config.listen))?;
    tracing::info!(addr = %config.listen, "Serving /metrics");
    let server = axum::serve(tcp, server::metrics_router(registry)).into_future();

    let shutdown = tokio::select! {
        result = monitor => Shutdown::NoUpdates(result.context("Staleness monitor panicked")?),
        result = server => {
            result.context("Metrics endpoint failed")?;
            anyhow::bail!("Metrics endpoint stopped unexpectedly");
        }
        () = shutdown_signal() => Shutdown::Signal,
    };

    listener.abort();
    Ok(shutdown)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sensors::Misol;

    #[tokio::test(start_paused = true)]
    async fn test_unreachable_broker_ends_with_no_updates() {
        let config = ExporterConfig {
            mqtt_host: "127.0.0.1".to_string(),
            mqtt_port: 1,
            listen: "127.0.0.1:0".parse().unwrap(),
            ttl: Duration::from_secs(1),
        };

        let shutdown = run(Misol::default(), config).await.unwrap();

        match shutdown {
            Shutdown::NoUpdates(reason) => {
                assert_eq!(reason.exit_after, Duration::from_secs(10));
                assert!(reason.silence > reason.exit_after);
            }
            Shutdown::Signal => panic!("expected NoUpdates"),
        }
    }
}
