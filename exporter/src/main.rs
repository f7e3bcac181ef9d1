//! Meteo Exporter Binary
//!
//! Entry point for the MQTT to Prometheus exporters.
//!
//! # Usage
//!
//! ```bash
//! meteo-exporter misol
//! meteo-exporter qingping --mac 582D3470XXXX --ttl 5m
//! ```

#![deny(unsafe_code)]

use anyhow::Result;
use clap::Parser;
use exporter::cli::{Cli, SensorCommand};
use exporter::sensors::{Misol, Qingping, Sensor};
use exporter::{run, ExporterConfig, Shutdown};
use shared::staleness::NO_UPDATES_EXIT_CODE;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .init();

    let shutdown = match &cli.sensor {
        SensorCommand::Qingping { mac } => {
            run(Qingping::new(mac.clone()), config(&cli, Qingping::DEFAULT_PORT)).await?
        }
        SensorCommand::Misol { topic } => {
            run(Misol::new(topic.clone()), config(&cli, Misol::DEFAULT_PORT)).await?
        }
    };

    match shutdown {
        Shutdown::Signal => {
            tracing::info!("Exporter shutdown complete");
            Ok(())
        }
        Shutdown::NoUpdates(reason) => {
            tracing::error!(%reason, "Exiting after prolonged silence");
            std::process::exit(NO_UPDATES_EXIT_CODE);
        }
    }
}

fn config(cli: &Cli, default_port: u16) -> ExporterConfig {
    ExporterConfig {
        mqtt_host: cli.mqtt_host.clone(),
        mqtt_port: cli.mqtt_port,
        listen: cli.listen_addr(default_port),
        ttl: cli.ttl,
    }
}
