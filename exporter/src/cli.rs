//! Command-line interface.

use crate::sensors::misol::DEFAULT_TOPIC;
use clap::{Parser, Subcommand};
use std::net::{Ipv6Addr, SocketAddr};
use std::time::Duration;

/// Meteo exporter - publishes MQTT sensor readings as Prometheus metrics
#[derive(Debug, Parser)]
#[command(name = "meteo-exporter")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Hostname or address of the MQTT broker
    #[arg(long, global = true, env = "METEO_MQTT_HOST", default_value = "::1")]
    pub mqtt_host: String,

    /// TCP port of the MQTT broker
    #[arg(long, global = true, env = "METEO_MQTT_PORT", default_value_t = 1883)]
    pub mqtt_port: u16,

    /// Address the /metrics endpoint listens on (defaults per sensor)
    #[arg(long, global = true, env = "METEO_LISTEN")]
    pub listen: Option<SocketAddr>,

    /// How long to wait for updates before exporting NaN
    #[arg(
        long,
        global = true,
        env = "METEO_TTL",
        default_value = "10m",
        value_parser = humantime::parse_duration
    )]
    pub ttl: Duration,

    /// Turn on debug output
    #[arg(short, long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub sensor: SensorCommand,
}

/// Sensor to export.
#[derive(Debug, Subcommand)]
pub enum SensorCommand {
    /// Qingping Air Monitor Lite
    Qingping {
        /// MAC address of the monitor
        #[arg(short, long)]
        mac: String,
    },
    /// Misol weather station received through rtl_433
    Misol {
        /// Topic filter rtl_433 publishes under
        #[arg(long, default_value = DEFAULT_TOPIC)]
        topic: String,
    },
}

impl Cli {
    /// Returns the listen address, falling back to `[::]:<default_port>`.
    #[must_use]
    pub fn listen_addr(&self, default_port: u16) -> SocketAddr {
        self.listen
            .unwrap_or_else(|| SocketAddr::from((Ipv6Addr::UNSPECIFIED, default_port)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_requires_sensor() {
        assert!(Cli::try_parse_from(["meteo-exporter"]).is_err());
    }

    #[test]
    fn test_cli_misol_defaults() {
        let cli = Cli::try_parse_from(["meteo-exporter", "misol"]).unwrap();

        assert_eq!(cli.mqtt_host, "::1");
        assert_eq!(cli.mqtt_port, 1883);
        assert_eq!(cli.ttl, Duration::from_secs(600));
        assert!(!cli.debug);
        assert!(matches!(
            cli.sensor,
            SensorCommand::Misol { ref topic } if topic == "sensors/rtl_433/#"
        ));
        assert_eq!(cli.listen_addr(10000).to_string(), "[::]:10000");
    }

    #[test]
    fn test_cli_qingping_requires_mac() {
        assert!(Cli::try_parse_from(["meteo-exporter", "qingping"]).is_err());

        let cli =
            Cli::try_parse_from(["meteo-exporter", "qingping", "--mac", "582D3470XXXX"]).unwrap();
        assert!(matches!(
            cli.sensor,
            SensorCommand::Qingping { ref mac } if mac == "582D3470XXXX"
        ));
    }

    #[test]
    fn test_cli_global_options_after_subcommand() {
        let cli = Cli::try_parse_from([
            "meteo-exporter",
            "misol",
            "--ttl",
            "90s",
            "--mqtt-host",
            "broker.local",
            "--listen",
            "127.0.0.1:9100",
            "-d",
        ])
        .unwrap();

        assert_eq!(cli.ttl, Duration::from_secs(90));
        assert_eq!(cli.mqtt_host, "broker.local");
        assert_eq!(cli.listen_addr(10000).to_string(), "127.0.0.1:9100");
        assert!(cli.debug);
    }

    #[test]
    fn test_cli_rejects_invalid_ttl() {
        assert!(Cli::try_parse_from(["meteo-exporter", "misol", "--ttl", "soon"]).is_err());
    }

    #[test]
    fn test_cli_huge_ttl_builds_policy() {
        let cli =
            Cli::try_parse_from(["meteo-exporter", "misol", "--ttl", "100000000000y"]).unwrap();
        let policy = shared::staleness::StalenessPolicy::new(cli.ttl);

        assert_eq!(policy.ttl, cli.ttl);
        assert_eq!(policy.exit_after, Duration::MAX);
    }
}
