//! Qingping Air Monitor Lite.
//!
//! The monitor publishes JSON on `/<prefix>/<mac>/...`. Only messages of type
//! `17` carry readings, in the first entry of `sensorData`.

use super::{DecodeError, Sensor};
use crate::gauges::SensorMetric;
use serde::Deserialize;

/// Message type that carries sensor readings.
pub const SENSOR_DATA_TYPE: &str = "17";

/// Metrics exported for the air monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QingpingMetric {
    /// Room temperature.
    Temperature,
    /// Relative humidity.
    Humidity,
    /// Carbon dioxide concentration.
    Co2,
    /// PM2.5 concentration.
    Pm25,
    /// PM10 concentration.
    Pm10,
}

impl SensorMetric for QingpingMetric {
    const ALL: &'static [Self] = &[
        Self::Temperature,
        Self::Humidity,
        Self::Co2,
        Self::Pm25,
        Self::Pm10,
    ];

    fn name(self) -> &'static str {
        match self {
            Self::Temperature => "upstairs_temperature_celsius",
            Self::Humidity => "upstairs_humidity_percentage",
            Self::Co2 => "upstairs_co2_parts_per_million",
            Self::Pm25 => "upstairs_pm25_micrograms_per_meter_cubed",
            Self::Pm10 => "upstairs_pm10_micrograms_per_meter_cubed",
        }
    }

    fn help(self) -> &'static str {
        match self {
            Self::Temperature => "Current room temperature.",
            Self::Humidity => "Relative humidity in room.",
            Self::Co2 => "Carbon dioxide in parts per million.",
            Self::Pm25 => "PM2.5 µg/m3 averaged over 1 hour.",
            Self::Pm10 => "PM10 µg/m3 averaged over 1 hour.",
        }
    }
}

#[derive(Debug, Deserialize)]
struct Message {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(rename = "sensorData", default)]
    sensor_data: Vec<SensorData>,
}

#[derive(Debug, Deserialize)]
struct SensorData {
    temperature: Option<Measurement>,
    humidity: Option<Measurement>,
    co2: Option<Measurement>,
    pm25: Option<Measurement>,
    pm10: Option<Measurement>,
}

#[derive(Debug, Deserialize)]
struct Measurement {
    value: f64,
}

/// An air monitor identified by its MAC address.
#[derive(Debug, Clone)]
pub struct Qingping {
    mac: String,
}

impl Qingping {
    /// Creates a decoder for the monitor with `mac`.
    #[must_use]
    pub fn new(mac: impl Into<String>) -> Self {
        Self { mac: mac.into() }
    }
}

impl Sensor for Qingping {
    type Metric = QingpingMetric;

    const NAME: &'static str = "qingping";
    const DEFAULT_PORT: u16 = 10001;

    fn topic(&self) -> String {
        format!("/+/{}/#", self.mac)
    }

    fn decode(
        &self,
        _topic: &str,
        payload: &[u8],
    ) -> Result<Vec<(QingpingMetric, f64)>, DecodeError> {
        let message: Message = serde_json::from_slice(payload)?;

        if message.kind != SENSOR_DATA_TYPE {
            tracing::debug!(kind = %message.kind, "Ignoring message without sensorData");
            return Ok(Vec::new());
        }

        if message.sensor_data.len() > 1 {
            tracing::warn!(
                count = message.sensor_data.len(),
                "Multiple sensorData received, expected 1"
            );
        }

        let data = message
            .sensor_data
            .first()
            .ok_or(DecodeError::MissingSensorData)?;

        let readings = [
            (QingpingMetric::Temperature, &data.temperature),
            (QingpingMetric::Humidity, &data.humidity),
            (QingpingMetric::Co2, &data.co2),
            (QingpingMetric::Pm25, &data.pm25),
            (QingpingMetric::Pm10, &data.pm10),
        ]
        .into_iter()
        .filter_map(|(metric, measurement)| measurement.as_ref().map(|m| (metric, m.value)))
        .collect();

        Ok(readings)
    }
}
