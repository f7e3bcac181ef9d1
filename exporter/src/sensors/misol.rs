//! Misol weather station, received through rtl_433.
//!
//! rtl_433 publishes every decoded field on its own topic, with the field
//! name as the last topic segment and a plain decimal as payload.

use super::{DecodeError, Sensor};
use crate::gauges::SensorMetric;

/// Topic filter rtl_433 publishes under by default.
pub const DEFAULT_TOPIC: &str = "sensors/rtl_433/#";

/// Metrics exported for the weather station.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MisolMetric {
    /// Battery status, 1 when ok.
    Battery,
    /// Outside temperature.
    Temperature,
    /// Outside relative humidity.
    Humidity,
    /// Wind direction.
    WindDirection,
    /// Average wind speed.
    WindAverage,
    /// Wind gust speed.
    WindBurst,
    /// Rain gauge total.
    Rain,
}

impl MisolMetric {
    /// Maps an rtl_433 field name onto a metric.
    #[must_use]
    pub fn from_field(field: &str) -> Option<Self> {
        match field {
            "battery_ok" => Some(Self::Battery),
            "temperature_C" => Some(Self::Temperature),
            "humidity" => Some(Self::Humidity),
            "wind_dir_deg" => Some(Self::WindDirection),
            "wind_avg_km_h" => Some(Self::WindAverage),
            "wind_max_km_h" => Some(Self::WindBurst),
            "rain_mm" => Some(Self::Rain),
            _ => None,
        }
    }
}

impl SensorMetric for MisolMetric {
    const ALL: &'static [Self] = &[
        Self::Battery,
        Self::Temperature,
        Self::Humidity,
        Self::WindDirection,
        Self::WindAverage,
        Self::WindBurst,
        Self::Rain,
    ];

    fn name(self) -> &'static str {
        match self {
            Self::Battery => "outdoor_battery",
            Self::Temperature => "outdoor_temperature_celsius",
            Self::Humidity => "outdoor_humidity_percentage",
            Self::WindDirection => "outdoor_wind_direction_degree",
            Self::WindAverage => "outdoor_wind_speed_average_kilometers_per_hour",
            Self::WindBurst => "outdoor_wind_speed_burst_kilometers_per_hour",
            Self::Rain => "outdoor_rain_millimetres",
        }
    }

    fn help(self) -> &'static str {
        match self {
            Self::Battery => "Current battery status of weather station.",
            Self::Temperature => "Current temperature outside of house.",
            Self::Humidity => "Relative humidity outside of house.",
            Self::WindDirection => "Direction of wind in degrees.",
            Self::WindAverage => "Average wind speed in kilometers per hour.",
            Self::WindBurst => "Max burst wind speed in kilometers per hour.",
            Self::Rain => "Rainfall in millimeters.",
        }
    }
}

/// A weather station whose fields arrive under `topic`.
#[derive(Debug, Clone)]
pub struct Misol {
    topic: String,
}

impl Misol {
    /// Creates a decoder subscribing to `topic`.
    #[must_use]
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
        }
    }
}

impl Default for Misol {
    fn default() -> Self {
        Self::new(DEFAULT_TOPIC)
    }
}

impl Sensor for Misol {
    type Metric = MisolMetric;

    const NAME: &'static str = "misol";
    const DEFAULT_PORT: u16 = 10000;

    fn topic(&self) -> String {
        self.topic.clone()
    }

    fn decode(&self, topic: &str, payload: &[u8]) -> Result<Vec<(MisolMetric, f64)>, DecodeError> {
        let field = topic.rsplit('/').next().unwrap_or(topic);
        let Some(metric) = MisolMetric::from_field(field) else {
            return Ok(Vec::new());
        };

        let raw = std::str::from_utf8(payload)?.trim();
        let value = raw
            .parse::<f64>()
            .map_err(|source| DecodeError::InvalidNumber {
                field: field.to_string(),
                value: raw.to_string(),
                source,
            })?;

        Ok(vec![(metric, value)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(field: &str, payload: &str) -> Result<Vec<(MisolMetric, f64)>, DecodeError> {
        let topic = format!("sensors/rtl_433/P38/C0/{field}");
        Misol::default().decode(&topic, payload.as_bytes())
    }

    #[test]
    fn test_default_topic() {
        assert_eq!(Misol::default().topic(), "sensors/rtl_433/#");
        assert_eq!(Misol::new("rtl/#").topic(), "rtl/#");
    }

    #[test]
    fn test_decode_each_field() {
        let cases = [
            ("battery_ok", "1", MisolMetric::Battery, 1.0),
            ("temperature_C", "20.800", MisolMetric::Temperature, 20.8),
            ("humidity", "68", MisolMetric::Humidity, 68.0),
            ("wind_dir_deg", "135", MisolMetric::WindDirection, 135.0),
            ("wind_avg_km_h", "1.224", MisolMetric::WindAverage, 1.224),
            ("wind_max_km_h", "2.448", MisolMetric::WindBurst, 2.448),
            ("rain_mm", "70.200", MisolMetric::Rain, 70.2),
        ];

        for (field, payload, metric, value) in cases {
            assert_eq!(decode(field, payload).unwrap(), vec![(metric, value)], "{field}");
        }
    }

    #[test]
    fn test_unknown_fields_are_ignored() {
        assert!(decode("model", "Fineoffset-WHx080").unwrap().is_empty());
        assert!(decode("time", "2023-02-23 11:22:24").unwrap().is_empty());
        assert!(decode("id", "240").unwrap().is_empty());
    }

    #[test]
    fn test_surrounding_whitespace_is_accepted() {
        assert_eq!(
            decode("humidity", " 68\n").unwrap(),
            vec![(MisolMetric::Humidity, 68.0)]
        );
    }

    #[test]
    fn test_invalid_number_is_an_error() {
        let err = decode("temperature_C", "warm").unwrap_err();

        assert_eq!(err.to_string(), "unable to parse float for temperature_C: \"warm\"");
    }

    #[test]
    fn test_invalid_utf8_is_an_error() {
        let err = Misol::default()
            .decode("sensors/rtl_433/rain_mm", &[0xff, 0xfe])
            .unwrap_err();

        assert!(matches!(err, DecodeError::Utf8(_)));
    }

    #[test]
    fn test_field_names_round_trip() {
        for field in [
            "battery_ok",
            "temperature_C",
            "humidity",
            "wind_dir_deg",
            "wind_avg_km_h",
            "wind_max_km_h",
            "rain_mm",
        ] {
            assert!(MisolMetric::from_field(field).is_some(), "{field}");
        }
        assert_eq!(MisolMetric::ALL.len(), 7);
    }
}
