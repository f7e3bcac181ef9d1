//! Sensor decoders.
//!
//! A [`Sensor`] knows which MQTT topic its device publishes on and how to
//! turn one message into readings for its metric set.

pub mod misol;
pub mod qingping;

pub use misol::{Misol, MisolMetric};
pub use qingping::{Qingping, QingpingMetric};

use crate::gauges::SensorMetric;
use std::num::ParseFloatError;
use std::str::Utf8Error;
use thiserror::Error;

/// Errors that can occur while decoding a sensor message.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The payload is not valid JSON for the sensor.
    #[error("unable to decode JSON")]
    Json(#[from] serde_json::Error),

    /// A reading message carried no sensor data.
    #[error("message has no sensorData")]
    MissingSensorData,

    /// The payload is not valid UTF-8.
    #[error("payload is not UTF-8")]
    Utf8(#[from] Utf8Error),

    /// A numeric payload could not be parsed.
    #[error("unable to parse float for {field}: {value:?}")]
    InvalidNumber {
        /// Field the payload belongs to.
        field: String,
        /// The raw payload.
        value: String,
        /// The parse failure.
        #[source]
        source: ParseFloatError,
    },
}

/// A device publishing readings over MQTT.
pub trait Sensor: Send + Sync + 'static {
    /// The metrics this sensor exports.
    type Metric: SensorMetric;

    /// Short name, used in the MQTT client id.
    const NAME: &'static str;

    /// Port the `/metrics` endpoint listens on unless overridden.
    const DEFAULT_PORT: u16;

    /// Topic filter to subscribe to.
    fn topic(&self) -> String;

    /// Decodes one message into readings.
    ///
    /// An empty result means the message carries nothing this sensor exports.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload is malformed.
    fn decode(&self, topic: &str, payload: &[u8])
        -> Result<Vec<(Self::Metric, f64)>, DecodeError>;
}
