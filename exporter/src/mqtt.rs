//! MQTT subscription feeding sensor readings into gauges.

use crate::gauges::{SensorGauges, SensorMetric};
use crate::sensors::Sensor;
use anyhow::Result;
use rumqttc::{AsyncClient, Event, Incoming, MqttOptions, QoS};
use shared::staleness::RefreshHandle;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

const KEEP_ALIVE: Duration = Duration::from_secs(60);
const REQUEST_CAPACITY: usize = 10;
const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Builds the client id `<sensor>_exporter-<hostname>-<pid>`.
#[must_use]
pub fn client_id(sensor: &str) -> String {
    let hostname = sysinfo::System::host_name().unwrap_or_else(|| "unknown".to_string());
    format!("{sensor}_exporter-{hostname}-{}", std::process::id())
}

/// Connection options for the broker at `host:port`.
#[must_use]
pub fn mqtt_options(client_id: &str, host: &str, port: u16) -> MqttOptions {
    let mut options = MqttOptions::new(client_id, host, port);
    options.set_keep_alive(KEEP_ALIVE);
    options
}

/// Applies messages of one sensor to its gauges.
pub struct Listener<S: Sensor> {
    sensor: S,
    gauges: Arc<SensorGauges<S::Metric>>,
    refresh: RefreshHandle,
}

impl<S: Sensor> Listener<S> {
    /// Creates a listener updating `gauges` and reporting to `refresh`.
    pub fn new(sensor: S, gauges: Arc<SensorGauges<S::Metric>>, refresh: RefreshHandle) -> Self {
        Self {
            sensor,
            gauges,
            refresh,
        }
    }

    /// Decodes one message and sets the gauges it carries readings for.
    ///
    /// A refresh is recorded only when at least one reading was applied.
    /// Malformed messages are logged and discarded. Returns the number of
    /// gauges set.
    pub fn handle_publish(&self, topic: &str, payload: &[u8]) -> usize {
        tracing::debug!(
            topic,
            payload = %String::from_utf8_lossy(payload),
            "Received message"
        );

        let readings = match self.sensor.decode(topic, payload) {
            Ok(readings) => readings,
            Err(e) => {
                tracing::warn!(topic, error = %e, "Discarding malformed message");
                return 0;
            }
        };

        for &(metric, value) in &readings {
            tracing::debug!(metric = metric.name(), value, "Updating gauge");
            self.gauges.set(metric, value);
        }

        if !readings.is_empty() {
            self.refresh.record_refresh(Instant::now());
        }
        readings.len()
    }

    /// Subscribes and processes messages forever, reconnecting with
    /// exponential back-off after connection errors.
    pub async fn run(self, options: MqttOptions) {
        let mut backoff = INITIAL_BACKOFF;

        loop {
            if let Err(e) = self.run_once(options.clone(), &mut backoff).await {
                tracing::warn!(retry_in = ?backoff, "MQTT connection failed: {e:#}");
            }
            tokio::time::sleep(backoff).await;
            backoff = (backoff * 2).min(MAX_BACKOFF);
        }
    }

    async fn run_once(&self, options: MqttOptions, backoff: &mut Duration) -> Result<()> {
        let (client, mut eventloop) = AsyncClient::new(options, REQUEST_CAPACITY);
        let topic = self.sensor.topic();
        client.subscribe(topic.as_str(), QoS::AtLeastOnce).await?;

        loop {
            match eventloop.poll().await? {
                Event::Incoming(Incoming::ConnAck(_)) => {
                    tracing::info!("Connected to MQTT broker");
                    *backoff = INITIAL_BACKOFF;
                }
                Event::Incoming(Incoming::SubAck(_)) => {
                    tracing::info!(%topic, "Subscribed to topic");
                }
                Event::Incoming(Incoming::Publish(publish)) => {
                    self.handle_publish(&publish.topic, &publish.payload);
                }
                Event::Incoming(Incoming::Disconnect) => {
                    anyhow::bail!("broker closed the connection");
                }
                _ => {}
            }
        }
    }
}
