//! Cycle to telemetry batch conversion and delivery.

use sensorbus_bridge_framework::{Measurement, TelemetryPoint};
use sensorbus_common::current_timestamp_millis;
use tracing::info;

use crate::reading::Cycle;
use crate::sink::{SinkError, TelemetrySink};

/// Tag carrying the reading's source identifier.
pub const DEVICE_ID_TAG: &str = "device_id";

/// Two points per reading, sharing one timestamp.
pub fn build_batch(cycle: &Cycle, timestamp_ms: i64) -> Vec<TelemetryPoint> {
    let mut points = Vec::with_capacity(cycle.len() * 2);

    for reading in cycle {
        for (measurement, value) in [
            (Measurement::Temperature, reading.temperature),
            (Measurement::Humidity, reading.humidity),
        ] {
            points.push(
                TelemetryPoint::new(measurement, value, timestamp_ms)
                    .with_tag(DEVICE_ID_TAG, reading.device_id.as_str())
                    .with_tags(
                        reading
                            .tags
                            .iter()
                            .filter(|(k, _)| k.as_str() != DEVICE_ID_TAG)
                            .map(|(k, v)| (k.as_str(), v.as_str())),
                    ),
            );
        }
    }

    points
}

/// Hands each cycle to a sink as a single batch.
#[derive(Debug)]
pub struct Forwarder<K> {
    sink: K,
}

impl<K: TelemetrySink> Forwarder<K> {
    pub fn new(sink: K) -> Self {
        Self { sink }
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    pub fn into_sink(self) -> K {
        self.sink
    }

    /// Write `cycle` as one batch and return the number of points sent.
    ///
    /// An empty cycle sends nothing.
    pub async fn forward(&mut self, cycle: &Cycle) -> Result<usize, SinkError> {
        if cycle.is_empty() {
            return Ok(0);
        }

        let points = build_batch(cycle, current_timestamp_millis());
        self.sink.write_batch(&points).await?;

        info!(
            sink = self.sink.name(),
            points = points.len(),
            "Wrote {} readings",
            cycle.len()
        );
        Ok(points.len())
    }
}
