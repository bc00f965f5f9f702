use sensorbus_bridge_framework::TelemetryPoint;
use tracing::info;

use super::{SinkError, TelemetrySink};

/// Prints every point through `tracing`. Never fails.
#[derive(Debug, Clone, Default)]
pub struct LogSink {
    batches: u64,
}

impl LogSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of batches written so far.
    pub fn batches(&self) -> u64 {
        self.batches
    }
}

impl TelemetrySink for LogSink {
    async fn write_batch(&mut self, points: &[TelemetryPoint]) -> Result<(), SinkError> {
        self.batches += 1;
        for point in points {
            let device = point.tags.get("device_id").map(String::as_str).unwrap_or("-");
            info!(
                measurement = %point.measurement,
                device_id = device,
                timestamp = point.timestamp,
                "{} {} = {}",
                device,
                point.measurement,
                point.value
            );
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "log"
    }
}
