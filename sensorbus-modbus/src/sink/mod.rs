//! Telemetry sinks.

mod influx;
mod logger;

use std::future::Future;
use std::sync::Arc;

use sensorbus_bridge_framework::{BridgeError, Publisher, TelemetryPoint};
use tracing::info;

use crate::config::SinkConfig;

pub use influx::{InfluxSink, line_protocol};
pub use logger::LogSink;

/// Error type for sink writes.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Write rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("Publish failed: {0}")]
    Publish(String),
    #[error("Serialization failed: {0}")]
    Serialization(String),
}

impl From<BridgeError> for SinkError {
    fn from(err: BridgeError) -> Self {
        match err {
            BridgeError::Serialization(msg) => SinkError::Serialization(msg),
            other => SinkError::Publish(other.to_string()),
        }
    }
}

/// Destination for whole batches of telemetry points.
pub trait TelemetrySink: Send {
    /// Write one batch. Called once per cycle.
    fn write_batch(
        &mut self,
        points: &[TelemetryPoint],
    ) -> impl Future<Output = Result<(), SinkError>> + Send;

    /// Short name used in log output.
    fn name(&self) -> &str;
}

impl TelemetrySink for Publisher {
    async fn write_batch(&mut self, points: &[TelemetryPoint]) -> Result<(), SinkError> {
        self.publish_batch(points).await?;
        Ok(())
    }

    fn name(&self) -> &str {
        "zenoh"
    }
}

/// Sink selected at startup from configuration.
#[derive(Debug)]
pub enum Sink {
    Log(LogSink),
    Influx(InfluxSink),
    Zenoh(Publisher),
}

impl Sink {
    /// Build the configured sink, opening a Zenoh session if needed.
    pub async fn from_config(config: &SinkConfig) -> Result<Self, SinkError> {
        let sink = match config {
            SinkConfig::Log => Sink::Log(LogSink::new()),
            SinkConfig::Influxdb(influx) => Sink::Influx(InfluxSink::new(influx)?),
            SinkConfig::Zenoh(zenoh) => {
                let session = sensorbus_common::connect(&zenoh.zenoh)
                    .await
                    .map_err(|e| SinkError::Publish(e.to_string()))?;
                Sink::Zenoh(Publisher::new(
                    Arc::new(session),
                    zenoh.key_prefix.clone(),
                    zenoh.format,
                ))
            }
        };

        info!(sink = sink.name(), "Telemetry sink ready");
        Ok(sink)
    }

    /// Release the sink's connection, if it holds one.
    pub async fn close(&self) -> Result<(), SinkError> {
        if let Sink::Zenoh(publisher) = self {
            publisher.close().await?;
        }
        Ok(())
    }
}

impl TelemetrySink for Sink {
    async fn write_batch(&mut self, points: &[TelemetryPoint]) -> Result<(), SinkError> {
        match self {
            Sink::Log(sink) => sink.write_batch(points).await,
            Sink::Influx(sink) => sink.write_batch(points).await,
            Sink::Zenoh(sink) => sink.write_batch(points).await,
        }
    }

    fn name(&self) -> &str {
        match self {
            Sink::Log(sink) => sink.name(),
            Sink::Influx(sink) => sink.name(),
            Sink::Zenoh(sink) => sink.name(),
        }
    }
}
