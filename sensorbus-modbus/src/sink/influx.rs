//! InfluxDB 1.x HTTP write sink.

use std::fmt::Write;
use std::time::Duration;

use reqwest::Client;
use sensorbus_bridge_framework::TelemetryPoint;
use tracing::debug;

use super::{SinkError, TelemetrySink};
use crate::config::InfluxConfig;

/// Writes batches as line protocol to `{url}/write`.
#[derive(Debug, Clone)]
pub struct InfluxSink {
    client: Client,
    write_url: String,
    database: String,
    username: Option<String>,
    password: Option<String>,
}

impl InfluxSink {
    pub fn new(config: &InfluxConfig) -> Result<Self, SinkError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        Ok(Self {
            client,
            write_url: format!("{}/write", config.url.trim_end_matches('/')),
            database: config.database.clone(),
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    pub fn write_url(&self) -> &str {
        &self.write_url
    }

    fn query(&self) -> Vec<(&str, &str)> {
        let mut query = vec![("db", self.database.as_str()), ("precision", "ms")];
        if let Some(username) = &self.username {
            query.push(("u", username));
        }
        if let Some(password) = &self.password {
            query.push(("p", password));
        }
        query
    }
}

impl TelemetrySink for InfluxSink {
    async fn write_batch(&mut self, points: &[TelemetryPoint]) -> Result<(), SinkError> {
        let body = points
            .iter()
            .map(line_protocol)
            .collect::<Vec<_>>()
            .join("\n");

        let response = self
            .client
            .post(&self.write_url)
            .query(&self.query())
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SinkError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        debug!(database = %self.database, points = points.len(), "Wrote batch to InfluxDB");
        Ok(())
    }

    fn name(&self) -> &str {
        "influxdb"
    }
}

/// Render one point as `measurement,tag=v,... value=<f64> <timestamp_ms>`.
///
/// Tags come out in key order.
pub fn line_protocol(point: &TelemetryPoint) -> String {
    let mut line = escape_measurement(point.measurement.as_str());

    for (key, value) in &point.tags {
        if value.is_empty() {
            continue;
        }
        let _ = write!(line, ",{}={}", escape_tag(key), escape_tag(value));
    }

    let _ = write!(line, " value={:?} {}", point.value, point.timestamp);
    line
}

fn escape_measurement(s: &str) -> String {
    s.replace(',', "\\,").replace(' ', "\\ ")
}

fn escape_tag(s: &str) -> String {
    s.replace(',', "\\,")
        .replace('=', "\\=")
        .replace(' ', "\\ ")
}
