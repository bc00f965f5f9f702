//! Telemetry publisher for Zenoh.

use std::sync::Arc;

use sensorbus_common::{Format, TelemetryPoint, encode};

use crate::error::{BridgeError, Result};

/// Key suffix under which whole batches are published.
pub const BATCH_KEY_SUFFIX: &str = "batch";

/// Publisher for sending telemetry batches to Zenoh.
///
/// A batch is serialized as a single array payload and put once, so
/// subscribers observe every point of a cycle together or not at all.
#[derive(Clone, Debug)]
pub struct Publisher {
    session: Arc<zenoh::Session>,
    key_prefix: String,
    format: Format,
}

impl Publisher {
    /// Create a new publisher.
    pub fn new(
        session: Arc<zenoh::Session>,
        key_prefix: impl Into<String>,
        format: Format,
    ) -> Self {
        Self {
            session,
            key_prefix: key_prefix.into(),
            format,
        }
    }

    /// Get the key prefix.
    pub fn key_prefix(&self) -> &str {
        &self.key_prefix
    }

    /// Get the serialization format.
    pub fn format(&self) -> Format {
        self.format
    }

    /// Build a full key expression from a suffix.
    pub fn build_key(&self, suffix: &str) -> String {
        build_key(&self.key_prefix, suffix)
    }

    /// Publish a batch of telemetry points as one payload.
    pub async fn publish_batch(&self, points: &[TelemetryPoint]) -> Result<()> {
        let key = self.build_key(BATCH_KEY_SUFFIX);
        let payload =
            encode(&points, self.format).map_err(|e| BridgeError::Serialization(e.to_string()))?;

        self.session
            .put(&key, payload)
            .await
            .map_err(|e| BridgeError::Publish {
                key: key.clone(),
                message: e.to_string(),
            })?;

        tracing::debug!(key = %key, points = points.len(), "Published batch");

        Ok(())
    }

    /// Close the underlying session.
    pub async fn close(&self) -> Result<()> {
        self.session
            .close()
            .await
            .map_err(|e| BridgeError::ZenohConnection(e.to_string()))
    }
}

fn build_key(prefix: &str, suffix: &str) -> String {
    if suffix.is_empty() {
        prefix.to_string()
    } else {
        format!("{}/{}", prefix.trim_end_matches('/'), suffix)
    }
}
