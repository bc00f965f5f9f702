use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

/// A single sink-ready telemetry point.
///
/// One point carries exactly one numeric field (`value`). Tags are kept in a
/// sorted map so every sink renders them in a stable order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryPoint {
    /// Unix epoch milliseconds shared by every point of a batch.
    pub timestamp: i64,

    /// Measurement name.
    pub measurement: Measurement,

    /// Numeric field value in physical units.
    pub value: f64,

    /// Tag set (device identifier, location metadata).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
}

impl TelemetryPoint {
    /// Create a new telemetry point with an explicit timestamp.
    pub fn new(measurement: Measurement, value: f64, timestamp: i64) -> Self {
        Self {
            timestamp,
            measurement,
            value,
            tags: BTreeMap::new(),
        }
    }

    /// Add a tag to this telemetry point.
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Add multiple tags to this telemetry point.
    pub fn with_tags<I, K, V>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.tags
            .extend(tags.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }
}

/// Measurements produced by the temperature/humidity sensors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Measurement {
    Temperature,
    Humidity,
}

impl Measurement {
    /// Get the string representation used as the sink measurement name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Measurement::Temperature => "temperature",
            Measurement::Humidity => "humidity",
        }
    }
}

impl std::fmt::Display for Measurement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Get the current timestamp in milliseconds since Unix epoch.
///
/// Returns 0 if system time is before Unix epoch (should never happen in practice).
pub fn current_timestamp_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_telemetry_point_creation() {
        let point = TelemetryPoint::new(Measurement::Temperature, 25.0, 1_700_000_000_000)
            .with_tag("device_id", "106")
            .with_tag("floor", "floor1");

        assert_eq!(point.measurement, Measurement::Temperature);
        assert_eq!(point.value, 25.0);
        assert_eq!(point.timestamp, 1_700_000_000_000);
        assert_eq!(point.tags.get("device_id"), Some(&"106".to_string()));
        assert_eq!(point.tags.len(), 2);
    }

    #[test]
    fn test_with_tags_extends() {
        let point = TelemetryPoint::new(Measurement::Humidity, 45.5, 0)
            .with_tag("device_id", "124")
            .with_tags([("wall", "east"), ("floor", "floor2")]);

        let keys: Vec<_> = point.tags.keys().cloned().collect();
        assert_eq!(keys, vec!["device_id", "floor", "wall"]);
    }

    #[test]
    fn test_measurement_display() {
        assert_eq!(Measurement::Temperature.as_str(), "temperature");
        assert_eq!(Measurement::Humidity.to_string(), "humidity");
    }

    #[test]
    fn test_measurement_serializes_lowercase() {
        let json = serde_json::to_string(&Measurement::Humidity).unwrap();
        assert_eq!(json, "\"humidity\"");
    }
}
