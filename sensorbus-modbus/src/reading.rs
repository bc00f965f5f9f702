//! Readings and cycles.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::convert::{to_humidity, to_temperature};

/// One successful sample from one device.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    /// Identifier of the originating device (name, unit id or simulated id).
    pub device_id: String,
    /// Degrees Celsius.
    pub temperature: f64,
    /// Percent relative humidity.
    pub humidity: f64,
    /// When the response was decoded.
    pub captured_at: DateTime<Utc>,
    /// Extra tags forwarded with every point (unit id, location metadata).
    pub tags: BTreeMap<String, String>,
}

impl Reading {
    pub fn new(
        device_id: impl Into<String>,
        temperature: f64,
        humidity: f64,
        captured_at: DateTime<Utc>,
    ) -> Self {
        Self {
            device_id: device_id.into(),
            temperature,
            humidity,
            captured_at,
            tags: BTreeMap::new(),
        }
    }

    /// Build a reading from the temperature and humidity registers.
    pub fn from_registers(
        device_id: impl Into<String>,
        temperature_raw: u16,
        humidity_raw: u16,
        captured_at: DateTime<Utc>,
    ) -> Self {
        Self::new(
            device_id,
            to_temperature(temperature_raw),
            to_humidity(humidity_raw),
            captured_at,
        )
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }
}

/// Readings gathered in one pass over the device set, in poll order.
///
/// May hold fewer readings than there are devices.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cycle {
    readings: Vec<Reading>,
}

impl Cycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, reading: Reading) {
        self.readings.push(reading);
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    pub fn readings(&self) -> &[Reading] {
        &self.readings
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Reading> {
        self.readings.iter()
    }
}

impl FromIterator<Reading> for Cycle {
    fn from_iter<I: IntoIterator<Item = Reading>>(iter: I) -> Self {
        Self {
            readings: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Cycle {
    type Item = &'a Reading;
    type IntoIter = std::slice::Iter<'a, Reading>;

    fn into_iter(self) -> Self::IntoIter {
        self.readings.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_registers_scales() {
        let reading = Reading::from_registers("106", 250, 4550, Utc::now());
        assert_eq!(reading.temperature, 25.0);
        assert_eq!(reading.humidity, 45.5);
        assert!(reading.tags.is_empty());
    }

    #[test]
    fn test_cycle_preserves_insertion_order() {
        let now = Utc::now();
        let mut cycle = Cycle::new();
        assert!(cycle.is_empty());

        for id in ["129", "106", "125"] {
            cycle.push(Reading::new(id, 20.0, 40.0, now));
        }

        let ids: Vec<_> = cycle.iter().map(|r| r.device_id.as_str()).collect();
        assert_eq!(ids, vec!["129", "106", "125"]);
        assert_eq!(cycle.len(), 3);
    }
}
