//! Raw register to physical unit conversion.

/// Raw temperature counts per degree Celsius.
pub const TEMPERATURE_SCALE: f64 = 10.0;

/// Raw humidity counts per percent relative humidity.
pub const HUMIDITY_SCALE: f64 = 100.0;

/// Input register addresses exposed by the sensor.
pub mod registers {
    /// Processed temperature followed by processed humidity (default block).
    pub const PROCESSED_BLOCK: u16 = 0x0190;
    /// Raw temperature, unsigned.
    pub const TEMPERATURE_RAW: u16 = 0x0191;
    /// Processed humidity, unsigned.
    pub const HUMIDITY_PROCESSED: u16 = 0x0194;
    /// Raw humidity, unsigned.
    pub const HUMIDITY_RAW: u16 = 0x0195;
}

/// Degrees Celsius from a temperature register (0.1 °C resolution).
///
/// The register is unsigned, so sub-zero readings are not representable.
pub fn to_temperature(raw: u16) -> f64 {
    f64::from(raw) / TEMPERATURE_SCALE
}

/// Percent relative humidity from a humidity register (0.01 % resolution).
pub fn to_humidity(raw: u16) -> f64 {
    f64::from(raw) / HUMIDITY_SCALE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_values() {
        assert_eq!(to_temperature(250), 25.0);
        assert_eq!(to_humidity(4550), 45.50);
        assert_eq!(to_temperature(0), 0.0);
        assert_eq!(to_humidity(u16::MAX), 655.35);
        assert_eq!(to_temperature(u16::MAX), 6553.5);
    }

    #[test]
    fn test_monotonic() {
        let mut last_t = f64::MIN;
        let mut last_h = f64::MIN;
        for raw in (0..=u16::MAX).step_by(97) {
            let t = to_temperature(raw);
            let h = to_humidity(raw);
            assert!(t > last_t);
            assert!(h > last_h);
            last_t = t;
            last_h = h;
        }
    }
}
