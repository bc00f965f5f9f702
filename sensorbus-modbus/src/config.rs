//! Configuration for the Modbus sensor bridge.

use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

use sensorbus_bridge_framework::{
    BridgeConfig, BridgeError, Format, LoggingConfig, Result, ZenohConfig,
};
use serde::{Deserialize, Serialize};

use crate::convert::registers;
use crate::frame::{CrcCheck, READ_INPUT_REGISTERS, RegisterBlock};

/// Largest register count a single read-input-registers request may ask for.
pub const MAX_REGISTER_COUNT: u16 = 125;

/// Complete bridge configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorBridgeConfig {
    /// Serial line settings (required for the Modbus source).
    #[serde(default)]
    pub serial: Option<SerialConfig>,

    /// Protocol and device settings
    #[serde(default)]
    pub modbus: ModbusConfig,

    /// Cadence of the polling loop
    #[serde(default)]
    pub polling: PollingConfig,

    /// Where readings come from
    #[serde(default)]
    pub source: SourceConfig,

    /// Where batches go
    #[serde(default)]
    pub sink: SinkConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Serial port settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerialConfig {
    /// Serial port path (e.g., "/dev/ttyUSB0" or "COM1")
    pub port: String,

    /// Baud rate (default: 38400)
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    /// Data bits (default: 8)
    #[serde(default = "default_data_bits")]
    pub data_bits: u8,

    /// Parity: "none", "even", or "odd" (default: "none")
    #[serde(default = "default_parity")]
    pub parity: String,

    /// Stop bits: 1 or 2 (default: 1)
    #[serde(default = "default_stop_bits")]
    pub stop_bits: u8,

    /// Read timeout in milliseconds (default: 1000)
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_baud_rate() -> u32 {
    38400
}

fn default_data_bits() -> u8 {
    8
}

fn default_parity() -> String {
    "none".to_string()
}

fn default_stop_bits() -> u8 {
    1
}

fn default_timeout_ms() -> u64 {
    1000
}

impl SerialConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Modbus request settings shared by every device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModbusConfig {
    /// Function code placed in every request (default: 0x04)
    #[serde(default = "default_function_code")]
    pub function_code: u8,

    /// First input register to read (default: 0x0190)
    #[serde(default = "default_start_address")]
    pub start_address: u16,

    /// Number of registers to read (default: 2, temperature then humidity)
    #[serde(default = "default_register_count")]
    pub register_count: u16,

    /// Response checksum policy (default: "skip")
    #[serde(default)]
    pub crc_check: CrcCheck,

    /// Devices to poll, in order
    #[serde(default)]
    pub devices: Vec<DeviceConfig>,
}

fn default_function_code() -> u8 {
    READ_INPUT_REGISTERS
}

fn default_start_address() -> u16 {
    registers::PROCESSED_BLOCK
}

fn default_register_count() -> u16 {
    2
}

impl Default for ModbusConfig {
    fn default() -> Self {
        Self {
            function_code: default_function_code(),
            start_address: default_start_address(),
            register_count: default_register_count(),
            crc_check: CrcCheck::default(),
            devices: Vec::new(),
        }
    }
}

impl ModbusConfig {
    pub fn block(&self) -> RegisterBlock {
        RegisterBlock::new(self.start_address, self.register_count)
    }
}

/// A device on the bus.
///
/// Accepts either a bare unit id (`106`) or a full object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "DeviceEntry")]
pub struct DeviceConfig {
    /// Modbus unit/slave address
    pub unit_id: u8,

    /// Device name used as the `device_id` tag (default: the unit id)
    pub name: Option<String>,

    /// Location metadata copied into every point's tags
    pub labels: BTreeMap<String, String>,
}

impl DeviceConfig {
    pub fn new(unit_id: u8) -> Self {
        Self {
            unit_id,
            name: None,
            labels: BTreeMap::new(),
        }
    }

    /// Identifier used for readings from this device.
    pub fn device_id(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| self.unit_id.to_string())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DeviceEntry {
    Id(u8),
    Full {
        unit_id: u8,
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        labels: BTreeMap<String, String>,
    },
}

impl From<DeviceEntry> for DeviceConfig {
    fn from(entry: DeviceEntry) -> Self {
        match entry {
            DeviceEntry::Id(unit_id) => DeviceConfig::new(unit_id),
            DeviceEntry::Full {
                unit_id,
                name,
                labels,
            } => DeviceConfig {
                unit_id,
                name,
                labels,
            },
        }
    }
}

/// Polling cadence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Pause between cycles in milliseconds (default: 5000)
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Pause after each device in milliseconds (default: 200)
    #[serde(default = "default_device_pause_ms")]
    pub device_pause_ms: u64,

    /// Settle time between request and read in milliseconds (default: 100)
    #[serde(default = "default_command_pause_ms")]
    pub command_pause_ms: u64,

    /// Log the hex dump of every request at info level (default: true)
    #[serde(default = "default_show_frames")]
    pub show_frames: bool,
}

fn default_interval_ms() -> u64 {
    5000
}

fn default_device_pause_ms() -> u64 {
    200
}

fn default_command_pause_ms() -> u64 {
    100
}

fn default_show_frames() -> bool {
    true
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            device_pause_ms: default_device_pause_ms(),
            command_pause_ms: default_command_pause_ms(),
            show_frames: default_show_frames(),
        }
    }
}

impl PollingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn device_pause(&self) -> Duration {
        Duration::from_millis(self.device_pause_ms)
    }

    pub fn command_pause(&self) -> Duration {
        Duration::from_millis(self.command_pause_ms)
    }
}

/// Reading producer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SourceConfig {
    /// Poll the configured devices over the serial bus
    #[default]
    Modbus,
    /// Generate synthetic readings for a building topology
    Simulation(SimulationConfig),
}

/// Synthetic building layout and value ranges.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Number of floors (default: 3)
    #[serde(default = "default_floors")]
    pub floors: u8,

    /// Wall names per floor (default: east, west, north, south)
    #[serde(default = "default_walls")]
    pub walls: Vec<String>,

    /// Sensors on each wall (default: 4)
    #[serde(default = "default_sensors_per_wall")]
    pub sensors_per_wall: u8,

    /// Temperature range in degrees Celsius (default: [20, 30])
    #[serde(default = "default_temperature_range")]
    pub temperature_range: [f64; 2],

    /// Humidity range in percent (default: [30, 70])
    #[serde(default = "default_humidity_range")]
    pub humidity_range: [f64; 2],

    /// Fixed RNG seed for reproducible runs
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_floors() -> u8 {
    3
}

fn default_walls() -> Vec<String> {
    ["east", "west", "north", "south"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_sensors_per_wall() -> u8 {
    4
}

fn default_temperature_range() -> [f64; 2] {
    [20.0, 30.0]
}

fn default_humidity_range() -> [f64; 2] {
    [30.0, 70.0]
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            floors: default_floors(),
            walls: default_walls(),
            sensors_per_wall: default_sensors_per_wall(),
            temperature_range: default_temperature_range(),
            humidity_range: default_humidity_range(),
            seed: None,
        }
    }
}

/// Telemetry sink.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SinkConfig {
    /// Log every point
    #[default]
    Log,
    /// InfluxDB 1.x HTTP write endpoint
    Influxdb(InfluxConfig),
    /// Zenoh publication of whole batches
    Zenoh(ZenohSinkConfig),
}

/// InfluxDB 1.x connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfluxConfig {
    /// Base URL, e.g. "http://localhost:8086"
    pub url: String,

    /// Target database
    pub database: String,

    /// Optional username
    #[serde(default)]
    pub username: Option<String>,

    /// Optional password
    #[serde(default)]
    pub password: Option<String>,

    /// Request timeout in milliseconds (default: 5000)
    #[serde(default = "default_sink_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_sink_timeout_ms() -> u64 {
    5000
}

/// Zenoh sink settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZenohSinkConfig {
    /// Zenoh connection settings
    #[serde(default)]
    pub zenoh: ZenohConfig,

    /// Key expression prefix (default: "sensorbus/modbus")
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    /// Batch payload encoding (default: "json")
    #[serde(default)]
    pub format: Format,
}

fn default_key_prefix() -> String {
    "sensorbus/modbus".to_string()
}

impl BridgeConfig for SensorBridgeConfig {
    fn logging(&self) -> &LoggingConfig {
        &self.logging
    }

    fn validate(&self) -> Result<()> {
        if self.polling.interval_ms == 0 {
            return Err(BridgeError::validation(
                "polling.interval_ms must be greater than zero",
            ));
        }

        match &self.source {
            SourceConfig::Modbus => self.validate_modbus()?,
            SourceConfig::Simulation(sim) => sim.validate()?,
        }

        match &self.sink {
            SinkConfig::Log => {}
            SinkConfig::Influxdb(influx) => {
                if influx.url.trim().is_empty() {
                    return Err(BridgeError::validation("sink.url cannot be empty"));
                }
                if influx.database.trim().is_empty() {
                    return Err(BridgeError::validation("sink.database cannot be empty"));
                }
            }
            SinkConfig::Zenoh(zenoh) => {
                if zenoh.key_prefix.trim().is_empty() {
                    return Err(BridgeError::validation("sink.key_prefix cannot be empty"));
                }
            }
        }

        Ok(())
    }
}

impl SensorBridgeConfig {
    fn validate_modbus(&self) -> Result<()> {
        let serial = self.serial.as_ref().ok_or_else(|| {
            BridgeError::validation("serial section is required for the modbus source")
        })?;

        if serial.port.trim().is_empty() {
            return Err(BridgeError::validation("serial.port cannot be empty"));
        }

        if serial.baud_rate == 0 {
            return Err(BridgeError::validation(
                "serial.baud_rate must be greater than zero",
            ));
        }

        if !(5..=8).contains(&serial.data_bits) {
            return Err(BridgeError::validation(format!(
                "serial.data_bits must be 5-8, got {}",
                serial.data_bits
            )));
        }

        if !(1..=2).contains(&serial.stop_bits) {
            return Err(BridgeError::validation(format!(
                "serial.stop_bits must be 1 or 2, got {}",
                serial.stop_bits
            )));
        }

        match serial.parity.to_lowercase().as_str() {
            "none" | "even" | "odd" => {}
            other => {
                return Err(BridgeError::validation(format!(
                    "invalid parity '{}' (use none, even, or odd)",
                    other
                )));
            }
        }

        let count = self.modbus.register_count;
        if !(2..=MAX_REGISTER_COUNT).contains(&count) {
            return Err(BridgeError::validation(format!(
                "modbus.register_count must be 2-{} (temperature and humidity), got {}",
                MAX_REGISTER_COUNT, count
            )));
        }

        if self.modbus.devices.is_empty() {
            return Err(BridgeError::validation(
                "At least one device must be configured",
            ));
        }

        let mut seen = HashSet::new();
        for device in &self.modbus.devices {
            if !seen.insert(device.unit_id) {
                return Err(BridgeError::validation(format!(
                    "duplicate device unit_id {}",
                    device.unit_id
                )));
            }
            if device.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
                return Err(BridgeError::validation(format!(
                    "device {}: name cannot be empty",
                    device.unit_id
                )));
            }
        }

        Ok(())
    }
}

impl SimulationConfig {
    fn validate(&self) -> Result<()> {
        if self.floors == 0 || self.walls.is_empty() || self.sensors_per_wall == 0 {
            return Err(BridgeError::validation(
                "simulation needs at least one floor, wall and sensor",
            ));
        }

        for (name, [low, high]) in [
            ("temperature_range", self.temperature_range),
            ("humidity_range", self.humidity_range),
        ] {
            if !(low < high) {
                return Err(BridgeError::validation(format!(
                    "simulation.{} must be [low, high] with low < high",
                    name
                )));
            }
            if !(low.is_finite() && high.is_finite() && (high - low).is_finite()) {
                return Err(BridgeError::validation(format!(
                    "simulation.{} must be finite, got [{}, {}]",
                    name, low, high
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> SensorBridgeConfig {
        json5::from_str(json).unwrap()
    }

    #[test]
    fn test_minimal_config_defaults() {
        let config = SensorBridgeConfig::from_json5(
            r#"{
                serial: { port: "/dev/ttyUSB0" },
                modbus: { devices: [106, 124, 125, 129] }
            }"#,
        )
        .unwrap();

        let serial = config.serial.as_ref().unwrap();
        assert_eq!(serial.baud_rate, 38400);
        assert_eq!(serial.read_timeout(), Duration::from_secs(1));
        assert_eq!(config.modbus.function_code, 0x04);
        assert_eq!(config.modbus.block(), RegisterBlock::new(0x0190, 2));
        assert_eq!(config.modbus.crc_check, CrcCheck::Skip);
        assert_eq!(config.polling.interval(), Duration::from_secs(5));
        assert_eq!(config.polling.device_pause(), Duration::from_millis(200));
        assert_eq!(config.polling.command_pause(), Duration::from_millis(100));
        assert!(config.polling.show_frames);
        assert!(matches!(config.source, SourceConfig::Modbus));
        assert!(matches!(config.sink, SinkConfig::Log));

        let ids: Vec<u8> = config.modbus.devices.iter().map(|d| d.unit_id).collect();
        assert_eq!(ids, vec![106, 124, 125, 129]);
        assert_eq!(config.modbus.devices[0].device_id(), "106");
    }

    #[test]
    fn test_device_objects_with_labels() {
        let config = parse(
            r#"{
                serial: { port: "/dev/ttyUSB0", parity: "even" },
                modbus: {
                    crc_check: "warn",
                    devices: [
                        106,
                        { unit_id: 124, name: "lab-east", labels: { floor: "floor1", wall: "east" } }
                    ]
                }
            }"#,
        );
        config.validate().unwrap();

        let device = &config.modbus.devices[1];
        assert_eq!(device.device_id(), "lab-east");
        assert_eq!(device.labels.get("wall").map(String::as_str), Some("east"));
        assert_eq!(config.modbus.crc_check, CrcCheck::Warn);
    }

    #[test]
    fn test_influx_sink() {
        let config = parse(
            r#"{
                serial: { port: "/dev/ttyUSB0" },
                modbus: { devices: [1] },
                sink: {
                    type: "influxdb",
                    url: "http://172.18.4.104:8086",
                    database: "temperatura_humidity_test"
                }
            }"#,
        );
        config.validate().unwrap();

        match &config.sink {
            SinkConfig::Influxdb(influx) => {
                assert_eq!(influx.database, "temperatura_humidity_test");
                assert_eq!(influx.timeout_ms, 5000);
                assert!(influx.username.is_none());
            }
            other => panic!("Expected InfluxDB sink, got {:?}", other),
        }
    }

    #[test]
    fn test_zenoh_sink_defaults() {
        let config = parse(
            r#"{
                serial: { port: "/dev/ttyUSB0" },
                modbus: { devices: [1] },
                sink: { type: "zenoh" }
            }"#,
        );

        match &config.sink {
            SinkConfig::Zenoh(zenoh) => {
                assert_eq!(zenoh.key_prefix, "sensorbus/modbus");
                assert_eq!(zenoh.zenoh.mode, "peer");
                assert_eq!(zenoh.format, Format::Json);
            }
            other => panic!("Expected Zenoh sink, got {:?}", other),
        }
    }

    #[test]
    fn test_zenoh_sink_cbor_client() {
        let config = parse(
            r#"{
                serial: { port: "/dev/ttyUSB0" },
                modbus: { devices: [1] },
                sink: {
                    type: "zenoh",
                    zenoh: { mode: "client", connect: ["tcp/10.0.0.5:7447"] },
                    format: "cbor",
                }
            }"#,
        );
        config.validate().unwrap();

        match &config.sink {
            SinkConfig::Zenoh(zenoh) => {
                assert_eq!(zenoh.format, Format::Cbor);
                assert_eq!(zenoh.zenoh.connect, vec!["tcp/10.0.0.5:7447"]);
            }
            other => panic!("Expected Zenoh sink, got {:?}", other),
        }
    }

    #[test]
    fn test_simulation_needs_no_serial() {
        let config = parse(r#"{ source: { type: "simulation", seed: 7 } }"#);
        config.validate().unwrap();

        match &config.source {
            SourceConfig::Simulation(sim) => {
                assert_eq!(sim.floors, 3);
                assert_eq!(sim.walls.len(), 4);
                assert_eq!(sim.sensors_per_wall, 4);
                assert_eq!(sim.seed, Some(7));
            }
            other => panic!("Expected simulation source, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_empty_devices() {
        let config = parse(r#"{ serial: { port: "/dev/ttyUSB0" }, modbus: { devices: [] } }"#);
        assert!(matches!(
            config.validate(),
            Err(BridgeError::ConfigValidation(_))
        ));
    }

    #[test]
    fn test_validate_missing_serial() {
        let config = parse(r#"{ modbus: { devices: [106] } }"#);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_duplicate_devices() {
        let config = parse(
            r#"{ serial: { port: "/dev/ttyUSB0" }, modbus: { devices: [106, { unit_id: 106 }] } }"#,
        );
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_validate_register_count() {
        for count in [0, 1, 126] {
            let config = parse(&format!(
                r#"{{ serial: {{ port: "/dev/ttyUSB0" }}, modbus: {{ register_count: {}, devices: [1] }} }}"#,
                count
            ));
            assert!(config.validate().is_err(), "count {}", count);
        }
    }

    #[test]
    fn test_validate_parity() {
        let config = parse(
            r#"{ serial: { port: "/dev/ttyUSB0", parity: "mark" }, modbus: { devices: [1] } }"#,
        );
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_zero_interval() {
        let config = parse(
            r#"{ serial: { port: "/dev/ttyUSB0" }, modbus: { devices: [1] }, polling: { interval_ms: 0 } }"#,
        );
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_inverted_simulation_range() {
        let config = parse(
            r#"{ source: { type: "simulation", temperature_range: [30, 20] } }"#,
        );
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_non_finite_simulation_range() {
        let ranges = [
            [0.0, f64::INFINITY],
            [f64::NEG_INFINITY, 30.0],
            [-1e308, 1e308],
        ];

        for range in ranges {
            let config = SensorBridgeConfig {
                source: SourceConfig::Simulation(SimulationConfig {
                    temperature_range: range,
                    ..Default::default()
                }),
                ..parse("{}")
            };
            let err = config.validate().unwrap_err();
            assert!(err.to_string().contains("finite"), "range {:?}", range);

            let config = SensorBridgeConfig {
                source: SourceConfig::Simulation(SimulationConfig {
                    humidity_range: range,
                    ..Default::default()
                }),
                ..parse("{}")
            };
            assert!(config.validate().is_err(), "range {:?}", range);
        }
    }

    #[test]
    fn test_validate_empty_influx_database() {
        let config = parse(
            r#"{
                source: { type: "simulation" },
                sink: { type: "influxdb", url: "http://localhost:8086", database: "" }
            }"#,
        );
        assert!(config.validate().is_err());
    }
}
