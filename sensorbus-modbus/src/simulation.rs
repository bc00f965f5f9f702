//! Synthetic building of sensors, for running without a bus.
//!
//! Sensors are laid out floor by floor, wall by wall. Every cycle yields one
//! reading per sensor with uniformly random values.

use chrono::Utc;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use sensorbus_bridge_framework::Shutdown;
use tracing::debug;

use crate::config::SimulationConfig;
use crate::reading::{Cycle, Reading};
use crate::scheduler::{ReadingSource, Sweep};
use crate::transport::TransportError;

/// Position of one simulated sensor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulatedSensor {
    /// Running 1-based index across the building.
    pub id: u32,
    /// 1-based floor number.
    pub floor: u8,
    pub wall: String,
    /// 1-based position on the wall.
    pub position: u8,
}

impl SimulatedSensor {
    /// `sim_f{floor}_w{wall}_s{position}`
    pub fn source_id(&self) -> String {
        format!("sim_f{}_w{}_s{}", self.floor, self.wall, self.position)
    }

    /// Floor index, wall code and wall position, all zero-based, e.g. `011`.
    pub fn device_code(&self) -> String {
        format!(
            "{}{}{}",
            self.floor - 1,
            wall_code(&self.wall),
            self.position - 1
        )
    }
}

/// Numeric code of a wall name; unknown walls map to 9.
pub fn wall_code(wall: &str) -> u8 {
    match wall {
        "east" => 0,
        "west" => 1,
        "north" => 2,
        "south" => 3,
        _ => 9,
    }
}

/// [`ReadingSource`] generating readings for a fixed building layout.
#[derive(Debug)]
pub struct SimulatedBuilding {
    sensors: Vec<SimulatedSensor>,
    temperature: (f64, f64),
    humidity: (f64, f64),
    rng: SmallRng,
}

impl SimulatedBuilding {
    pub fn new(config: &SimulationConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_os_rng(),
        };

        let mut sensors = Vec::new();
        let mut id = 0;
        for floor in 1..=config.floors {
            for wall in &config.walls {
                for position in 1..=config.sensors_per_wall {
                    id += 1;
                    sensors.push(SimulatedSensor {
                        id,
                        floor,
                        wall: wall.clone(),
                        position,
                    });
                }
            }
        }

        let [t_low, t_high] = config.temperature_range;
        let [h_low, h_high] = config.humidity_range;

        Self {
            sensors,
            temperature: (t_low, t_high),
            humidity: (h_low, h_high),
            rng,
        }
    }

    pub fn sensors(&self) -> &[SimulatedSensor] {
        &self.sensors
    }

    /// Generate one reading per sensor.
    pub fn sample(&mut self) -> Cycle {
        let now = Utc::now();
        let (t_low, t_high) = self.temperature;
        let (h_low, h_high) = self.humidity;

        let cycle: Cycle = self
            .sensors
            .iter()
            .map(|sensor| {
                let temperature = self.rng.random_range(t_low..t_high);
                let humidity = self.rng.random_range(h_low..h_high);

                Reading::new(sensor.source_id(), temperature, humidity, now)
                    .with_tag("id", sensor.id.to_string())
                    .with_tag("floor", format!("floor{}", sensor.floor))
                    .with_tag("wall", sensor.wall.as_str())
                    .with_tag("device_code", sensor.device_code())
            })
            .collect();

        debug!(sensors = cycle.len(), "Simulated sensor readings");
        cycle
    }
}

impl ReadingSource for SimulatedBuilding {
    async fn collect(&mut self, _shutdown: &mut Shutdown) -> Result<Sweep, TransportError> {
        Ok(Sweep::Complete(self.sample()))
    }
}
