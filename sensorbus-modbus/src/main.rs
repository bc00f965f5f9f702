//! Modbus RTU temperature/humidity bridge.
//!
//! Polls the configured sensors and forwards every cycle to the configured
//! telemetry sink until interrupted.

use std::time::Duration;

use anyhow::{Context, Result};
use sensorbus_bridge_framework::{BridgeArgs, BridgeConfig, BridgeRunner};
use sensorbus_modbus::config::{SensorBridgeConfig, SourceConfig};
use sensorbus_modbus::forwarder::Forwarder;
use sensorbus_modbus::poller::{DevicePoller, PollSettings};
use sensorbus_modbus::scheduler::{BusSweep, ReadingSource, Scheduler};
use sensorbus_modbus::simulation::SimulatedBuilding;
use sensorbus_modbus::sink::Sink;
use sensorbus_modbus::transport::open_serial;
use tracing::{error, info, warn};

const BRIDGE_NAME: &str = "sensorbus-modbus";
const DEFAULT_CONFIG: &str = "sensorbus.json5";

#[tokio::main]
async fn main() -> Result<()> {
    let args = BridgeArgs::parse_with_default(DEFAULT_CONFIG);

    let config = SensorBridgeConfig::load(&args.config)
        .with_context(|| format!("Failed to load config from {:?}", args.config))?;

    let runner = BridgeRunner::new_with_args(BRIDGE_NAME, config, Some(&args))?;
    info!("Loaded configuration from {:?}", args.config);

    let config = runner.config().clone();
    let interval = config.polling.interval();
    let sink = Sink::from_config(&config.sink)
        .await
        .context("Failed to set up telemetry sink")?;

    match &config.source {
        SourceConfig::Modbus => {
            let serial = config
                .serial
                .as_ref()
                .context("serial section is required for the modbus source")?;

            let transport = open_serial(serial).inspect_err(|e| {
                error!(
                    port = %serial.port,
                    error = %e,
                    "Serial port error. Check that the port exists and is available"
                );
            })?;

            info!(
                devices = config.modbus.devices.len(),
                port = %serial.port,
                "Polling Modbus devices"
            );

            let poller = DevicePoller::new(
                transport,
                PollSettings::from_config(&config.modbus, &config.polling),
            );
            let sweep = BusSweep::new(
                poller,
                config.modbus.devices.clone(),
                config.polling.device_pause(),
            );
            run(runner, sweep, sink, interval).await
        }
        SourceConfig::Simulation(simulation) => {
            let building = SimulatedBuilding::new(simulation);
            info!(sensors = building.sensors().len(), "Simulating sensor readings");
            run(runner, building, sink, interval).await
        }
    }
}

async fn run<S: ReadingSource>(
    runner: BridgeRunner<SensorBridgeConfig>,
    source: S,
    sink: Sink,
    interval: Duration,
) -> Result<()> {
    let shutdown = runner.shutdown();
    let mut scheduler = Scheduler::new(source, Forwarder::new(sink), interval);

    let result = runner
        .run(async { scheduler.run(shutdown).await.map(|_| ()) })
        .await;

    if let Err(e) = scheduler.forwarder().sink().close().await {
        warn!(error = %e, "Failed to close telemetry sink");
    }

    result?;
    Ok(())
}
