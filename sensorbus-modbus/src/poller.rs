//! Single-device request/response exchange.

use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::config::{DeviceConfig, ModbusConfig, PollingConfig};
use crate::frame::{
    ChecksumStatus, CrcCheck, HexBytes, NoDataReason, RegisterBlock, RequestFrame, Response,
    decode_response_checked,
};
use crate::reading::Reading;
use crate::transport::{Transport, TransportError};

/// Settings shared by every exchange on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub function_code: u8,
    pub block: RegisterBlock,
    /// Settle time between writing the request and reading the reply.
    pub command_pause: Duration,
    pub crc_check: CrcCheck,
    /// Log request frames at info instead of debug.
    pub show_frames: bool,
}

impl PollSettings {
    pub fn from_config(modbus: &ModbusConfig, polling: &PollingConfig) -> Self {
        Self {
            function_code: modbus.function_code,
            block: modbus.block(),
            command_pause: polling.command_pause(),
            crc_check: modbus.crc_check,
            show_frames: polling.show_frames,
        }
    }
}

/// Result of polling one device.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    Reading(Reading),
    NoData(NoDataReason),
}

/// Owns the bus transport and performs one exchange at a time.
#[derive(Debug)]
pub struct DevicePoller<T> {
    transport: T,
    settings: PollSettings,
}

impl<T: Transport> DevicePoller<T> {
    pub fn new(transport: T, settings: PollSettings) -> Self {
        Self {
            transport,
            settings,
        }
    }

    pub fn settings(&self) -> &PollSettings {
        &self.settings
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Request the register block from `device` and decode the reply.
    ///
    /// Missing, short or (when enforced) corrupt replies are reported as
    /// [`PollOutcome::NoData`]. Only a failing transport is an error.
    pub async fn poll(&mut self, device: &DeviceConfig) -> Result<PollOutcome, TransportError> {
        let settings = self.settings;
        let request = RequestFrame::read(device.unit_id, settings.function_code, settings.block);

        if settings.show_frames {
            info!(unit_id = device.unit_id, "Request: {}", request);
        } else {
            debug!(unit_id = device.unit_id, "Request: {}", request);
        }

        self.transport.write(request.as_bytes()).await?;
        tokio::time::sleep(settings.command_pause).await;

        let expected = settings.block.response_len();
        let bytes = self.transport.read(expected).await?;
        debug!(unit_id = device.unit_id, "Response: {}", HexBytes(&bytes));

        let (values, checksum) =
            match decode_response_checked(&bytes, settings.block.count, settings.crc_check) {
                Response::Registers { values, checksum } => (values, checksum),
                Response::NoData(reason) => {
                    warn!(unit_id = device.unit_id, "Device {}: {}", device.unit_id, reason);
                    return Ok(PollOutcome::NoData(reason));
                }
            };

        if let ChecksumStatus::Mismatch { expected, received } = checksum {
            warn!(
                unit_id = device.unit_id,
                "Device {}: checksum mismatch (computed 0x{:04X}, received 0x{:04X})",
                device.unit_id,
                expected,
                received
            );
        }

        let [temperature_raw, humidity_raw, ..] = values[..] else {
            let reason = NoDataReason::Short {
                received: bytes.len(),
                expected,
            };
            warn!(unit_id = device.unit_id, "Device {}: {}", device.unit_id, reason);
            return Ok(PollOutcome::NoData(reason));
        };

        let reading = Reading::from_registers(
            device.device_id(),
            temperature_raw,
            humidity_raw,
            Utc::now(),
        )
        .with_tag("unit_id", device.unit_id.to_string());
        let reading = device
            .labels
            .iter()
            .fold(reading, |r, (k, v)| r.with_tag(k.clone(), v.clone()));

        info!(
            unit_id = device.unit_id,
            "Device {}: Temperature: {:.1}°C, Humidity: {:.2}%",
            device.unit_id,
            reading.temperature,
            reading.humidity
        );

        Ok(PollOutcome::Reading(reading))
    }
}
