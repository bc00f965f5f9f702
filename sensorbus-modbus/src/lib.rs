//! Modbus RTU temperature/humidity bridge.
//!
//! Polls a fixed set of sensors over one RS-485 serial bus, converts the
//! input registers to physical units and forwards each polling cycle to a
//! telemetry sink as a single batch.
//!
//! # Wire format
//!
//! ```text
//! request:  6A 04 01 90 00 02 78 C1        unit 106, read 2 input registers at 0x0190
//! response: 6A 04 04 00 FA 11 C6 8D 71     250 -> 25.0 °C, 4550 -> 45.50 %RH
//! ```
//!
//! # Data flow
//!
//! [`scheduler::Scheduler`] drives a [`scheduler::ReadingSource`] (the bus
//! sweep or the simulated building) and hands every non-empty
//! [`reading::Cycle`] to a [`forwarder::Forwarder`], which writes it to a
//! [`sink::TelemetrySink`].

pub mod config;
pub mod convert;
pub mod crc;
pub mod forwarder;
pub mod frame;
pub mod poller;
pub mod reading;
pub mod scheduler;
pub mod simulation;
pub mod sink;
pub mod transport;
