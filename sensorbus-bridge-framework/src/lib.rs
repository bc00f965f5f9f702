//! Sensorbus Bridge Framework
//!
//! Common abstractions for building bridges that poll field devices and
//! forward telemetry to a sink.
//!
//! # Overview
//!
//! This framework provides:
//! - [`BridgeConfig`] trait for configuration loading and validation
//! - [`BridgeRunner`] for managing bridge lifecycle (logging, signal handling)
//! - [`Shutdown`] for cooperative, cancellable waits inside workers
//! - [`Publisher`] for publishing telemetry batches to Zenoh
//! - [`BridgeArgs`] for common CLI argument parsing

mod args;
mod config;
mod error;
mod publisher;
mod runner;
pub mod shutdown;

pub use args::BridgeArgs;
pub use config::BridgeConfig;
pub use error::{BridgeError, Result};
pub use publisher::{BATCH_KEY_SUFFIX, Publisher};
pub use runner::BridgeRunner;
pub use shutdown::{Shutdown, ShutdownTrigger, Wait};

// Re-export commonly used types from sensorbus-common
pub use sensorbus_common::{Format, LoggingConfig, Measurement, TelemetryPoint, ZenohConfig};
