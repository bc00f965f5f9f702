//! Periodic polling loop.
//!
//! One cycle sweeps the source, forwards the readings as one batch, then
//! waits for the configured interval. Sweeps run strictly one after another
//! and the pauses between devices and between cycles are the only places
//! where shutdown is observed.

use std::future::Future;
use std::time::Duration;

use sensorbus_bridge_framework::{Shutdown, Wait};
use tracing::{debug, error, info};

use crate::config::DeviceConfig;
use crate::forwarder::Forwarder;
use crate::poller::{DevicePoller, PollOutcome};
use crate::reading::Cycle;
use crate::sink::TelemetrySink;
use crate::transport::{Transport, TransportError};

/// Result of a single sweep.
#[derive(Debug, Clone, PartialEq)]
pub enum Sweep {
    /// Every device was visited.
    Complete(Cycle),
    /// Shutdown was requested part way through; the readings are dropped.
    Interrupted,
}

/// Producer of one [`Cycle`] per call.
pub trait ReadingSource: Send {
    fn collect(
        &mut self,
        shutdown: &mut Shutdown,
    ) -> impl Future<Output = Result<Sweep, TransportError>> + Send;
}

/// Polls every configured device in order over one shared bus.
#[derive(Debug)]
pub struct BusSweep<T> {
    poller: DevicePoller<T>,
    devices: Vec<DeviceConfig>,
    device_pause: Duration,
}

impl<T: Transport> BusSweep<T> {
    pub fn new(poller: DevicePoller<T>, devices: Vec<DeviceConfig>, device_pause: Duration) -> Self {
        Self {
            poller,
            devices,
            device_pause,
        }
    }

    pub fn devices(&self) -> &[DeviceConfig] {
        &self.devices
    }
}

impl<T: Transport> ReadingSource for BusSweep<T> {
    async fn collect(&mut self, shutdown: &mut Shutdown) -> Result<Sweep, TransportError> {
        let mut cycle = Cycle::new();

        for device in &self.devices {
            match self.poller.poll(device).await? {
                PollOutcome::Reading(reading) => cycle.push(reading),
                PollOutcome::NoData(_) => {}
            }

            if shutdown.wait(self.device_pause).await == Wait::Shutdown {
                return Ok(Sweep::Interrupted);
            }
        }

        Ok(Sweep::Complete(cycle))
    }
}

/// Lifecycle of a [`Scheduler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
    Stopped,
}

/// Totals reported when the loop ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Sweeps that ran to completion.
    pub cycles: u64,
    /// Readings handed to the sink.
    pub readings: u64,
    /// Batches the sink refused.
    pub failed_batches: u64,
}

/// Drives a [`ReadingSource`] into a [`Forwarder`] at a fixed cadence.
#[derive(Debug)]
pub struct Scheduler<S, K> {
    source: S,
    forwarder: Forwarder<K>,
    interval: Duration,
    state: SchedulerState,
}

impl<S, K> Scheduler<S, K>
where
    S: ReadingSource,
    K: TelemetrySink,
{
    pub fn new(source: S, forwarder: Forwarder<K>, interval: Duration) -> Self {
        Self {
            source,
            forwarder,
            interval,
            state: SchedulerState::Idle,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn forwarder(&self) -> &Forwarder<K> {
        &self.forwarder
    }

    /// Run cycles until shutdown is requested.
    ///
    /// Sink failures are logged and counted; the next cycle runs on
    /// schedule. A transport failure ends the loop with an error.
    pub async fn run(&mut self, mut shutdown: Shutdown) -> Result<RunSummary, TransportError> {
        self.state = SchedulerState::Running;
        let mut summary = RunSummary::default();

        info!(interval_ms = self.interval.as_millis() as u64, "Monitoring started");

        let result = loop {
            if shutdown.is_triggered() {
                break Ok(());
            }

            let cycle_no = summary.cycles + 1;
            info!(cycle = cycle_no, "Polling devices");

            let cycle = match self.source.collect(&mut shutdown).await {
                Ok(Sweep::Complete(cycle)) => cycle,
                Ok(Sweep::Interrupted) => {
                    debug!(cycle = cycle_no, "Sweep interrupted, discarding partial cycle");
                    break Ok(());
                }
                Err(e) => break Err(e),
            };
            summary.cycles += 1;

            if cycle.is_empty() {
                info!(cycle = cycle_no, "No readings this cycle");
            } else {
                match self.forwarder.forward(&cycle).await {
                    Ok(_) => summary.readings += cycle.len() as u64,
                    Err(e) => {
                        summary.failed_batches += 1;
                        error!(cycle = cycle_no, error = %e, "Failed to write batch");
                    }
                }
            }

            info!(
                "Waiting {} ms until next polling cycle",
                self.interval.as_millis()
            );
            if shutdown.wait(self.interval).await == Wait::Shutdown {
                break Ok(());
            }
        };

        self.state = SchedulerState::Stopped;
        match &result {
            Ok(()) => info!(
                cycles = summary.cycles,
                readings = summary.readings,
                failed_batches = summary.failed_batches,
                "Monitoring stopped"
            ),
            Err(e) => error!(error = %e, "Monitoring aborted"),
        }

        result.map(|()| summary)
    }
}
