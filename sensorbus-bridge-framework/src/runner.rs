//! Bridge runner for lifecycle management.

use std::fmt::Display;
use std::future::Future;

use sensorbus_common::{LoggingConfig, init_tracing};

use crate::BridgeArgs;
use crate::config::BridgeConfig;
use crate::error::{BridgeError, Result};
use crate::shutdown::{self, Shutdown, ShutdownTrigger};

/// Bridge runner that manages the lifecycle of a protocol bridge.
///
/// Handles:
/// - Logging initialization (with optional CLI override)
/// - Ctrl+C / SIGTERM handling, turned into a cooperative [`Shutdown`]
/// - Running the bridge worker to completion and reporting its outcome
///
/// # Example
///
/// ```ignore
/// use sensorbus_bridge_framework::{BridgeArgs, BridgeConfig, BridgeRunner};
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let args = BridgeArgs::parse_with_default("mybridge.json5");
///     let config = MyBridgeConfig::load(&args.config)?;
///
///     let runner = BridgeRunner::new_with_args("mybridge", config, Some(&args))?;
///     let shutdown = runner.shutdown();
///
///     runner.run(async move { my_worker(shutdown).await }).await?;
///     Ok(())
/// }
/// ```
pub struct BridgeRunner<C: BridgeConfig> {
    /// Bridge name for logging.
    name: String,
    /// Bridge version.
    version: String,
    /// The loaded configuration.
    config: C,
    trigger: ShutdownTrigger,
    shutdown: Shutdown,
}

impl<C: BridgeConfig> BridgeRunner<C> {
    /// Create a new bridge runner and initialize logging from the config.
    pub fn new(name: impl Into<String>, config: C) -> Result<Self> {
        Self::new_with_args(name, config, None)
    }

    /// Create a new bridge runner with CLI args for log level override.
    pub fn new_with_args(
        name: impl Into<String>,
        config: C,
        args: Option<&BridgeArgs>,
    ) -> Result<Self> {
        let log_config = match args.and_then(|a| a.log_level.as_ref()) {
            Some(level) => LoggingConfig {
                level: level.clone(),
                ..config.logging().clone()
            },
            None => config.logging().clone(),
        };

        init_tracing(&log_config).map_err(|e| BridgeError::config(e.to_string()))?;

        Ok(Self::without_tracing(name, config))
    }

    /// Create a runner without touching the global tracing subscriber.
    pub fn without_tracing(name: impl Into<String>, config: C) -> Self {
        let (trigger, shutdown) = shutdown::channel();
        let name = name.into();
        let version = env!("CARGO_PKG_VERSION").to_string();

        tracing::info!(bridge = %name, version = %version, "Starting bridge");

        Self {
            name,
            version,
            config,
            trigger,
            shutdown,
        }
    }

    /// Get the bridge name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the bridge version.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Get a reference to the configuration.
    pub fn config(&self) -> &C {
        &self.config
    }

    /// Get a shutdown handle for the worker.
    pub fn shutdown(&self) -> Shutdown {
        self.shutdown.clone()
    }

    /// Run the worker until it returns.
    ///
    /// A signal listener flips the shutdown flag on Ctrl+C or SIGTERM; the
    /// worker is expected to observe it and return. Worker errors are logged
    /// and surfaced as [`BridgeError::Worker`].
    pub async fn run<F, E>(self, worker: F) -> Result<()>
    where
        F: Future<Output = std::result::Result<(), E>>,
        E: Display,
    {
        let trigger = self.trigger;
        let bridge = self.name.clone();
        let listener = tokio::spawn(async move {
            wait_for_signal().await;
            tracing::info!(bridge = %bridge, "Received shutdown signal");
            trigger.trigger();
        });

        tracing::info!(bridge = %self.name, "Bridge running. Press Ctrl+C to stop.");

        let result = worker.await;
        listener.abort();

        match result {
            Ok(()) => {
                tracing::info!(bridge = %self.name, "Goodbye!");
                Ok(())
            }
            Err(e) => {
                tracing::error!(bridge = %self.name, error = %e, "Worker failed");
                Err(BridgeError::worker(e.to_string()))
            }
        }
    }
}

async fn wait_for_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    result = tokio::signal::ctrl_c() => {
                        if let Err(e) = result {
                            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
                        }
                    }
                    _ = sigterm.recv() => {}
                }
                return;
            }
            Err(e) => tracing::warn!(error = %e, "Failed to install SIGTERM handler"),
        }
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
}
