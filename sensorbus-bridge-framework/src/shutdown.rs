//! Cooperative shutdown signalling.
//!
//! Workers receive a [`Shutdown`] handle and only observe it at their own
//! suspension points, so an in-flight exchange is never torn down halfway.

use std::time::Duration;

use tokio::sync::watch;

/// Create a linked trigger/handle pair.
pub fn channel() -> (ShutdownTrigger, Shutdown) {
    let (tx, rx) = watch::channel(false);
    (ShutdownTrigger { tx }, Shutdown { rx })
}

/// Sending side: flips the shutdown flag for every cloned [`Shutdown`].
#[derive(Debug)]
pub struct ShutdownTrigger {
    tx: watch::Sender<bool>,
}

impl ShutdownTrigger {
    /// Request shutdown. Idempotent.
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }
}

/// Outcome of a cancellable wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wait {
    /// The full duration elapsed.
    Elapsed,
    /// Shutdown was requested before or during the wait.
    Shutdown,
}

/// Receiving side of the shutdown flag.
#[derive(Debug, Clone)]
pub struct Shutdown {
    rx: watch::Receiver<bool>,
}

impl Shutdown {
    /// Whether shutdown has been requested.
    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once shutdown is requested.
    ///
    /// Never resolves if the trigger is dropped without firing.
    pub async fn triggered(&mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }

    /// Sleep for `duration` unless shutdown is requested first.
    pub async fn wait(&mut self, duration: Duration) -> Wait {
        if self.is_triggered() {
            return Wait::Shutdown;
        }

        tokio::select! {
            _ = tokio::time::sleep(duration) => Wait::Elapsed,
            _ = self.triggered() => Wait::Shutdown,
        }
    }
}
