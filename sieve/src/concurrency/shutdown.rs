//! Broadcast shutdown signal for pipeline units.
//!
//! Every unit of a pipeline holds a [`ShutdownRx`] and waits on it next to its channel operations.
//! Once [`ShutdownTx::shutdown`] is called, the signal stays raised, so units subscribing after
//! the call still observe it.

use std::future;
use std::sync::Arc;

use tokio::sync::watch;

/// Transmitter side of the shutdown signal.
#[derive(Debug, Clone)]
pub struct ShutdownTx(Arc<watch::Sender<bool>>);

impl ShutdownTx {
    /// Raises the shutdown signal for all subscribers.
    ///
    /// Fails when there are no subscribers, which means that no unit is running.
    pub fn shutdown(&self) -> Result<(), watch::error::SendError<bool>> {
        self.0.send(true)
    }

    /// Creates a new receiver of the shutdown signal.
    pub fn subscribe(&self) -> ShutdownRx {
        ShutdownRx(self.0.subscribe())
    }
}

/// Receiver side of the shutdown signal.
#[derive(Debug, Clone)]
pub struct ShutdownRx(watch::Receiver<bool>);

impl ShutdownRx {
    /// Returns whether shutdown was requested.
    pub fn is_shutdown(&self) -> bool {
        *self.0.borrow()
    }

    /// Waits until shutdown is requested.
    ///
    /// Resolves immediately if the signal is already raised. If the transmitter is dropped
    /// without raising it, shutdown can no longer happen and the future never resolves.
    pub async fn wait(&mut self) {
        if self.0.wait_for(|shutdown| *shutdown).await.is_err() {
            future::pending::<()>().await;
        }
    }
}

/// Creates a new shutdown signal in the lowered state.
pub fn create_shutdown_channel() -> (ShutdownTx, ShutdownRx) {
    let (tx, rx) = watch::channel(false);

    (ShutdownTx(Arc::new(tx)), ShutdownRx(rx))
}
