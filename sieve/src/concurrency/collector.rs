//! Queue through which filter stages report the primes they own.

use tokio::sync::mpsc;

use crate::bail;
use crate::error::{ErrorKind, SieveResult};

/// Handle used by a filter stage to report its prime.
///
/// Every stage holds its own clone. Reports never suspend the stage.
#[derive(Debug, Clone)]
pub struct PrimeSink {
    tx: mpsc::UnboundedSender<u64>,
}

impl PrimeSink {
    /// Reports a newly discovered prime.
    pub fn emit(&self, prime: u64) -> SieveResult<()> {
        if self.tx.send(prime).is_err() {
            bail!(
                ErrorKind::ChannelClosed,
                "Prime collector closed",
                format!("Prime {prime} could not be reported")
            );
        }

        Ok(())
    }
}

/// Single reader of all reported primes.
///
/// Primes are stored in report order. A stage reports its prime before it forwards anything to
/// its successor, so report order is ascending.
#[derive(Debug)]
pub struct PrimeCollector {
    rx: mpsc::UnboundedReceiver<u64>,
}

impl PrimeCollector {
    /// Collects every reported prime.
    ///
    /// Resolves once all [`PrimeSink`]s are dropped, that is once every stage completed.
    pub async fn collect(mut self) -> Vec<u64> {
        let mut primes = Vec::new();
        while let Some(prime) = self.rx.recv().await {
            primes.push(prime);
        }

        primes
    }
}

/// Creates a new prime collector with its first sink.
pub fn create_prime_collector() -> (PrimeSink, PrimeCollector) {
    let (tx, rx) = mpsc::unbounded_channel();

    (PrimeSink { tx }, PrimeCollector { rx })
}
