use tokio::task::JoinHandle;
use tracing::{Instrument, debug, info_span};

use crate::bail;
use crate::concurrency::channel::ChannelTx;
use crate::concurrency::shutdown::ShutdownRx;
use crate::concurrency::tracker::UnitTracker;
use crate::error::{ErrorKind, SieveResult};
use crate::failpoints::{GENERATOR_BEFORE_SEND, sieve_fail_point};
use crate::workers::base::{Worker, WorkerHandle, WorkerType, join_result, spawn_unit};

/// Handle to a running [`SourceGenerator`].
#[derive(Debug)]
pub struct SourceGeneratorHandle {
    handle: Option<JoinHandle<SieveResult<()>>>,
}

impl WorkerHandle for SourceGeneratorHandle {
    fn worker_type(&self) -> WorkerType {
        WorkerType::SourceGenerator
    }

    async fn wait(mut self) -> SieveResult<()> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };

        join_result(WorkerType::SourceGenerator, handle.await)
    }
}

/// Unit writing the integers `2..=upper_bound` in ascending order onto its output channel.
///
/// After the last value it signals the end of data and terminates. An upper bound lower than two
/// yields an immediate end of data.
#[derive(Debug)]
pub struct SourceGenerator {
    upper_bound: u64,
    output: ChannelTx,
    shutdown_rx: ShutdownRx,
    tracker: UnitTracker,
}

impl SourceGenerator {
    /// Creates a new generator writing onto `output`.
    pub fn new(
        upper_bound: u64,
        output: ChannelTx,
        shutdown_rx: ShutdownRx,
        tracker: UnitTracker,
    ) -> Self {
        Self {
            upper_bound,
            output,
            shutdown_rx,
            tracker,
        }
    }

    async fn run(self) -> SieveResult<()> {
        let SourceGenerator {
            upper_bound,
            mut output,
            mut shutdown_rx,
            ..
        } = self;

        for value in 2..=upper_bound {
            sieve_fail_point(GENERATOR_BEFORE_SEND)?;

            tokio::select! {
                biased;

                _ = shutdown_rx.wait() => {
                    bail!(
                        ErrorKind::PipelineShutdown,
                        "Source generator interrupted by shutdown",
                        format!("Shutdown requested before sending value {value}")
                    );
                }
                result = output.send(value) => result?,
            }
        }

        output.send_end().await?;

        debug!("source generator sent the end of data");

        Ok(())
    }
}

impl Worker<SourceGeneratorHandle> for SourceGenerator {
    fn spawn(self) -> SieveResult<SourceGeneratorHandle> {
        let span = info_span!("source_generator", upper_bound = self.upper_bound);
        let guard = self.tracker.track_generator();

        let generator = async move {
            let result = self.run().await;
            drop(guard);

            result
        }
        .instrument(span);

        let handle = spawn_unit(WorkerType::SourceGenerator, generator)?;

        Ok(SourceGeneratorHandle {
            handle: Some(handle),
        })
    }
}
