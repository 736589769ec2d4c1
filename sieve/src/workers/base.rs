use std::fmt;
use std::future::Future;

use tokio::runtime::Handle;
use tokio::task::{JoinError, JoinHandle};

use crate::error::{ErrorKind, SieveError, SieveResult};
use crate::sieve_error;

/// Classification of pipeline units.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum WorkerType {
    /// Unit writing the candidate integers onto the first channel.
    SourceGenerator,
    /// Unit owning one prime at the given position of the chain, starting from 1.
    FilterStage {
        /// Position of the stage in the chain.
        depth: usize,
    },
}

impl fmt::Display for WorkerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerType::SourceGenerator => write!(f, "source generator"),
            WorkerType::FilterStage { depth } => write!(f, "filter stage {depth}"),
        }
    }
}

/// Trait for units that run as their own task.
///
/// Spawning never blocks: the unit starts running concurrently and the returned handle is the
/// only way to learn how it ended.
pub trait Worker<H>
where
    H: WorkerHandle,
{
    /// Spawns the unit and returns the handle used to join it.
    fn spawn(self) -> SieveResult<H>;
}

/// Handle to a running unit.
///
/// Every handle must be waited on by whoever spawned the unit before reporting its own
/// completion.
pub trait WorkerHandle {
    /// Returns the type of the unit behind this handle.
    fn worker_type(&self) -> WorkerType;

    /// Waits for the unit to complete and returns its result.
    fn wait(self) -> impl Future<Output = SieveResult<()>> + Send;
}

/// Spawns `future` on the current tokio runtime.
///
/// Fails with [`ErrorKind::RuntimeUnavailable`] when called outside of a runtime.
pub(crate) fn spawn_unit<F>(worker_type: WorkerType, future: F) -> SieveResult<JoinHandle<F::Output>>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    let runtime = Handle::try_current().map_err(|err| {
        sieve_error!(
            ErrorKind::RuntimeUnavailable,
            "No runtime available to spawn a pipeline unit",
            format!("Could not spawn the {worker_type}: {err}")
        )
    })?;

    Ok(runtime.spawn(future))
}

/// Converts the outcome of joining a unit's task into a [`SieveResult`].
pub(crate) fn join_result(
    worker_type: WorkerType,
    result: Result<SieveResult<()>, JoinError>,
) -> SieveResult<()> {
    result.map_err(|err| join_error(worker_type, err))?
}

fn join_error(worker_type: WorkerType, err: JoinError) -> SieveError {
    match (worker_type, err.is_cancelled()) {
        (WorkerType::SourceGenerator, true) => sieve_error!(
            ErrorKind::GeneratorWorkerCancelled,
            "Source generator was cancelled",
            err
        ),
        (WorkerType::SourceGenerator, false) => sieve_error!(
            ErrorKind::GeneratorWorkerPanic,
            "Source generator panicked",
            err
        ),
        (WorkerType::FilterStage { depth }, true) => sieve_error!(
            ErrorKind::StageWorkerCancelled,
            "Filter stage was cancelled",
            format!("Stage {depth}: {err}")
        ),
        (WorkerType::FilterStage { depth }, false) => sieve_error!(
            ErrorKind::StageWorkerPanic,
            "Filter stage panicked",
            format!("Stage {depth}: {err}")
        ),
    }
}
