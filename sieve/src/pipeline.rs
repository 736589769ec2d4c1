use metrics::counter;
use tracing::{error, info};

use crate::bail;
use crate::concurrency::channel::create_channel;
use crate::concurrency::collector::{PrimeCollector, create_prime_collector};
use crate::concurrency::shutdown::{ShutdownTx, create_shutdown_channel};
use crate::concurrency::tracker::UnitTracker;
use crate::error::{ErrorKind, SieveError, SieveResult};
use crate::metrics::{ERROR_KIND_LABEL, SIEVE_PIPELINE_FAILURES_TOTAL};
use crate::workers::base::{Worker, WorkerHandle};
use crate::workers::generator::{SourceGenerator, SourceGeneratorHandle};
use crate::workers::stage::{FilterStage, FilterStageHandle};

#[derive(Debug)]
enum PipelineState {
    NotStarted,
    Started {
        generator: SourceGeneratorHandle,
        first_stage: FilterStageHandle,
        collector: PrimeCollector,
    },
}

/// Outcome of a completed pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineReport {
    /// Every prime lower than or equal to the upper bound, in ascending order.
    pub primes: Vec<u64>,
    /// Number of filter stages spawned, including the terminal stage that owns no prime.
    pub stages_spawned: usize,
    /// Highest number of filter stages alive at the same time.
    pub peak_live_stages: usize,
    /// Units still alive when the report was built.
    pub live_units: usize,
}

/// Prime sieve built as a chain of concurrently running filter stages.
///
/// The pipeline connects a [`SourceGenerator`] to a first [`FilterStage`]; every stage spawns
/// its own successor once it owns a prime. Waiting on the first stage is enough to wait on the
/// whole chain, since each stage joins its successor before completing.
#[derive(Debug)]
pub struct Pipeline {
    upper_bound: i64,
    tracker: UnitTracker,
    state: PipelineState,
    shutdown_tx: ShutdownTx,
}

impl Pipeline {
    /// Creates a pipeline producing the primes lower than or equal to `upper_bound`.
    ///
    /// Bounds lower than two are valid and produce no primes.
    pub fn new(upper_bound: i64) -> Self {
        // The initial receiver is not kept, units subscribe through the transmitter.
        let (shutdown_tx, _) = create_shutdown_channel();

        Self {
            upper_bound,
            tracker: UnitTracker::new(),
            state: PipelineState::NotStarted,
            shutdown_tx,
        }
    }

    /// Returns the upper bound the pipeline was created with.
    pub fn upper_bound(&self) -> i64 {
        self.upper_bound
    }

    /// Returns a transmitter that shuts the pipeline down from another task.
    pub fn shutdown_tx(&self) -> ShutdownTx {
        self.shutdown_tx.clone()
    }

    /// Returns the tracker accounting for the units of this pipeline.
    pub fn tracker(&self) -> &UnitTracker {
        &self.tracker
    }

    /// Spawns the source generator and the first filter stage.
    ///
    /// Must be called from within a tokio runtime, and at most once.
    pub async fn start(&mut self) -> SieveResult<()> {
        if let PipelineState::Started { .. } = self.state {
            bail!(
                ErrorKind::InvalidState,
                "Pipeline already started",
                format!(
                    "The pipeline with upper bound {} cannot be started twice",
                    self.upper_bound
                )
            );
        }

        info!(upper_bound = self.upper_bound, "starting pipeline");

        let (input_tx, input_rx) = create_channel();
        let (prime_sink, collector) = create_prime_collector();

        let first_stage = FilterStage::new(
            1,
            input_rx,
            prime_sink,
            self.shutdown_tx.subscribe(),
            self.tracker.clone(),
        )
        .spawn()?;

        // A negative bound generates nothing, like any bound lower than two.
        let generator_bound = u64::try_from(self.upper_bound).unwrap_or(0);
        let generator = SourceGenerator::new(
            generator_bound,
            input_tx,
            self.shutdown_tx.subscribe(),
            self.tracker.clone(),
        )
        .spawn();

        let generator = match generator {
            Ok(generator) => generator,
            Err(err) => {
                // The first stage sees its input channel closed and stops, we still join it.
                let _ = first_stage.wait().await;

                return Err(err);
            }
        };

        self.state = PipelineState::Started {
            generator,
            first_stage,
            collector,
        };

        Ok(())
    }

    /// Waits for every unit of the pipeline to complete and returns the collected primes.
    ///
    /// Fails if any unit failed, in which case the primes collected so far are discarded.
    pub async fn wait(self) -> SieveResult<PipelineReport> {
        let PipelineState::Started {
            generator,
            first_stage,
            collector,
        } = self.state
        else {
            bail!(
                ErrorKind::InvalidState,
                "Pipeline was not started",
                "The pipeline must be started before waiting on it"
            );
        };

        info!(unit = %first_stage.worker_type(), "waiting for the stage chain to complete");

        // The first stage completes only after all its successors completed.
        let chain_result = first_stage.wait().await;
        if chain_result.is_err() {
            // The generator notices the closed channel on its next send, shutting down makes it
            // stop even while it is suspended.
            let _ = self.shutdown_tx.shutdown();

            info!("filter stages completed with an error, stopping the source generator");
        }

        info!(unit = %generator.worker_type(), "waiting for unit to complete");

        let generator_result = generator.wait().await;
        let errors = root_cause_first(chain_result.err(), generator_result.err());

        // All units were joined, so all prime sinks are gone and collecting terminates.
        let primes = collector.collect().await;
        let snapshot = self.tracker.snapshot();

        if !errors.is_empty() {
            for err in &errors {
                error!(
                    error_kind = ?err.kind(),
                    location = %err.location(),
                    "pipeline unit failed"
                );
                counter!(
                    SIEVE_PIPELINE_FAILURES_TOTAL,
                    ERROR_KIND_LABEL => format!("{:?}", err.kind())
                )
                .increment(1);
            }

            error!(
                discarded_primes = primes.len(),
                "pipeline failed, discarding partial results"
            );

            return Err(errors.into());
        }

        info!(
            primes = primes.len(),
            stages = snapshot.stages_spawned,
            "pipeline completed"
        );

        Ok(PipelineReport {
            primes,
            stages_spawned: snapshot.stages_spawned,
            peak_live_stages: snapshot.peak_live_stages,
            live_units: snapshot.live_units(),
        })
    }

    /// Asks every unit to stop at its next suspension point.
    ///
    /// Does nothing when no unit is running.
    pub fn shutdown(&self) {
        info!("trying to shut down the pipeline");

        if let Err(err) = self.shutdown_tx.shutdown() {
            info!("no running units to shut down: {}", err);
            return;
        }

        info!("shut down signal successfully sent to all units");
    }

    pub async fn shutdown_and_wait(self) -> SieveResult<PipelineReport> {
        self.shutdown();
        self.wait().await
    }
}

/// Orders the errors of a failed run so that the root cause comes first.
///
/// A chain that only saw its upstream close without the end of data failed because of the
/// generator, unless the generator itself merely observed the chain going away or the shutdown
/// raised after it.
fn root_cause_first(
    chain_error: Option<SieveError>,
    generator_error: Option<SieveError>,
) -> Vec<SieveError> {
    match (chain_error, generator_error) {
        (Some(chain_error), Some(generator_error))
            if chain_error.kind() == ErrorKind::ChannelClosed
                && !matches!(
                    generator_error.kind(),
                    ErrorKind::ChannelClosed | ErrorKind::PipelineShutdown
                ) =>
        {
            vec![generator_error, chain_error]
        }
        (chain_error, generator_error) => chain_error.into_iter().chain(generator_error).collect(),
    }
}

/// Returns every prime lower than or equal to `upper_bound`, in ascending order.
///
/// Runs a whole [`Pipeline`] and waits for it. Must be called from within a tokio runtime.
pub async fn run(upper_bound: i64) -> SieveResult<Vec<u64>> {
    let mut pipeline = Pipeline::new(upper_bound);
    pipeline.start().await?;

    let report = pipeline.wait().await?;

    Ok(report.primes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sieve_error;

    #[tokio::test]
    async fn small_bounds_produce_expected_primes() {
        assert_eq!(run(1).await.unwrap(), Vec::<u64>::new());
        assert_eq!(run(2).await.unwrap(), vec![2]);
        assert_eq!(run(10).await.unwrap(), vec![2, 3, 5, 7]);
    }

    #[tokio::test]
    async fn non_positive_bounds_produce_nothing() {
        assert!(run(0).await.unwrap().is_empty());
        assert!(run(-5).await.unwrap().is_empty());
        assert!(run(i64::MIN).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn waiting_before_start_fails() {
        let pipeline = Pipeline::new(10);

        let err = pipeline.wait().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
    }

    #[tokio::test]
    async fn starting_twice_fails() {
        let mut pipeline = Pipeline::new(10);
        pipeline.start().await.unwrap();

        let err = pipeline.start().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);

        assert_eq!(pipeline.wait().await.unwrap().primes, vec![2, 3, 5, 7]);
    }

    #[tokio::test]
    async fn shutdown_before_start_is_a_noop() {
        let mut pipeline = Pipeline::new(10);
        pipeline.shutdown();
        pipeline.start().await.unwrap();

        assert_eq!(pipeline.wait().await.unwrap().primes, vec![2, 3, 5, 7]);
    }

    #[test]
    fn generator_fault_is_reported_before_closed_chain() {
        let chain = sieve_error!(ErrorKind::ChannelClosed, "Upstream channel closed");
        let generator = sieve_error!(ErrorKind::RuntimeUnavailable, "Generator failed");

        let errors = root_cause_first(Some(chain), Some(generator));

        let kinds: Vec<_> = errors.iter().map(SieveError::kind).collect();
        assert_eq!(
            kinds,
            vec![ErrorKind::RuntimeUnavailable, ErrorKind::ChannelClosed]
        );
    }

    #[test]
    fn chain_fault_stays_first() {
        let chain = sieve_error!(ErrorKind::StageSpawnFailed, "Could not spawn the successor stage");
        let generator = sieve_error!(ErrorKind::PipelineShutdown, "Source generator interrupted");

        let errors = root_cause_first(Some(chain), Some(generator));
        assert_eq!(errors[0].kind(), ErrorKind::StageSpawnFailed);

        // A closed chain is not blamed on a generator that only saw the shutdown.
        let chain = sieve_error!(ErrorKind::ChannelClosed, "Upstream channel closed");
        let generator = sieve_error!(ErrorKind::PipelineShutdown, "Source generator interrupted");

        let errors = root_cause_first(Some(chain), Some(generator));
        assert_eq!(errors[0].kind(), ErrorKind::ChannelClosed);
    }

    #[test]
    fn single_failures_are_kept_alone() {
        let generator = sieve_error!(ErrorKind::ChannelClosed, "Downstream channel closed");

        assert_eq!(root_cause_first(None, Some(generator)).len(), 1);
        assert!(root_cause_first(None, None).is_empty());
    }

    #[tokio::test]
    async fn report_accounts_for_every_stage() {
        let mut pipeline = Pipeline::new(30);
        assert_eq!(pipeline.upper_bound(), 30);
        pipeline.start().await.unwrap();

        let report = pipeline.wait().await.unwrap();
        assert_eq!(report.primes.len(), 10);
        assert_eq!(report.stages_spawned, 11);
        assert!(report.peak_live_stages <= 11);
        assert_eq!(report.live_units, 0);
    }
}
