use metrics::counter;
use tokio::task::JoinHandle;
use tracing::{Instrument, Span, debug, field, info_span, trace};

use crate::concurrency::channel::{ChannelRx, ChannelTx, create_channel};
use crate::concurrency::collector::PrimeSink;
use crate::concurrency::shutdown::ShutdownRx;
use crate::concurrency::tracker::UnitTracker;
use crate::error::{ErrorKind, SieveError, SieveResult};
use crate::failpoints::{
    STAGE_BEFORE_CHANNEL_CREATE, STAGE_BEFORE_SPAWN_SUCCESSOR, sieve_fail_point,
};
use crate::metrics::{SIEVE_PRIMES_DISCOVERED_TOTAL, SIEVE_VALUES_DISCARDED_TOTAL};
use crate::sieve_error;
use crate::workers::base::{Worker, WorkerHandle, WorkerType, join_result, spawn_unit};

/// Handle to a running [`FilterStage`].
#[derive(Debug)]
pub struct FilterStageHandle {
    depth: usize,
    handle: Option<JoinHandle<SieveResult<()>>>,
}

impl FilterStageHandle {
    /// Returns the position of the stage in the chain.
    pub fn depth(&self) -> usize {
        self.depth
    }
}

impl WorkerHandle for FilterStageHandle {
    fn worker_type(&self) -> WorkerType {
        WorkerType::FilterStage { depth: self.depth }
    }

    async fn wait(mut self) -> SieveResult<()> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };

        join_result(WorkerType::FilterStage { depth: self.depth }, handle.await)
    }
}

/// State of a [`FilterStage`].
///
/// A stage starts in [`StageState::AwaitingPrime`] and always ends in [`StageState::Done`].
#[derive(Debug)]
enum StageState {
    /// Waiting for the first upstream value, which is the stage's prime.
    AwaitingPrime,
    /// Forwarding the values that are not multiples of `prime` to the successor.
    Forwarding {
        prime: u64,
        downstream: ChannelTx,
        successor: FilterStageHandle,
    },
    /// Terminal state.
    Done,
}

/// Reason why forwarding stopped before the end of data.
#[derive(Debug)]
enum Interruption {
    /// The stage itself failed: upstream closed, shutdown, or a local fault.
    Local(SieveError),
    /// The successor dropped its upstream channel, so its own result is the root cause.
    SuccessorGone(SieveError),
}

/// Unit owning one prime of the sieve.
///
/// The first value received from upstream is the stage's prime: the values reaching a stage are
/// exactly those not divisible by any prime owned by an earlier stage, and they arrive in
/// ascending order. Once the prime is known the stage spawns its successor and forwards to it
/// every value that is not a multiple of the prime. A stage whose upstream ends before any value
/// arrives owns no prime, spawns nothing and terminates the chain.
#[derive(Debug)]
pub struct FilterStage {
    depth: usize,
    upstream: ChannelRx,
    prime_sink: PrimeSink,
    shutdown_rx: ShutdownRx,
    tracker: UnitTracker,
}

impl FilterStage {
    /// Creates a new stage at position `depth` reading from `upstream`.
    pub fn new(
        depth: usize,
        upstream: ChannelRx,
        prime_sink: PrimeSink,
        shutdown_rx: ShutdownRx,
        tracker: UnitTracker,
    ) -> Self {
        Self {
            depth,
            upstream,
            prime_sink,
            shutdown_rx,
            tracker,
        }
    }

    async fn run(mut self) -> SieveResult<()> {
        let mut state = StageState::AwaitingPrime;

        loop {
            state = match state {
                StageState::AwaitingPrime => self.await_prime().await?,
                StageState::Forwarding {
                    prime,
                    downstream,
                    successor,
                } => self.forward(prime, downstream, successor).await?,
                StageState::Done => return Ok(()),
            };
        }
    }

    /// Receives the stage's prime and spawns the successor.
    async fn await_prime(&mut self) -> SieveResult<StageState> {
        let Some(prime) = self.next_value().await? else {
            debug!("upstream ended before any value, chain ends here");

            return Ok(StageState::Done);
        };

        Span::current().record("prime", prime);
        self.prime_sink.emit(prime)?;
        counter!(SIEVE_PRIMES_DISCOVERED_TOTAL).increment(1);

        let depth = self.depth;

        sieve_fail_point(STAGE_BEFORE_CHANNEL_CREATE).map_err(|err| {
            sieve_error!(
                ErrorKind::ChannelCreateFailed,
                "Could not create the successor channel",
                format!("Stage {depth} could not create the channel to its successor")
            )
            .with_source(err)
        })?;
        let (downstream, successor_upstream) = create_channel();

        let successor = sieve_fail_point(STAGE_BEFORE_SPAWN_SUCCESSOR)
            .and_then(|()| {
                FilterStage::new(
                    depth + 1,
                    successor_upstream,
                    self.prime_sink.clone(),
                    self.shutdown_rx.clone(),
                    self.tracker.clone(),
                )
                .spawn()
            })
            .map_err(|err| {
                sieve_error!(
                    ErrorKind::StageSpawnFailed,
                    "Could not spawn the successor stage",
                    format!("Stage {depth} could not spawn stage {}", depth + 1)
                )
                .with_source(err)
            })?;

        debug!(prime, successor_depth = successor.depth(), "prime secured, successor spawned");

        Ok(StageState::Forwarding {
            prime,
            downstream,
            successor,
        })
    }

    /// Forwards non-multiples of `prime` until the end of data, then joins the successor.
    ///
    /// The successor is joined on every path, including failures, so no unit outlives the stage
    /// that spawned it.
    async fn forward(
        &mut self,
        prime: u64,
        mut downstream: ChannelTx,
        successor: FilterStageHandle,
    ) -> SieveResult<StageState> {
        let mut discarded: u64 = 0;
        let filtered = self
            .filter_multiples(prime, &mut downstream, &mut discarded)
            .await;
        let interruption = match filtered {
            Ok(()) => match downstream.send_end().await {
                Ok(()) => {
                    trace!("end of data forwarded to successor");
                    None
                }
                Err(err) => Some(Interruption::SuccessorGone(err)),
            },
            Err(interruption) => {
                // Dropping the writer lets the successor observe the interruption.
                drop(downstream);
                Some(interruption)
            }
        };

        counter!(SIEVE_VALUES_DISCARDED_TOTAL).increment(discarded);

        let successor_result = successor.wait().await;
        trace!(discarded, "successor joined");

        match (interruption, successor_result) {
            (None, Ok(())) => Ok(StageState::Done),
            (None, Err(err)) => Err(err),
            (Some(Interruption::SuccessorGone(err)), Ok(())) => Err(err),
            (Some(Interruption::SuccessorGone(_)), Err(err)) => {
                debug!(error = %err, "successor failed, stopping stage");
                Err(err)
            }
            (Some(Interruption::Local(err)), _) => Err(err),
        }
    }

    async fn filter_multiples(
        &mut self,
        prime: u64,
        downstream: &mut ChannelTx,
        discarded: &mut u64,
    ) -> Result<(), Interruption> {
        while let Some(value) = self.next_value().await.map_err(Interruption::Local)? {
            if value % prime == 0 {
                *discarded += 1;
                continue;
            }

            tokio::select! {
                biased;

                _ = self.shutdown_rx.wait() => {
                    return Err(Interruption::Local(shutdown_error(self.depth)));
                }
                result = downstream.send(value) => result.map_err(Interruption::SuccessorGone)?,
            }
        }

        Ok(())
    }

    async fn next_value(&mut self) -> SieveResult<Option<u64>> {
        tokio::select! {
            biased;

            _ = self.shutdown_rx.wait() => Err(shutdown_error(self.depth)),
            value = self.upstream.receive() => value,
        }
    }
}

fn shutdown_error(depth: usize) -> SieveError {
    sieve_error!(
        ErrorKind::PipelineShutdown,
        "Filter stage interrupted by shutdown",
        format!("Stage {depth} stopped before reaching the end of data")
    )
}

impl Worker<FilterStageHandle> for FilterStage {
    fn spawn(self) -> SieveResult<FilterStageHandle> {
        let depth = self.depth;
        let span = info_span!("filter_stage", depth, prime = field::Empty);
        let guard = self.tracker.track_stage();

        let stage = async move {
            let result = self.run().await;
            drop(guard);

            result
        }
        .instrument(span);

        let handle = spawn_unit(WorkerType::FilterStage { depth }, stage)?;

        Ok(FilterStageHandle {
            depth,
            handle: Some(handle),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::timeout;

    use super::*;
    use crate::concurrency::collector::create_prime_collector;
    use crate::concurrency::shutdown::create_shutdown_channel;

    async fn sieve_values(values: &[u64]) -> (Vec<u64>, UnitTracker) {
        let (mut tx, rx) = create_channel();
        let (sink, collector) = create_prime_collector();
        let (_shutdown_tx, shutdown_rx) = create_shutdown_channel();
        let tracker = UnitTracker::new();

        let stage = FilterStage::new(1, rx, sink, shutdown_rx, tracker.clone())
            .spawn()
            .unwrap();

        for value in values {
            tx.send(*value).await.unwrap();
        }
        tx.send_end().await.unwrap();

        stage.wait().await.unwrap();

        (collector.collect().await, tracker)
    }

    #[tokio::test]
    async fn empty_upstream_spawns_no_successor() {
        let (primes, tracker) = sieve_values(&[]).await;

        assert!(primes.is_empty());
        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.stages_spawned, 1);
        assert_eq!(snapshot.live_units(), 0);
    }

    #[tokio::test]
    async fn chain_grows_one_stage_per_prime() {
        let values: Vec<u64> = (2..=30).collect();
        let (primes, tracker) = sieve_values(&values).await;

        assert_eq!(primes, vec![2, 3, 5, 7, 11, 13, 17, 19, 23, 29]);
        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.stages_spawned, primes.len() + 1);
        assert!(snapshot.peak_live_stages <= primes.len() + 1);
        assert_eq!(snapshot.live_units(), 0);
    }

    #[tokio::test]
    async fn first_value_is_taken_as_prime() {
        // The stage does not re-check primality: its first value is trusted.
        let (primes, _) = sieve_values(&[4, 6, 8, 9]).await;

        assert_eq!(primes, vec![4, 6, 9]);
    }

    #[tokio::test]
    async fn writer_dropped_without_end_fails_whole_chain() {
        let (mut tx, rx) = create_channel();
        let (sink, collector) = create_prime_collector();
        let (_shutdown_tx, shutdown_rx) = create_shutdown_channel();
        let tracker = UnitTracker::new();

        let stage = FilterStage::new(1, rx, sink, shutdown_rx, tracker.clone())
            .spawn()
            .unwrap();

        for value in 2..=10 {
            tx.send(value).await.unwrap();
        }
        drop(tx);

        let err = stage.wait().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ChannelClosed);
        assert_eq!(tracker.live_units(), 0);
        assert_eq!(collector.collect().await, vec![2, 3, 5, 7]);
    }

    #[tokio::test]
    async fn shutdown_stops_every_stage() {
        let (mut tx, rx) = create_channel();
        let (sink, _collector) = create_prime_collector();
        let (shutdown_tx, shutdown_rx) = create_shutdown_channel();
        let tracker = UnitTracker::new();

        let stage = FilterStage::new(1, rx, sink, shutdown_rx, tracker.clone())
            .spawn()
            .unwrap();

        for value in 2..=20 {
            tx.send(value).await.unwrap();
        }
        shutdown_tx.shutdown().unwrap();

        let err = timeout(Duration::from_secs(5), stage.wait())
            .await
            .unwrap()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PipelineShutdown);
        assert_eq!(tracker.live_units(), 0);
    }
}
