use sieve::error::ErrorKind;
use sieve::pipeline::Pipeline;
use sieve::test_utils::pipeline::{run_to_report, start_pipeline, wait_with_timeout};
use sieve::test_utils::reference::{prime_count, reference_primes};
use sieve_telemetry::tracing::init_test_tracing;

#[tokio::test(flavor = "multi_thread")]
async fn bounds_below_two_produce_no_primes() {
    init_test_tracing();

    for upper_bound in [i64::MIN, -100, -1, 0, 1] {
        let report = run_to_report(upper_bound).await.unwrap();

        assert!(report.primes.is_empty(), "bound {upper_bound}");
        // Only the terminal stage, which never receives a value, is spawned.
        assert_eq!(report.stages_spawned, 1);
        assert_eq!(report.live_units, 0);
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn small_bounds_produce_known_primes() {
    init_test_tracing();

    assert_eq!(sieve::run(2).await.unwrap(), vec![2]);
    assert_eq!(sieve::run(3).await.unwrap(), vec![2, 3]);
    assert_eq!(sieve::run(10).await.unwrap(), vec![2, 3, 5, 7]);
    assert_eq!(
        sieve::run(30).await.unwrap(),
        vec![2, 3, 5, 7, 11, 13, 17, 19, 23, 29]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn output_matches_trial_division() {
    init_test_tracing();

    for upper_bound in [4, 25, 97, 100, 101, 500, 2_000] {
        let primes = sieve::run(upper_bound).await.unwrap();

        assert_eq!(primes, reference_primes(upper_bound), "bound {upper_bound}");
        assert!(primes.iter().all(|prime| sieve::is_prime(*prime as i64)));
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn output_is_strictly_ascending() {
    init_test_tracing();

    let primes = sieve::run(1_000).await.unwrap();

    assert_eq!(primes.len(), 168);
    assert!(primes.windows(2).all(|pair| pair[0] < pair[1]));
}

#[tokio::test(flavor = "multi_thread")]
async fn repeated_runs_are_identical() {
    init_test_tracing();

    let first = sieve::run(750).await.unwrap();
    for _ in 0..5 {
        assert_eq!(sieve::run(750).await.unwrap(), first);
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn smaller_bound_output_is_prefix_of_larger() {
    init_test_tracing();

    let larger = sieve::run(600).await.unwrap();

    for upper_bound in [2, 50, 211, 599] {
        let smaller = sieve::run(upper_bound).await.unwrap();
        assert!(larger.starts_with(&smaller), "bound {upper_bound}");
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_pipelines_do_not_interfere() {
    init_test_tracing();

    let handles: Vec<_> = [100, 200, 300, 400]
        .into_iter()
        .map(|upper_bound| tokio::spawn(async move { (upper_bound, sieve::run(upper_bound).await) }))
        .collect();

    for handle in handles {
        let (upper_bound, primes) = handle.await.unwrap();
        assert_eq!(primes.unwrap(), reference_primes(upper_bound));
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn chain_depth_is_prime_count_plus_one() {
    init_test_tracing();

    for upper_bound in [2, 10, 30, 1_000] {
        let report = run_to_report(upper_bound).await.unwrap();
        let expected_stages = prime_count(upper_bound) + 1;

        assert_eq!(report.stages_spawned, expected_stages, "bound {upper_bound}");
        assert!(report.peak_live_stages >= 1);
        assert!(report.peak_live_stages <= expected_stages);
        assert_eq!(report.live_units, 0);
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn shutdown_discards_partial_results() {
    init_test_tracing();

    let pipeline = start_pipeline(1_000_000).await;
    let tracker = pipeline.tracker().clone();

    let err = pipeline.shutdown_and_wait().await.unwrap_err();

    assert!(err.kinds().contains(&ErrorKind::PipelineShutdown));
    assert_eq!(tracker.live_units(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn shutdown_through_cloned_transmitter_stops_pipeline() {
    init_test_tracing();

    let pipeline = start_pipeline(1_000_000).await;
    let shutdown_tx = pipeline.shutdown_tx();
    let tracker = pipeline.tracker().clone();

    shutdown_tx.shutdown().unwrap();
    let err = wait_with_timeout(pipeline).await.unwrap_err();

    assert!(err.kinds().contains(&ErrorKind::PipelineShutdown));
    assert_eq!(tracker.live_units(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn shutdown_after_completion_is_a_noop() {
    init_test_tracing();

    let pipeline = start_pipeline(50).await;
    let shutdown_tx = pipeline.shutdown_tx();

    let report = wait_with_timeout(pipeline).await.unwrap();
    assert_eq!(report.primes, reference_primes(50));

    // Every unit is gone, so nobody is left to receive the signal.
    assert!(shutdown_tx.shutdown().is_err());
}

#[tokio::test(flavor = "multi_thread")]
async fn pipeline_misuse_is_rejected() {
    init_test_tracing();

    let err = Pipeline::new(10).wait().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);

    let mut pipeline = start_pipeline(10).await;
    let err = pipeline.start().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);

    let report = wait_with_timeout(pipeline).await.unwrap();
    assert_eq!(report.primes, vec![2, 3, 5, 7]);
}
