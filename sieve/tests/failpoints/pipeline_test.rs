use sieve::error::ErrorKind;
use sieve::failpoints::{
    GENERATOR_BEFORE_SEND, STAGE_BEFORE_CHANNEL_CREATE, STAGE_BEFORE_SPAWN_SUCCESSOR,
};
use sieve::test_utils::failpoints::SieveFailScenario;
use sieve::test_utils::pipeline::{start_pipeline, wait_with_timeout};
use sieve::test_utils::reference::reference_primes;
use sieve_telemetry::tracing::init_test_tracing;

#[tokio::test(flavor = "multi_thread")]
async fn channel_creation_failure_fails_pipeline() {
    init_test_tracing();
    let _scenario = SieveFailScenario::setup(&[(STAGE_BEFORE_CHANNEL_CREATE, "3*off->return")]);

    let pipeline = start_pipeline(100).await;
    let tracker = pipeline.tracker().clone();

    let err = wait_with_timeout(pipeline).await.unwrap_err();

    // The fourth stage fails, so the chain never grows past it.
    assert_eq!(err.kind(), ErrorKind::ChannelCreateFailed);
    assert!(err.to_string().contains("Stage 4"));
    assert_eq!(tracker.snapshot().stages_spawned, 4);
    assert_eq!(tracker.live_units(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn successor_spawn_failure_fails_pipeline() {
    init_test_tracing();
    let _scenario = SieveFailScenario::setup(&[(STAGE_BEFORE_SPAWN_SUCCESSOR, "return")]);

    let pipeline = start_pipeline(100).await;
    let tracker = pipeline.tracker().clone();

    let err = wait_with_timeout(pipeline).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::StageSpawnFailed);
    assert_eq!(tracker.snapshot().stages_spawned, 1);
    assert_eq!(tracker.live_units(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn generator_failure_propagates_through_chain() {
    init_test_tracing();
    let _scenario = SieveFailScenario::setup(&[(GENERATOR_BEFORE_SEND, "10*off->return")]);

    let pipeline = start_pipeline(100).await;
    let tracker = pipeline.tracker().clone();

    let err = wait_with_timeout(pipeline).await.unwrap_err();
    let kinds = err.kinds();

    // The stages see their upstream closed without the end of data, but the generator's fault
    // is the root cause.
    assert_eq!(err.kind(), ErrorKind::InjectedFault);
    assert_eq!(kinds, vec![ErrorKind::InjectedFault, ErrorKind::ChannelClosed]);
    assert_eq!(tracker.live_units(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn disarmed_failpoints_do_not_affect_output() {
    init_test_tracing();
    let _scenario = SieveFailScenario::setup(&[
        (STAGE_BEFORE_CHANNEL_CREATE, "off"),
        (STAGE_BEFORE_SPAWN_SUCCESSOR, "off"),
        (GENERATOR_BEFORE_SEND, "off"),
    ]);

    let report = wait_with_timeout(start_pipeline(200).await).await.unwrap();

    assert_eq!(report.primes, reference_primes(200));
    assert_eq!(report.live_units, 0);
}
