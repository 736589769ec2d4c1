use std::time::Duration;

use tokio::time::timeout;

use crate::error::SieveResult;
use crate::pipeline::{Pipeline, PipelineReport};

/// Upper limit for a whole pipeline run in tests, so a hung chain fails instead of blocking.
pub const PIPELINE_TIMEOUT: Duration = Duration::from_secs(30);

/// Starts a pipeline for `upper_bound` and returns it running.
pub async fn start_pipeline(upper_bound: i64) -> Pipeline {
    let mut pipeline = Pipeline::new(upper_bound);
    pipeline.start().await.unwrap();

    pipeline
}

/// Waits on `pipeline`, panicking if it does not complete within [`PIPELINE_TIMEOUT`].
pub async fn wait_with_timeout(pipeline: Pipeline) -> SieveResult<PipelineReport> {
    timeout(PIPELINE_TIMEOUT, pipeline.wait())
        .await
        .expect("pipeline did not complete in time")
}

/// Runs a whole pipeline for `upper_bound` and returns its report.
pub async fn run_to_report(upper_bound: i64) -> SieveResult<PipelineReport> {
    let pipeline = start_pipeline(upper_bound).await;

    wait_with_timeout(pipeline).await
}
