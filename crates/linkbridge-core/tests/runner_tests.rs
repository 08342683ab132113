//! Concurrent jobs through the runner

use linkbridge_core::{
    AbortKind, JobId, JobStatus, LinkbridgeConfig, PipelineConfig, PipelineRunner,
};
use linkbridge_test_utils::{request, ArticleBuilder, Fixture, ScriptedGenerator};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;

fn slow_fixture(delay: Duration) -> Fixture {
    Fixture::new(ScriptedGenerator::replying(ArticleBuilder::new().build()).with_delay(delay))
}

fn runner(fixture: &Fixture, search: usize, generation: usize) -> PipelineRunner {
    let config = LinkbridgeConfig::default()
        .with_pipeline(PipelineConfig::default().with_concurrency(search, generation));
    PipelineRunner::from_config(Arc::new(config), fixture.collaborators())
}

#[tokio::test(start_paused = true)]
async fn generation_cap_holds_across_jobs() {
    let fixture = slow_fixture(Duration::from_secs(1));
    let runner = runner(&fixture, 4, 2);
    let requests: Vec<_> = (0..6).map(|_| request()).collect();
    let ids: Vec<JobId> = requests.iter().map(|r| r.id).collect();

    let results = runner.run_all(requests).await;

    assert_eq!(results.iter().map(|r| r.job_id).collect::<Vec<_>>(), ids);
    assert!(results.iter().all(|r| r.delivered()));
    assert_eq!(fixture.generator.calls(), 6);
    assert_eq!(fixture.generator.max_in_flight(), 2);
    assert_eq!(fixture.ingestor.calls(), 18);
}

#[tokio::test]
async fn status_follows_the_job_and_prune_clears_it() {
    let fixture = Fixture::passing();
    let runner = runner(&fixture, 4, 2);

    let handle = runner.submit(request());
    let id = handle.job_id();
    assert_eq!(runner.status(id), Some(JobStatus::Running));

    let result = handle.result().await;
    assert!(result.delivered());
    assert_eq!(runner.status(id), Some(JobStatus::Delivered));
    assert_eq!(runner.active_jobs(), 0);

    assert_eq!(runner.prune_finished(), 1);
    assert_eq!(runner.status(id), None);
}

#[tokio::test(start_paused = true)]
async fn cancel_reaches_a_running_job_only() {
    let fixture = slow_fixture(Duration::from_secs(10));
    let runner = runner(&fixture, 4, 2);

    let handle = runner.submit(request());
    let id = handle.job_id();
    assert!(runner.cancel(id));

    let result = handle.result().await;
    assert_eq!(result.abort_kind(), Some(AbortKind::Cancelled));
    assert_eq!(runner.status(id), Some(JobStatus::Aborted(AbortKind::Cancelled)));
    assert!(!runner.cancel(id));
    assert!(!runner.cancel(JobId::new()));
}

#[test]
fn status_serializes_with_its_kind() {
    let json = serde_json::to_value(JobStatus::Aborted(AbortKind::LoopDetected)).unwrap();
    assert_eq!(json, serde_json::json!({ "status": "aborted", "kind": "loop_detected" }));
    let json = serde_json::to_value(JobStatus::Running).unwrap();
    assert_eq!(json, serde_json::json!({ "status": "running" }));
}
