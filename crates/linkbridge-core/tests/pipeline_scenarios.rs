//! End-to-end controller runs against scripted collaborators

use linkbridge_core::{
    verify_entries, AbortKind, CancelToken, CollaboratorError, Collaborators, ContentGenerator,
    ContextBundle, JobRequest, JobResult, LinkbridgeConfig, PipelineConfig, PipelineController,
    PipelineError, PipelineState, ProviderLimits, RetryPolicy,
};
use linkbridge_model::{
    AutoFixAction, BridgeType, Criterion, GeneratedArtifact, GenerationConstraints,
    QualityStatus,
};
use linkbridge_quality::QualityConfig;
use linkbridge_test_utils::{
    request, ArticleBuilder, Fixture, FixtureIngestor, FixtureSerp, ScriptedGenerator,
    ANCHOR_LABEL, FINANCE_PARAGRAPH, PUBLISHER, SUBTOPICS, TARGET_URL,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;

use PipelineState::{Abort, Deliver, Preflight, Qc, Receive, Rescue, Write};

const RHS_NAME: &str = "Royal Horticultural Society";
const RHS_URL: &str = "https://www.rhs.org.uk/soil";

fn controller(fixture: &Fixture, config: LinkbridgeConfig) -> PipelineController {
    PipelineController::new(
        Arc::new(config),
        fixture.collaborators(),
        ProviderLimits::new(4, 2),
    )
}

async fn run(fixture: &Fixture) -> JobResult {
    run_with(fixture, LinkbridgeConfig::default()).await
}

async fn run_with(fixture: &Fixture, config: LinkbridgeConfig) -> JobResult {
    controller(fixture, config)
        .run(request(), &CancelToken::new())
        .await
}

fn steps(result: &JobResult) -> Vec<(PipelineState, PipelineState)> {
    result.transitions.iter().map(|t| (t.from, t.to)).collect()
}

fn actions(result: &JobResult) -> Vec<(AutoFixAction, bool)> {
    result
        .autofix_log
        .iter()
        .map(|entry| (entry.action, entry.success))
        .collect()
}

/// Default configuration with no registry sources to cite
fn without_registry() -> LinkbridgeConfig {
    LinkbridgeConfig::default().with_quality(QualityConfig {
        trust_registry: Vec::new(),
        ..QualityConfig::default()
    })
}

#[tokio::test]
async fn clean_draft_is_delivered_without_rescue() {
    let fixture = Fixture::passing();
    let result = run(&fixture).await;

    assert!(result.delivered(), "{:?}", result.abort);
    assert_eq!(
        steps(&result),
        vec![(Receive, Preflight), (Preflight, Write), (Write, Qc), (Qc, Deliver)]
    );
    let report = result.report.as_ref().unwrap();
    assert_eq!(report.status(), QualityStatus::Pass, "{:?}", report.issues());
    assert_eq!(result.rescue_attempts, 0);
    assert!(!result.human_signoff_required);
    assert!(result.autofix_log.is_empty());

    let recommendation = result.recommendation.as_ref().unwrap();
    assert_eq!(recommendation.bridge, BridgeType::Strong);
    assert!((recommendation.niche_overlap - 0.8).abs() < 1e-9);

    assert_eq!(fixture.ingestor.calls(), 3);
    assert_eq!(
        fixture.serp.queries(),
        vec!["raised bed soil", "raised bed soil mix", "soil mix", "organic compost"]
    );
    assert_eq!(fixture.generator.calls(), 1);
}

#[tokio::test]
async fn execution_log_mirrors_transitions_and_detects_tampering() {
    let result = run(&Fixture::passing()).await;

    assert_eq!(result.execution_log.len(), result.transitions.len());
    verify_entries(&result.execution_log).unwrap();
    let preflight = &result.execution_log[1];
    assert_eq!((preflight.from, preflight.to), (Preflight, Write));
    assert_eq!(preflight.decision["bridge"], "strong");
    assert_eq!(preflight.decision["main_query"], "raised bed soil");

    let mut tampered = result.execution_log.clone();
    tampered[1].decision["bridge"] = "wrapper".into();
    assert_eq!(
        verify_entries(&tampered).unwrap_err(),
        PipelineError::LogIntegrity { sequence: 1 }
    );
}

#[tokio::test]
async fn missing_trust_source_blocks_for_human_review() {
    let fixture = Fixture::new(ScriptedGenerator::replying(
        ArticleBuilder::new().without_trust_link().build(),
    ));
    let result = run(&fixture).await;

    assert_eq!(result.final_state, Abort);
    let abort = result.abort.as_ref().unwrap();
    assert_eq!(abort.kind, AbortKind::QualityBlocked);
    assert_eq!(abort.stage, Qc);
    assert!(abort.message.contains(Criterion::TrustSourceCount.as_str()), "{}", abort.message);
    assert!(!abort.evidence.is_empty());
    assert!(result.human_signoff_required);
    assert_eq!(result.rescue_attempts, 0);
    assert_eq!(result.report.as_ref().unwrap().status(), QualityStatus::Blocked);
    assert!(result.artifact.is_some());
}

#[tokio::test]
async fn short_draft_is_blocked_not_rescued() {
    let fixture = Fixture::new(ScriptedGenerator::replying(
        ArticleBuilder::new().words(200).build(),
    ));
    let result = run(&fixture).await;

    assert_eq!(result.abort_kind(), Some(AbortKind::QualityBlocked));
    assert!(result
        .report
        .as_ref()
        .unwrap()
        .has_criterion(Criterion::WordCount));
    assert!(result.autofix_log.is_empty());
}

#[tokio::test]
async fn anchor_in_heading_is_rescued_once() {
    // three of the six required terms, none near the heading anchor
    let fixture = Fixture::new(ScriptedGenerator::replying(
        ArticleBuilder::new()
            .anchor_in_heading()
            .lsi_terms(&SUBTOPICS[..6])
            .build(),
    ));
    let result = run(&fixture).await;

    assert!(result.delivered(), "{:?}", result.abort);
    assert_eq!(
        steps(&result),
        vec![
            (Receive, Preflight),
            (Preflight, Write),
            (Write, Qc),
            (Qc, Rescue),
            (Rescue, Qc),
            (Qc, Deliver),
        ]
    );
    assert_eq!(result.rescue_attempts, 1);
    assert_eq!(
        actions(&result),
        vec![
            (AutoFixAction::RelocateAnchor, true),
            (AutoFixAction::InjectLsiTerms, true),
        ]
    );
    assert_eq!(result.report.as_ref().unwrap().status(), QualityStatus::Pass);

    let text = result.artifact.as_ref().unwrap().text();
    assert!(text.contains("## Choosing a raised bed soil mix\n"));
    assert!(text.contains(&format!("Learn more about [{ANCHOR_LABEL}]({TARGET_URL})")));
    assert!(text.contains("(see also: companion planting, lumber choice, pest control)"));
    assert_eq!(fixture.generator.calls(), 1);
}

#[tokio::test]
async fn finance_content_gets_its_disclaimer() {
    let fixture = Fixture::new(ScriptedGenerator::replying(
        ArticleBuilder::new().paragraph(FINANCE_PARAGRAPH).build(),
    ));
    let result = run(&fixture).await;

    assert!(result.delivered(), "{:?}", result.abort);
    assert_eq!(actions(&result), vec![(AutoFixAction::AppendDisclaimer, true)]);
    let text = result.artifact.as_ref().unwrap().text();
    assert!(text.trim_end().ends_with(
        "_This article is for general information only and is not financial advice._"
    ));
    assert_eq!(result.report.as_ref().unwrap().status(), QualityStatus::Pass);
}

#[tokio::test]
async fn autofix_without_effect_is_a_loop() {
    let fixture = Fixture::new(ScriptedGenerator::replying(
        ArticleBuilder::new().trust_link(RHS_NAME, RHS_URL).build(),
    ));
    let result = run_with(&fixture, without_registry()).await;

    let abort = result.abort.as_ref().unwrap();
    assert_eq!(abort.kind, AbortKind::LoopDetected);
    assert_eq!(abort.stage, Rescue);
    assert!(abort.evidence[0].starts_with("content_hash: "));
    assert!(result.human_signoff_required);
    assert_eq!(result.rescue_attempts, 1);
    assert_eq!(actions(&result), vec![(AutoFixAction::InjectTrustSource, false)]);
    assert_eq!(steps(&result).last(), Some(&(Rescue, Abort)));
}

#[tokio::test]
async fn second_rescue_is_never_attempted() {
    let fixture = Fixture::new(ScriptedGenerator::replying(
        ArticleBuilder::new()
            .trust_link(RHS_NAME, RHS_URL)
            .paragraph(FINANCE_PARAGRAPH)
            .build(),
    ));
    let result = run_with(&fixture, without_registry()).await;

    assert!(result.delivered(), "{:?}", result.abort);
    assert_eq!(result.rescue_attempts, 1);
    let report = result.report.as_ref().unwrap();
    assert_eq!(report.status(), QualityStatus::PassWithAutofix);
    assert!(report.has_criterion(Criterion::TrustSourceTier));
    assert!(!report.has_criterion(Criterion::ComplianceDisclaimer));
    assert!(!result.human_signoff_required);
    assert_eq!(
        actions(&result),
        vec![
            (AutoFixAction::InjectTrustSource, false),
            (AutoFixAction::AppendDisclaimer, true),
        ]
    );
    assert_eq!(steps(&result).iter().filter(|(_, to)| *to == Qc).count(), 2);
}

#[tokio::test]
async fn zero_rescue_budget_delivers_with_warnings() {
    let fixture = Fixture::new(ScriptedGenerator::replying(
        ArticleBuilder::new().paragraph(FINANCE_PARAGRAPH).build(),
    ));
    let config = LinkbridgeConfig::default()
        .with_pipeline(PipelineConfig::default().with_rescue_limit(0));
    let result = run_with(&fixture, config).await;

    assert!(result.delivered());
    assert_eq!(result.rescue_attempts, 0);
    assert_eq!(
        result.report.as_ref().unwrap().status(),
        QualityStatus::PassWithAutofix
    );
}

#[tokio::test]
async fn invalid_target_url_aborts_before_any_call() {
    let fixture = Fixture::passing();
    let request = JobRequest::new(PUBLISHER, "ftp://greenroot-supply.com/soil", ANCHOR_LABEL);
    let result = controller(&fixture, LinkbridgeConfig::default())
        .run(request, &CancelToken::new())
        .await;

    let abort = result.abort.as_ref().unwrap();
    assert_eq!(abort.kind, AbortKind::InputValidation);
    assert_eq!(abort.stage, Receive);
    assert_eq!(steps(&result), vec![(Receive, Abort)]);
    assert_eq!(fixture.ingestor.calls(), 0);
    assert!(result.verdict.is_none());
    verify_entries(&result.execution_log).unwrap();
}

#[tokio::test]
async fn unparseable_page_is_not_retried() {
    let fixture = Fixture::passing().with_ingestor(FixtureIngestor::failing(
        CollaboratorError::Parse {
            url: TARGET_URL.into(),
            reason: "no main content".into(),
        },
    ));
    let result = run(&fixture).await;

    let abort = result.abort.as_ref().unwrap();
    assert_eq!(abort.kind, AbortKind::Collaborator);
    assert_eq!(abort.stage, Preflight);
    assert!(abort.evidence.contains(&"retryable: false".to_string()));
    assert!(abort.evidence.contains(&"role: target".to_string()));
    assert_eq!(fixture.ingestor.calls(), 1);
    assert_eq!(fixture.generator.calls(), 0);
}

#[tokio::test]
async fn empty_search_results_abort_preflight() {
    let fixture = Fixture::passing().with_serp(FixtureSerp::without_results());
    let result = run(&fixture).await;

    assert_eq!(result.abort_kind(), Some(AbortKind::Collaborator));
    assert_eq!(result.abort.as_ref().unwrap().stage, Preflight);
    assert_eq!(fixture.generator.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn transient_generation_failure_is_retried() {
    let fixture = Fixture::new(
        ScriptedGenerator::replying(ArticleBuilder::new().build())
            .then(Err(CollaboratorError::Generation("upstream 503".into()))),
    );
    let result = run(&fixture).await;

    assert!(result.delivered(), "{:?}", result.abort);
    assert_eq!(fixture.generator.calls(), 2);
    assert_eq!(result.rescue_attempts, 0);
}

#[tokio::test(start_paused = true)]
async fn exhausted_retries_abort_write() {
    let failure = || Err(CollaboratorError::Generation("upstream 503".into()));
    let fixture = Fixture::new(
        ScriptedGenerator::default()
            .then(failure())
            .then(failure())
            .then(failure()),
    );
    let result = run(&fixture).await;

    let abort = result.abort.as_ref().unwrap();
    assert_eq!(abort.kind, AbortKind::Collaborator);
    assert_eq!(abort.stage, Write);
    assert!(abort.evidence.contains(&"retryable: true".to_string()));
    assert_eq!(fixture.generator.calls(), 3);
    assert!(result.artifact.is_none());
}

#[tokio::test(start_paused = true)]
async fn slow_generator_times_out_after_each_attempt() {
    let fixture = Fixture::new(
        ScriptedGenerator::replying(ArticleBuilder::new().build())
            .with_delay(Duration::from_secs(60)),
    );
    let config = LinkbridgeConfig::default().with_pipeline(
        PipelineConfig::default()
            .with_call_timeout(Duration::from_secs(5))
            .with_retry(RetryPolicy::default().with_max_attempts(2)),
    );
    let result = run_with(&fixture, config).await;

    let abort = result.abort.as_ref().unwrap();
    assert_eq!(abort.kind, AbortKind::Collaborator);
    assert!(abort.message.contains("timed out"), "{}", abort.message);
    assert_eq!(fixture.generator.calls(), 2);
    assert_eq!(fixture.generator.max_in_flight(), 1);
}

/// Cancels the job while its draft is being written
struct CancellingGenerator {
    inner: ScriptedGenerator,
    token: CancelToken,
}

#[async_trait::async_trait]
impl ContentGenerator for CancellingGenerator {
    async fn generate(
        &self,
        constraints: &GenerationConstraints,
        context: &ContextBundle,
    ) -> Result<GeneratedArtifact, CollaboratorError> {
        self.token.cancel();
        self.inner.generate(constraints, context).await
    }
}

#[tokio::test]
async fn cancellation_stops_at_the_next_state_boundary() {
    let fixture = Fixture::passing();
    let token = CancelToken::new();
    let collaborators = Collaborators::new(
        fixture.ingestor.clone(),
        fixture.serp.clone(),
        Arc::new(CancellingGenerator {
            inner: ScriptedGenerator::replying(ArticleBuilder::new().build()),
            token: token.clone(),
        }),
    );
    let controller = PipelineController::new(
        Arc::new(LinkbridgeConfig::default()),
        collaborators,
        ProviderLimits::new(4, 2),
    );
    let result = controller.run(request(), &token).await;

    let abort = result.abort.as_ref().unwrap();
    assert_eq!(abort.kind, AbortKind::Cancelled);
    assert_eq!(abort.stage, Qc);
    // the in-flight call completed, its draft is kept
    assert!(result.artifact.is_some());
    assert!(result.report.is_none());
    assert_eq!(steps(&result).last(), Some(&(Qc, Abort)));
}

#[tokio::test]
async fn cancelled_before_start_touches_nothing() {
    let fixture = Fixture::passing();
    let token = CancelToken::new();
    token.cancel();
    let result = controller(&fixture, LinkbridgeConfig::default())
        .run(request(), &token)
        .await;

    assert_eq!(result.abort_kind(), Some(AbortKind::Cancelled));
    assert_eq!(steps(&result), vec![(Receive, Abort)]);
    assert_eq!(fixture.ingestor.calls(), 0);
}
