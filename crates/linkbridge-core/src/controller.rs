//! Pipeline controller
//!
//! Drives one job through `RECEIVE -> PREFLIGHT -> WRITE -> QC -> {DELIVER,
//! RESCUE, ABORT}`. States run strictly one after another. Every transition
//! goes through the static table in [`crate::state`] and is appended to the
//! job's hash-chained [`ExecutionLog`].
//!
//! # Terminal outcomes
//!
//! [`PipelineController::run`] never fails. Input errors, collaborator
//! failures, blocked quality reports, rescue loops and cancellation all end
//! in `ABORT` with a structured [`AbortReason`].
//!
//! # Cancellation
//!
//! The [`CancelToken`] is checked at the top of every state, so an in-flight
//! collaborator call always completes before the job stops.

use crate::collaborators::Collaborators;
use crate::config::LinkbridgeConfig;
use crate::error::{CollaboratorError, PipelineError};
use crate::limiter::ProviderLimits;
use crate::log::ExecutionLog;
use crate::retry::RetryPolicy;
use crate::state::{JobState, PipelineState};
use crate::types::{AbortKind, AbortReason, ContextBundle, JobId, JobRequest, JobResult};
use crate::validation::validate_request;
use linkbridge_alignment::{
    AlignmentModeler, AlignmentOutcome, EvidenceAggregator, GenerationConstraintBuilder,
    QueryPlan, QueryPlanner,
};
use linkbridge_model::{
    AutoFixEntry, GeneratedArtifact, GenerationConstraints, ProfileRole, ProfileSet,
    QualityReport, QualityStatus, QueryResults, SerpEvidence, SourceProfile,
};
use linkbridge_quality::{AutoFixController, QualityGate};
use serde_json::json;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::Instrument;

/// Cooperative cancellation flag shared between a caller and a running job
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Fresh, not cancelled
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; the job stops at its next state boundary
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Cancellation was requested
    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Everything PREFLIGHT produces for the later states
#[derive(Debug, Clone)]
struct Preflight {
    profiles: ProfileSet,
    serp: SerpEvidence,
    outcome: AlignmentOutcome,
    constraints: GenerationConstraints,
}

/// Mutable per-job state, owned by a single run
struct Run {
    job: JobState,
    log: ExecutionLog,
    preflight: Option<Preflight>,
    artifact: Option<GeneratedArtifact>,
    report: Option<QualityReport>,
    autofix_log: Vec<AutoFixEntry>,
}

impl Run {
    fn new(job_id: JobId, rescue_limit: u8) -> Self {
        Self {
            job: JobState::new(job_id, rescue_limit),
            log: ExecutionLog::new(),
            preflight: None,
            artifact: None,
            report: None,
            autofix_log: Vec::new(),
        }
    }

    fn state(&self) -> PipelineState {
        self.job.state()
    }

    /// Apply a transition and audit it
    fn advance(
        &mut self,
        to: PipelineState,
        decision: serde_json::Value,
    ) -> Result<(), AbortReason> {
        let from = self.state();
        self.job
            .transition(to)
            .map_err(|err| internal(from, &err))?;
        self.log.append(self.job.job_id(), from, to, decision);
        tracing::info!(job_id = %self.job.job_id(), %from, %to, "state transition");
        Ok(())
    }

    fn preflight(&self) -> Result<&Preflight, AbortReason> {
        self.preflight
            .as_ref()
            .ok_or_else(|| missing(self.state(), "preflight results"))
    }

    fn artifact(&self) -> Result<&GeneratedArtifact, AbortReason> {
        self.artifact
            .as_ref()
            .ok_or_else(|| missing(self.state(), "draft"))
    }

    fn abort(mut self, reason: AbortReason) -> JobResult {
        let from = self.state();
        match self.job.transition(PipelineState::Abort) {
            Ok(_) => {
                self.log.append(
                    self.job.job_id(),
                    from,
                    PipelineState::Abort,
                    json!({
                        "kind": reason.kind.as_str(),
                        "stage": reason.stage.as_str(),
                        "message": reason.message,
                        "evidence": reason.evidence,
                    }),
                );
            }
            Err(err) => {
                tracing::error!(job_id = %self.job.job_id(), %from, error = %err, "abort transition refused");
            }
        }
        tracing::warn!(
            job_id = %self.job.job_id(),
            kind = reason.kind.as_str(),
            stage = %reason.stage,
            "job aborted: {}",
            reason.message
        );
        self.finish(Some(reason))
    }

    fn finish(self, abort: Option<AbortReason>) -> JobResult {
        if let Err(err) = self.log.verify_integrity() {
            tracing::error!(job_id = %self.job.job_id(), error = %err, "execution log broken");
        }
        let kind_needs_human = abort.as_ref().is_some_and(|reason| {
            matches!(reason.kind, AbortKind::QualityBlocked | AbortKind::LoopDetected)
        });
        let report_needs_human = self
            .report
            .as_ref()
            .is_some_and(QualityReport::human_signoff_required);
        let (verdict, recommendation) = match self.preflight {
            Some(p) => (Some(p.outcome.verdict), Some(p.outcome.recommendation)),
            None => (None, None),
        };
        JobResult {
            job_id: self.job.job_id(),
            final_state: self.job.state(),
            report: self.report,
            artifact: self.artifact,
            verdict,
            recommendation,
            abort,
            human_signoff_required: kind_needs_human || report_needs_human,
            rescue_attempts: self.job.rescue_attempts(),
            autofix_log: self.autofix_log,
            transitions: self.job.history().to_vec(),
            execution_log: self.log.into_entries(),
        }
    }
}

fn internal(stage: PipelineState, err: &PipelineError) -> AbortReason {
    AbortReason::new(AbortKind::Internal, stage, err.to_string())
}

fn missing(stage: PipelineState, what: &str) -> AbortReason {
    AbortReason::new(
        AbortKind::Internal,
        stage,
        format!("{what} missing in state {stage}"),
    )
}

fn collaborator_failure(stage: PipelineState, call: &str, err: &CollaboratorError) -> AbortReason {
    AbortReason::new(AbortKind::Collaborator, stage, format!("{call} failed: {err}"))
        .with_evidence([
            format!("call: {call}"),
            format!("error: {err}"),
            format!("retryable: {}", err.is_retryable()),
        ])
}

/// Drives jobs through the pipeline
///
/// Holds only read-only configuration, the collaborators and the shared
/// provider limits, so one controller can serve any number of concurrent
/// jobs.
#[derive(Debug, Clone)]
pub struct PipelineController {
    config: Arc<LinkbridgeConfig>,
    collaborators: Collaborators,
    limits: ProviderLimits,
    planner: QueryPlanner,
    aggregator: EvidenceAggregator,
    modeler: AlignmentModeler,
    builder: GenerationConstraintBuilder,
    gate: QualityGate,
}

impl PipelineController {
    /// Create a controller with rule-based classifiers
    #[must_use]
    pub fn new(
        config: Arc<LinkbridgeConfig>,
        collaborators: Collaborators,
        limits: ProviderLimits,
    ) -> Self {
        let alignment = &config.alignment;
        Self {
            planner: QueryPlanner::new(alignment.max_cluster_queries),
            aggregator: EvidenceAggregator::new(alignment.top_results),
            modeler: AlignmentModeler::new(alignment.clone()),
            builder: GenerationConstraintBuilder::new(alignment.clone()),
            gate: QualityGate::new(config.quality.clone()),
            config,
            collaborators,
            limits,
        }
    }

    /// Replace the quality gate (e.g. one with model-backed classifiers)
    #[inline]
    #[must_use]
    pub fn with_gate(mut self, gate: QualityGate) -> Self {
        self.gate = gate;
        self
    }

    /// Configuration in use
    #[inline]
    #[must_use]
    pub fn config(&self) -> &LinkbridgeConfig {
        &self.config
    }

    /// Run one job to a terminal state
    pub async fn run(&self, request: JobRequest, cancel: &CancelToken) -> JobResult {
        let span = tracing::info_span!("job", job_id = %request.id);
        self.drive(&request, cancel).instrument(span).await
    }

    async fn drive(&self, request: &JobRequest, cancel: &CancelToken) -> JobResult {
        let mut run = Run::new(request.id, self.config.pipeline.rescue_limit);
        tracing::info!(publisher = %request.publisher, target = %request.target_url, "job received");

        loop {
            let state = run.state();
            if state == PipelineState::Deliver {
                tracing::info!(
                    rescue_attempts = run.job.rescue_attempts(),
                    score = run.report.as_ref().map(QualityReport::score),
                    "job delivered"
                );
                return run.finish(None);
            }
            if cancel.is_cancelled() {
                return run.abort(AbortReason::new(
                    AbortKind::Cancelled,
                    state,
                    format!("cancelled before {state}"),
                ));
            }

            let step = match state {
                PipelineState::Receive => Self::receive(&mut run, request),
                PipelineState::Preflight => self.preflight(&mut run, request).await,
                PipelineState::Write => self.write(&mut run).await,
                PipelineState::Qc => self.quality_check(&mut run),
                PipelineState::Rescue => self.rescue(&mut run),
                PipelineState::Deliver | PipelineState::Abort => Err(AbortReason::new(
                    AbortKind::Internal,
                    state,
                    format!("no handler for terminal state {state}"),
                )),
            };
            if let Err(reason) = step {
                return run.abort(reason);
            }
        }
    }

    fn receive(run: &mut Run, request: &JobRequest) -> Result<(), AbortReason> {
        if let Err(err) = validate_request(request) {
            return Err(AbortReason::new(
                AbortKind::InputValidation,
                PipelineState::Receive,
                err.to_string(),
            )
            .with_evidence([
                format!("publisher: {}", request.publisher),
                format!("target_url: {}", request.target_url),
                format!("anchor_label: {}", request.anchor_label),
            ]));
        }
        run.advance(
            PipelineState::Preflight,
            json!({
                "publisher": request.publisher,
                "target_url": request.target_url,
                "anchor_label": request.anchor_label.trim(),
            }),
        )
    }

    async fn preflight(&self, run: &mut Run, request: &JobRequest) -> Result<(), AbortReason> {
        let stage = PipelineState::Preflight;
        let target = self.ingest(ProfileRole::Target, &request.target_url).await?;
        let publisher = self.ingest(ProfileRole::Publisher, &request.publisher).await?;
        let anchor = self
            .ingest(ProfileRole::Anchor, request.anchor_label.trim())
            .await?;
        let profiles = ProfileSet::new(target, publisher, anchor);

        let plan = self.planner.plan(&profiles).map_err(|err| {
            AbortReason::new(AbortKind::Collaborator, stage, err.to_string())
        })?;
        let queries = plan.all();
        let results = {
            let serp = &self.collaborators.serp;
            let queries = &queries;
            self.call("research", Some(self.limits.search()), move || {
                serp.research(queries)
            })
            .await
            .map_err(|err| collaborator_failure(stage, "research", &err))?
        };
        let (main, clusters) = split_results(&plan, results).ok_or_else(|| {
            AbortReason::new(
                AbortKind::Collaborator,
                stage,
                "search provider returned no result sets",
            )
        })?;
        let serp = self
            .aggregator
            .aggregate_all(&main, &clusters)
            .map_err(|err| {
                AbortReason::new(AbortKind::Collaborator, stage, err.to_string())
                    .with_evidence([format!("main query: {}", plan.main)])
            })?;

        let outcome = self.modeler.model(&profiles, &serp);
        let constraints = self
            .builder
            .build(&outcome.recommendation, &profiles, &serp);

        let decision = json!({
            "main_query": plan.main,
            "cluster_queries": plan.clusters,
            "confidence": outcome.confidence.as_str(),
            "overall": outcome.verdict.overall().as_str(),
            "anchor_vs_serp": outcome.verdict.anchor_vs_serp().as_str(),
            "target_vs_serp": outcome.verdict.target_vs_serp().as_str(),
            "publisher_vs_serp": outcome.verdict.publisher_vs_serp().as_str(),
            "niche_overlap": outcome.recommendation.niche_overlap,
            "bridge": outcome.recommendation.bridge.as_str(),
            "rationale": outcome.recommendation.rationale,
            "required_subtopics": outcome.recommendation.required_subtopics,
            "trust_min": constraints.trust.min,
            "lsi_min": constraints.lsi.min,
            "min_words": constraints.min_words,
        });
        run.preflight = Some(Preflight {
            profiles,
            serp,
            outcome,
            constraints,
        });
        run.advance(PipelineState::Write, decision)
    }

    async fn write(&self, run: &mut Run) -> Result<(), AbortReason> {
        let stage = PipelineState::Write;
        let preflight = run.preflight()?;
        let context = ContextBundle {
            job_id: run.job.job_id(),
            profiles: preflight.profiles.clone(),
            verdict: preflight.outcome.verdict.clone(),
            recommendation: preflight.outcome.recommendation.clone(),
            serp: preflight.serp.clone(),
        };
        let artifact = {
            let generator = &self.collaborators.generator;
            let constraints = &preflight.constraints;
            let context = &context;
            self.call("generate", Some(self.limits.generation()), move || {
                generator.generate(constraints, context)
            })
            .await
            .map_err(|err| collaborator_failure(stage, "generate", &err))?
        };

        let hash = artifact.content_hash();
        run.job.record_hash(hash);
        let decision = json!({
            "content_hash": hash.to_string(),
            "word_count": artifact.word_count(),
            "anchor_links": artifact.anchor_links().count(),
        });
        run.artifact = Some(artifact);
        run.advance(PipelineState::Qc, decision)
    }

    fn quality_check(&self, run: &mut Run) -> Result<(), AbortReason> {
        let stage = PipelineState::Qc;
        let preflight = run.preflight()?;
        let report = self.gate.evaluate(
            run.artifact()?,
            &preflight.constraints,
            &preflight.outcome.verdict,
        );
        let status = report.status();
        let criteria: Vec<&str> = report.issues().iter().map(|i| i.criterion.as_str()).collect();
        tracing::info!(status = %status, score = report.score(), issues = criteria.len(), "quality gate evaluated");

        let next = match status {
            QualityStatus::Pass => PipelineState::Deliver,
            QualityStatus::PassWithAutofix if run.job.rescue_available() => PipelineState::Rescue,
            QualityStatus::PassWithAutofix => {
                tracing::warn!(
                    rescue_attempts = run.job.rescue_attempts(),
                    "rescue budget spent, delivering with warnings"
                );
                PipelineState::Deliver
            }
            QualityStatus::Blocked => {
                let evidence: Vec<String> = report
                    .issues()
                    .iter()
                    .map(|issue| {
                        format!(
                            "{} [{:?}]: {}",
                            issue.criterion, issue.severity, issue.description
                        )
                    })
                    .collect();
                let blocking: Vec<&str> = report
                    .blocking_issues()
                    .map(|issue| issue.criterion.as_str())
                    .collect();
                tracing::warn!(blocking = ?blocking, "quality gate blocked the draft");
                run.report = Some(report);
                return Err(AbortReason::new(
                    AbortKind::QualityBlocked,
                    stage,
                    format!("blocked by {}", blocking.join(", ")),
                )
                .with_evidence(evidence));
            }
        };

        let decision = json!({
            "status": status.as_str(),
            "score": report.score(),
            "issues": criteria,
            "rescue_attempts": run.job.rescue_attempts(),
        });
        run.report = Some(report);
        run.advance(next, decision)
    }

    fn rescue(&self, run: &mut Run) -> Result<(), AbortReason> {
        let stage = PipelineState::Rescue;
        let preflight = run.preflight()?;
        let report = run
            .report
            .as_ref()
            .ok_or_else(|| missing(stage, "quality report"))?;
        let outcome = AutoFixController::new(&self.gate)
            .apply(
                run.artifact()?,
                &preflight.constraints,
                &preflight.outcome.verdict,
                report,
            )
            .map_err(|err| AbortReason::new(AbortKind::Internal, stage, err.to_string()))?;

        let applied: Vec<String> = outcome
            .log
            .iter()
            .map(|entry| format!("{} ({}): success={}", entry.action, entry.criterion, entry.success))
            .collect();
        run.autofix_log.extend(outcome.log.iter().cloned());

        if !outcome.changed() {
            tracing::warn!(hash = %outcome.before.short(), "autofix left the draft unchanged");
            return Err(AbortReason::new(
                AbortKind::LoopDetected,
                stage,
                "autofix produced no observable change",
            )
            .with_evidence(
                std::iter::once(format!("content_hash: {}", outcome.before)).chain(applied),
            ));
        }
        if !run.job.record_hash(outcome.after) {
            tracing::warn!(hash = %outcome.after.short(), "autofix reproduced an earlier draft");
            return Err(AbortReason::new(
                AbortKind::LoopDetected,
                stage,
                "autofix reproduced an earlier draft",
            )
            .with_evidence(
                std::iter::once(format!("content_hash: {}", outcome.after)).chain(applied),
            ));
        }

        let decision = json!({
            "before": outcome.before.to_string(),
            "after": outcome.after.to_string(),
            "actions": applied,
            "status_after": outcome.report.status().as_str(),
        });
        run.artifact = Some(outcome.artifact);
        run.report = Some(outcome.report);
        run.advance(PipelineState::Qc, decision)
    }

    async fn ingest(&self, role: ProfileRole, input: &str) -> Result<SourceProfile, AbortReason> {
        let ingestor = &self.collaborators.ingestor;
        let profile = self
            .call("profile", None, move || ingestor.profile(role, input))
            .await
            .map_err(|err| {
                let mut reason = collaborator_failure(PipelineState::Preflight, "profile", &err);
                reason.evidence.push(format!("role: {}", role.as_str()));
                reason.evidence.push(format!("input: {input}"));
                reason
            })?;
        tracing::debug!(role = role.as_str(), topics = profile.topics.len(), "profile ready");
        Ok(profile)
    }

    async fn call<T, F, Fut>(
        &self,
        call: &'static str,
        limiter: Option<&Semaphore>,
        op: F,
    ) -> Result<T, CollaboratorError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, CollaboratorError>>,
    {
        let pipeline = &self.config.pipeline;
        let policy: &RetryPolicy = &pipeline.retry;
        let timeout: Duration = pipeline.call_timeout();
        policy.run(call, timeout, limiter, op).await
    }
}

/// Pair the provider's result sets with the plan: the set answering the main
/// query (else the first) is main, the rest are clusters in order
fn split_results(
    plan: &QueryPlan,
    mut results: Vec<QueryResults>,
) -> Option<(QueryResults, Vec<QueryResults>)> {
    if results.is_empty() {
        return None;
    }
    let main_index = results
        .iter()
        .position(|r| r.query.trim() == plan.main.trim())
        .unwrap_or(0);
    let main = results.remove(main_index);
    Some((main, results))
}
