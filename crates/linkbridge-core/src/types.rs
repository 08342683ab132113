//! Job-level types: requests, context handed to the generator, results

use crate::log::LogEntry;
use crate::state::{PipelineState, Transition};
use linkbridge_model::{
    AlignmentVerdict, AutoFixEntry, BridgeRecommendation, GeneratedArtifact, ProfileSet,
    QualityReport, SerpEvidence,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;

/// Job identifier (ULID, sortable by creation time)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct JobId(pub Ulid);

impl JobId {
    /// Generate a new identifier
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for JobId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ulid::from_string(s).map(Self)
    }
}

/// The three raw inputs of a job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRequest {
    /// Job identifier
    pub id: JobId,
    /// Publication site domain
    pub publisher: String,
    /// Destination URL
    pub target_url: String,
    /// Proposed link label
    pub anchor_label: String,
}

impl JobRequest {
    /// New request with a fresh id
    #[must_use]
    pub fn new(
        publisher: impl Into<String>,
        target_url: impl Into<String>,
        anchor_label: impl Into<String>,
    ) -> Self {
        Self {
            id: JobId::new(),
            publisher: publisher.into(),
            target_url: target_url.into(),
            anchor_label: anchor_label.into(),
        }
    }

    /// With a fixed id
    #[inline]
    #[must_use]
    pub fn with_id(mut self, id: JobId) -> Self {
        self.id = id;
        self
    }
}

/// Everything the generator receives besides the constraints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextBundle {
    /// Job identifier
    pub job_id: JobId,
    /// Target, publisher and anchor profiles
    pub profiles: ProfileSet,
    /// Alignment verdict
    pub verdict: AlignmentVerdict,
    /// Chosen bridge with rationale and angles
    pub recommendation: BridgeRecommendation,
    /// Aggregated search evidence
    pub serp: SerpEvidence,
}

impl ContextBundle {
    /// Subtopics the article must cover
    #[inline]
    #[must_use]
    pub fn required_subtopics(&self) -> &[String] {
        &self.recommendation.required_subtopics
    }
}

/// Why a job stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbortKind {
    /// Malformed input, no collaborator was called
    InputValidation,
    /// Collaborator failed permanently or exhausted its retries
    Collaborator,
    /// Quality gate found a blocking issue
    QualityBlocked,
    /// Rescue produced no observable change
    LoopDetected,
    /// Cancelled between states
    Cancelled,
    /// Controller invariant violated
    Internal,
}

impl AbortKind {
    /// Stable label
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InputValidation => "input_validation",
            Self::Collaborator => "collaborator",
            Self::QualityBlocked => "quality_blocked",
            Self::LoopDetected => "loop_detected",
            Self::Cancelled => "cancelled",
            Self::Internal => "internal",
        }
    }
}

impl fmt::Display for AbortKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured abort record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbortReason {
    /// Category
    pub kind: AbortKind,
    /// State the job was in when it stopped
    pub stage: PipelineState,
    /// Human-readable summary
    pub message: String,
    /// Supporting detail (issue descriptions, hashes, errors)
    pub evidence: Vec<String>,
}

impl AbortReason {
    /// Create without evidence
    #[must_use]
    pub fn new(kind: AbortKind, stage: PipelineState, message: impl Into<String>) -> Self {
        Self {
            kind,
            stage,
            message: message.into(),
            evidence: Vec::new(),
        }
    }

    /// With evidence lines
    #[must_use]
    pub fn with_evidence<I, S>(mut self, evidence: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.evidence = evidence.into_iter().map(Into::into).collect();
        self
    }
}

/// Outcome of one job, handed to storage or API layers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobResult {
    /// Job identifier
    pub job_id: JobId,
    /// `DELIVER` or `ABORT`
    pub final_state: PipelineState,
    /// Last quality report, if QC ran
    pub report: Option<QualityReport>,
    /// Last draft, if one was written
    pub artifact: Option<GeneratedArtifact>,
    /// Alignment verdict, if preflight completed
    pub verdict: Option<AlignmentVerdict>,
    /// Bridge recommendation, if preflight completed
    pub recommendation: Option<BridgeRecommendation>,
    /// Set when the job aborted
    pub abort: Option<AbortReason>,
    /// A human must review before anything is published
    pub human_signoff_required: bool,
    /// Rescue passes used (0 or 1)
    pub rescue_attempts: u8,
    /// Remediations applied during rescue
    pub autofix_log: Vec<AutoFixEntry>,
    /// State transitions in order
    pub transitions: Vec<Transition>,
    /// Hash-chained audit log
    pub execution_log: Vec<LogEntry>,
}

impl JobResult {
    /// Job ended in `DELIVER`
    #[inline]
    #[must_use]
    pub fn delivered(&self) -> bool {
        self.final_state == PipelineState::Deliver
    }

    /// Abort category, if the job aborted
    #[inline]
    #[must_use]
    pub fn abort_kind(&self) -> Option<AbortKind> {
        self.abort.as_ref().map(|reason| reason.kind)
    }

    /// Result for a job whose task died before producing one
    #[must_use]
    pub fn internal_failure(job_id: JobId, message: impl Into<String>) -> Self {
        Self {
            job_id,
            final_state: PipelineState::Abort,
            report: None,
            artifact: None,
            verdict: None,
            recommendation: None,
            abort: Some(AbortReason::new(
                AbortKind::Internal,
                PipelineState::Receive,
                message,
            )),
            human_signoff_required: true,
            rescue_attempts: 0,
            autofix_log: Vec::new(),
            transitions: Vec::new(),
            execution_log: Vec::new(),
        }
    }
}
