//! Quality issues, reports and the autofix audit trail

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How serious an issue is
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Stops delivery; needs a human
    Blocking,
    /// Should be fixed
    Warning,
    /// Informational
    Info,
}

/// Named quality criterion
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Criterion {
    /// Article shorter than the minimum
    WordCount,
    /// No link to the target
    AnchorMissing,
    /// Anchor inside a forbidden heading level
    AnchorInHeading,
    /// Anchor used more often than allowed
    AnchorRepetition,
    /// Too few LSI terms around the anchor
    LsiCount,
    /// Too few trust sources
    TrustSourceCount,
    /// No trust source of the preferred tier
    TrustSourceTier,
    /// Link to the target or a competitor cited as a source
    TrustSourceExcluded,
    /// Anchor risk above low
    AnchorRisk,
    /// Regulated vertical without its disclaimer
    ComplianceDisclaimer,
    /// Overall intent alignment is off
    IntentAlignment,
}

impl Criterion {
    /// Stable snake_case name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::WordCount => "word_count",
            Self::AnchorMissing => "anchor_missing",
            Self::AnchorInHeading => "anchor_in_heading",
            Self::AnchorRepetition => "anchor_repetition",
            Self::LsiCount => "lsi_count",
            Self::TrustSourceCount => "trust_source_count",
            Self::TrustSourceTier => "trust_source_tier",
            Self::TrustSourceExcluded => "trust_source_excluded",
            Self::AnchorRisk => "anchor_risk",
            Self::ComplianceDisclaimer => "compliance_disclaimer",
            Self::IntentAlignment => "intent_alignment",
        }
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One finding of the quality gate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityIssue {
    /// Criterion that failed
    pub criterion: Criterion,
    /// Severity
    pub severity: Severity,
    /// Whether the autofix catalog addresses it
    pub autofixable: bool,
    /// Human-readable description
    pub description: String,
}

impl QualityIssue {
    /// Blocking issue; never autofixable
    #[must_use]
    pub fn blocking(criterion: Criterion, description: impl Into<String>) -> Self {
        Self {
            criterion,
            severity: Severity::Blocking,
            autofixable: false,
            description: description.into(),
        }
    }

    /// Autofixable warning
    #[must_use]
    pub fn warning(criterion: Criterion, description: impl Into<String>) -> Self {
        Self {
            criterion,
            severity: Severity::Warning,
            autofixable: true,
            description: description.into(),
        }
    }

    /// Informational note
    #[must_use]
    pub fn info(criterion: Criterion, description: impl Into<String>) -> Self {
        Self {
            criterion,
            severity: Severity::Info,
            autofixable: false,
            description: description.into(),
        }
    }
}

/// Aggregate gate outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityStatus {
    /// No issues
    Pass,
    /// Only non-blocking issues
    PassWithAutofix,
    /// At least one blocking issue
    Blocked,
}

impl QualityStatus {
    /// Stable label
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::PassWithAutofix => "pass_with_autofix",
            Self::Blocked => "blocked",
        }
    }
}

impl fmt::Display for QualityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rule-based anchor risk
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnchorRisk {
    /// Nothing suspicious
    Low,
    /// Weak context
    Medium,
    /// Manipulative pattern
    High,
}

/// Regulated content vertical
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Vertical {
    /// Banking, lending, investing
    Finance,
    /// Medicine and wellbeing
    Health,
    /// Legal advice
    Legal,
    /// Betting and casinos
    Gambling,
    /// Cryptocurrencies
    Crypto,
}

impl Vertical {
    /// Every vertical
    pub const ALL: [Self; 5] = [
        Self::Finance,
        Self::Health,
        Self::Legal,
        Self::Gambling,
        Self::Crypto,
    ];

    /// Stable label
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Finance => "finance",
            Self::Health => "health",
            Self::Legal => "legal",
            Self::Gambling => "gambling",
            Self::Crypto => "crypto",
        }
    }
}

impl fmt::Display for Vertical {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Anchor label class, most risky first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnchorType {
    /// Label equals the primary keyword
    Exact,
    /// Generic phrase ("click here")
    Generic,
    /// Contains part of the keyword
    Partial,
    /// Contains the brand
    Branded,
}

impl AnchorType {
    /// Every type, most risky first
    pub const ALL: [Self; 4] = [Self::Exact, Self::Generic, Self::Partial, Self::Branded];

    /// Stable label
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Generic => "generic",
            Self::Partial => "partial",
            Self::Branded => "branded",
        }
    }
}

impl fmt::Display for AnchorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Measurements the gate took while checking
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QualityMetrics {
    /// Article word count
    pub word_count: usize,
    /// Anchor occurrences
    pub anchor_count: usize,
    /// Classified anchor type
    pub anchor_type: Option<AnchorType>,
    /// Distinct LSI terms in the anchor window
    pub lsi_terms: Vec<String>,
    /// Distinct countable trust-source domains
    pub trust_sources: Vec<String>,
    /// Best tier among trust sources
    pub best_tier: Option<crate::constraints::TrustTier>,
    /// Anchor risk
    pub anchor_risk: Option<AnchorRisk>,
    /// Detected regulated verticals, in [`Vertical::ALL`] order
    pub verticals: Vec<Vertical>,
}

/// Gate verdict for one artifact
///
/// Status and sign-off flag are derived from the issue list and cannot be
/// set independently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ReportParts")]
pub struct QualityReport {
    status: QualityStatus,
    issues: Vec<QualityIssue>,
    score: u32,
    human_signoff_required: bool,
    metrics: QualityMetrics,
}

#[derive(Deserialize)]
struct ReportParts {
    issues: Vec<QualityIssue>,
    score: u32,
    #[serde(default)]
    metrics: QualityMetrics,
}

impl From<ReportParts> for QualityReport {
    fn from(parts: ReportParts) -> Self {
        Self::new(parts.issues, parts.score, parts.metrics)
    }
}

impl QualityReport {
    /// Build a report; status follows from issue severities
    #[must_use]
    pub fn new(issues: Vec<QualityIssue>, score: u32, metrics: QualityMetrics) -> Self {
        let blocked = issues.iter().any(|i| i.severity == Severity::Blocking);
        let status = if blocked {
            QualityStatus::Blocked
        } else if issues.is_empty() {
            QualityStatus::Pass
        } else {
            QualityStatus::PassWithAutofix
        };
        Self {
            status,
            issues,
            score,
            human_signoff_required: blocked,
            metrics,
        }
    }

    /// Aggregate status
    #[inline]
    #[must_use]
    pub fn status(&self) -> QualityStatus {
        self.status
    }

    /// All issues in check order
    #[inline]
    #[must_use]
    pub fn issues(&self) -> &[QualityIssue] {
        &self.issues
    }

    /// Score after deductions
    #[inline]
    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    /// A human must sign off before anything ships
    #[inline]
    #[must_use]
    pub fn human_signoff_required(&self) -> bool {
        self.human_signoff_required
    }

    /// Measurements
    #[inline]
    #[must_use]
    pub fn metrics(&self) -> &QualityMetrics {
        &self.metrics
    }

    /// Blocking issues only
    pub fn blocking_issues(&self) -> impl Iterator<Item = &QualityIssue> {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Blocking)
    }

    /// Issues the autofix catalog addresses
    pub fn autofixable_issues(&self) -> impl Iterator<Item = &QualityIssue> {
        self.issues.iter().filter(|i| i.autofixable)
    }

    /// At least one issue for `criterion`
    #[must_use]
    pub fn has_criterion(&self, criterion: Criterion) -> bool {
        self.issues.iter().any(|i| i.criterion == criterion)
    }
}

/// Remediation in the fixed autofix catalog, in application order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutoFixAction {
    /// Unlink target/competitor citations, keeping their text
    UnlinkExcludedSource,
    /// Unlink anchor occurrences beyond the cap
    TrimAnchorRepeats,
    /// Link the label in the first eligible paragraph
    InsertAnchor,
    /// Move the anchor out of a forbidden heading
    RelocateAnchor,
    /// Replace the label with a lower-risk type
    SwapAnchorType,
    /// Cite registry sources near the anchor
    InjectTrustSource,
    /// Add vocabulary near the anchor
    InjectLsiTerms,
    /// Append the vertical's disclaimer
    AppendDisclaimer,
}

impl AutoFixAction {
    /// Stable label
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UnlinkExcludedSource => "unlink_excluded_source",
            Self::TrimAnchorRepeats => "trim_anchor_repeats",
            Self::InsertAnchor => "insert_anchor",
            Self::RelocateAnchor => "relocate_anchor",
            Self::SwapAnchorType => "swap_anchor_type",
            Self::InjectTrustSource => "inject_trust_source",
            Self::InjectLsiTerms => "inject_lsi_terms",
            Self::AppendDisclaimer => "append_disclaimer",
        }
    }
}

impl fmt::Display for AutoFixAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Audit record of one applied remediation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoFixEntry {
    /// Remediation applied
    pub action: AutoFixAction,
    /// Criterion it addressed
    pub criterion: Criterion,
    /// When it ran
    pub timestamp: DateTime<Utc>,
    /// Whether the text changed
    pub success: bool,
    /// What was done
    pub detail: String,
}
