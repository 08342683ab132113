//! Linkbridge shared model
//!
//! Data types exchanged between alignment modelling, the quality gate and
//! the pipeline controller.
//!
//! # Core Concepts
//!
//! - [`SourceProfile`]: immutable summary of a target, publisher or anchor
//! - [`SerpEvidence`]: per-query search intent and topical demand
//! - [`AlignmentVerdict`]: three intent axes plus their weakest link
//! - [`GenerationConstraints`]: what the content generator must satisfy
//! - [`GeneratedArtifact`]: markdown article with derived [`Outline`]
//! - [`QualityReport`]: gate verdict whose status follows its issues
//! - [`Classifier`]: heuristic labelling capability

#![warn(unreachable_pub)]

mod artifact;
mod classify;
mod constraints;
mod error;
mod evidence;
mod hash;
mod intent;
mod outline;
mod profile;
mod quality;
pub mod text;
mod verdict;

pub use artifact::GeneratedArtifact;
pub use classify::{Category, Classifier, LabelModel, ModelBackedClassifier, PromptInput};
pub use constraints::{
    AnchorPolicy, GenerationConstraints, LsiTarget, TrustRequirement, TrustTier,
    MAX_ANCHOR_REPETITIONS,
};
pub use error::ModelError;
pub use evidence::{QueryEvidence, QueryResults, SerpEvidence, SerpResult, MAX_CLUSTER_QUERIES};
pub use hash::ContentHash;
pub use intent::{Alignment, Confidence, IntentCategory};
pub use outline::{Block, BlockKind, LinkSpan, Outline, Sentence};
pub use profile::{ProfileRole, ProfileSet, SourceProfile};
pub use quality::{
    AnchorRisk, AnchorType, AutoFixAction, AutoFixEntry, Criterion, QualityIssue, QualityMetrics,
    QualityReport, QualityStatus, Severity, Vertical,
};
pub use verdict::{AlignmentVerdict, BridgeRecommendation, BridgeType};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude for common imports
pub mod prelude {
    pub use crate::{
        Alignment, AlignmentVerdict, BridgeRecommendation, BridgeType, Confidence, Criterion,
        GeneratedArtifact, GenerationConstraints, IntentCategory, ProfileRole, ProfileSet, QualityIssue,
        QualityReport, QualityStatus, SerpEvidence, Severity, SourceProfile,
    };
}
