//! Error types for the pipeline
//!
//! Errors never escape [`crate::PipelineController::run`]; each one is folded
//! into the job's [`crate::AbortReason`]. They stay typed so the controller
//! can tell a retryable collaborator failure from a permanent one.

use crate::state::PipelineState;
use linkbridge_alignment::AlignmentError;
use linkbridge_quality::QualityError;
use std::path::PathBuf;
use std::time::Duration;

/// Failure reported by an external collaborator
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CollaboratorError {
    /// Page could not be fetched
    #[error("fetch failed for {url}: {reason}")]
    Fetch {
        /// Requested page or domain
        url: String,
        /// Transport detail
        reason: String,
    },

    /// Page was fetched but could not be profiled
    #[error("could not profile {url}: {reason}")]
    Parse {
        /// Requested page or domain
        url: String,
        /// Extraction detail
        reason: String,
    },

    /// Search provider failure
    #[error("search provider error: {0}")]
    Provider(String),

    /// Content generation failure
    #[error("generation failed: {0}")]
    Generation(String),

    /// Call exceeded its deadline
    #[error("{call} timed out after {after:?}")]
    Timeout {
        /// Collaborator call name
        call: &'static str,
        /// Deadline that elapsed
        after: Duration,
    },

    /// Collaborator refused the request outright
    #[error("request rejected: {0}")]
    Rejected(String),

    /// Shared provider limiter was shut down
    #[error("provider limiter closed")]
    LimiterClosed,
}

impl CollaboratorError {
    /// A later attempt may succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Fetch { .. } | Self::Provider(_) | Self::Generation(_) | Self::Timeout { .. }
        )
    }
}

/// Malformed job input, detected before any collaborator is called
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InputValidationError {
    /// Publisher is not a domain name
    #[error("invalid publisher domain: '{0}'")]
    InvalidDomain(String),

    /// Target is not an absolute http(s) URL
    #[error("invalid target URL: '{0}'")]
    InvalidUrl(String),

    /// Anchor label is blank
    #[error("anchor label is empty")]
    EmptyLabel,

    /// Anchor label exceeds the length cap
    #[error("anchor label has {len} characters, at most {max} allowed")]
    LabelTooLong {
        /// Characters supplied
        len: usize,
        /// Cap
        max: usize,
    },

    /// Anchor label spans lines or carries markup
    #[error("anchor label contains forbidden characters: '{0}'")]
    LabelCharacters(String),
}

/// Controller invariant violations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PipelineError {
    /// Transition not in the table
    #[error("illegal transition {from} -> {to}")]
    IllegalTransition {
        /// Current state
        from: PipelineState,
        /// Requested state
        to: PipelineState,
    },

    /// A rescue was requested with no budget left
    #[error("rescue budget exhausted after {attempts} attempt(s)")]
    RescueBudgetExhausted {
        /// Attempts already made
        attempts: u8,
    },

    /// An execution log entry does not chain to its predecessor
    #[error("execution log integrity violation at entry {sequence}")]
    LogIntegrity {
        /// First broken entry
        sequence: u64,
    },
}

/// Configuration loading and validation errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("cannot read {path}: {source}")]
    Io {
        /// Offending path
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// TOML did not match the schema
    #[error("invalid configuration file: {0}")]
    Parse(#[from] toml::de::Error),

    /// Configuration could not be rendered
    #[error("cannot render configuration: {0}")]
    Render(#[from] toml::ser::Error),

    /// Alignment settings rejected
    #[error(transparent)]
    Alignment(#[from] AlignmentError),

    /// Quality settings rejected
    #[error(transparent)]
    Quality(#[from] QualityError),

    /// Pipeline settings rejected
    #[error("invalid pipeline configuration: {0}")]
    Pipeline(String),
}
