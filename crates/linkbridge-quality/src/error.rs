//! Error types for the quality gate

use linkbridge_model::QualityStatus;

/// Quality gate and autofix errors
#[derive(Debug, thiserror::Error)]
pub enum QualityError {
    /// Autofix only runs on reports that pass with autofixable issues
    #[error("autofix requires status pass_with_autofix, report is {0}")]
    NotFixable(QualityStatus),

    /// Configuration is inconsistent
    #[error("invalid quality configuration: {0}")]
    InvalidConfig(String),
}

impl QualityError {
    /// Whether a human must look at the artifact
    #[inline]
    #[must_use]
    pub fn requires_human(&self) -> bool {
        matches!(self, Self::NotFixable(QualityStatus::Blocked))
    }
}
