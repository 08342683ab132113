//! Error types for alignment modelling

use linkbridge_model::ModelError;

/// Alignment errors
#[derive(Debug, thiserror::Error)]
pub enum AlignmentError {
    /// The main query returned nothing to aggregate
    #[error("no search results for main query '{0}'")]
    NoResults(String),

    /// No usable query could be planned from the inputs
    #[error("cannot plan a search query: {0}")]
    EmptyQueryPlan(String),

    /// Evidence violated a model invariant
    #[error("model error: {0}")]
    Model(#[from] ModelError),

    /// Configuration is inconsistent
    #[error("invalid alignment configuration: {0}")]
    InvalidConfig(String),
}

impl AlignmentError {
    /// A fresh provider call may succeed where this one did not
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::NoResults(_))
    }
}
