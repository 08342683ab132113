//! External collaborator contracts
//!
//! Profiling, search research and content generation are I/O-bound services
//! owned by the surrounding application. The controller only sees these
//! traits; tests plug in scripted fakes.

use crate::error::CollaboratorError;
use crate::types::ContextBundle;
use linkbridge_model::{
    GeneratedArtifact, GenerationConstraints, ProfileRole, QueryResults, SourceProfile,
};
use std::fmt;
use std::sync::Arc;

/// Builds a [`SourceProfile`] for a URL, domain or label
#[async_trait::async_trait]
pub trait ProfileIngestor: Send + Sync {
    /// Profile one input
    async fn profile(&self, role: ProfileRole, input: &str)
        -> Result<SourceProfile, CollaboratorError>;
}

/// Runs search queries
///
/// A provider may answer with degraded results instead of failing outright.
#[async_trait::async_trait]
pub trait SerpProvider: Send + Sync {
    /// Ranked results per query, in query order
    async fn research(&self, queries: &[String]) -> Result<Vec<QueryResults>, CollaboratorError>;
}

/// Writes the article
#[async_trait::async_trait]
pub trait ContentGenerator: Send + Sync {
    /// Generate a draft that should satisfy `constraints`
    async fn generate(
        &self,
        constraints: &GenerationConstraints,
        context: &ContextBundle,
    ) -> Result<GeneratedArtifact, CollaboratorError>;
}

/// The three collaborators a controller needs
#[derive(Clone)]
pub struct Collaborators {
    /// Profiling service
    pub ingestor: Arc<dyn ProfileIngestor>,
    /// Search provider
    pub serp: Arc<dyn SerpProvider>,
    /// Content generator
    pub generator: Arc<dyn ContentGenerator>,
}

impl Collaborators {
    /// Bundle collaborators
    #[must_use]
    pub fn new(
        ingestor: Arc<dyn ProfileIngestor>,
        serp: Arc<dyn SerpProvider>,
        generator: Arc<dyn ContentGenerator>,
    ) -> Self {
        Self {
            ingestor,
            serp,
            generator,
        }
    }
}

impl fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}
