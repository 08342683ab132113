//! Search-result evidence
//!
//! A provider returns [`QueryResults`] per query; the alignment crate folds
//! those into one [`QueryEvidence`] each and groups them as [`SerpEvidence`]:
//! one main query plus up to [`MAX_CLUSTER_QUERIES`] cluster queries.

use crate::error::ModelError;
use crate::intent::{Confidence, IntentCategory};
use serde::{Deserialize, Serialize};

/// Upper bound on cluster queries per job
pub const MAX_CLUSTER_QUERIES: usize = 4;

/// One ranked search result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerpResult {
    /// 1-based rank
    pub rank: u32,
    /// Result URL
    pub url: String,
    /// Result title
    pub title: String,
    /// Intent the result page serves
    pub intent: IntentCategory,
    /// Page archetype (e.g. "guide", "listicle", "product")
    pub archetype: String,
    /// Subtopics the page covers
    pub subtopics: Vec<String>,
}

/// Ranked results for one query, as returned by a provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResults {
    /// Query text
    pub query: String,
    /// Results in rank order
    pub results: Vec<SerpResult>,
    /// Provider served a partial or fallback answer
    #[serde(default)]
    pub degraded: bool,
}

impl QueryResults {
    /// Create a result set
    #[must_use]
    pub fn new(query: impl Into<String>, results: Vec<SerpResult>) -> Self {
        Self {
            query: query.into(),
            results,
            degraded: false,
        }
    }

    /// Mark as degraded
    #[inline]
    #[must_use]
    pub fn degraded(mut self) -> Self {
        self.degraded = true;
        self
    }
}

/// Intent and topical demand derived from one query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryEvidence {
    /// Query text
    pub query: String,
    /// Most common intent among top results
    pub dominant_intent: IntentCategory,
    /// Runner-up intent, if any
    pub secondary_intent: Option<IntentCategory>,
    /// Subtopics present in a majority of top results
    pub required_subtopics: Vec<String>,
    /// Page archetypes in first-seen rank order
    pub page_archetypes: Vec<String>,
    /// How far the evidence can be trusted
    pub confidence: Confidence,
}

/// Evidence for the main query and its cluster queries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerpEvidence {
    main: QueryEvidence,
    clusters: Vec<QueryEvidence>,
}

impl SerpEvidence {
    /// Group main and cluster evidence
    ///
    /// # Errors
    /// Returns [`ModelError::InvalidEvidence`] when more than
    /// [`MAX_CLUSTER_QUERIES`] clusters are supplied
    pub fn new(main: QueryEvidence, clusters: Vec<QueryEvidence>) -> Result<Self, ModelError> {
        if clusters.len() > MAX_CLUSTER_QUERIES {
            return Err(ModelError::InvalidEvidence(format!(
                "{} cluster queries supplied, at most {MAX_CLUSTER_QUERIES} allowed",
                clusters.len()
            )));
        }
        Ok(Self { main, clusters })
    }

    /// Main query evidence
    #[inline]
    #[must_use]
    pub fn main(&self) -> &QueryEvidence {
        &self.main
    }

    /// Cluster query evidence
    #[inline]
    #[must_use]
    pub fn clusters(&self) -> &[QueryEvidence] {
        &self.clusters
    }

    /// Main query first, then clusters in order
    pub fn queries(&self) -> impl Iterator<Item = &QueryEvidence> {
        std::iter::once(&self.main).chain(self.clusters.iter())
    }

    /// Dominant intent of the main query
    #[inline]
    #[must_use]
    pub fn dominant_intent(&self) -> IntentCategory {
        self.main.dominant_intent
    }

    /// Secondary intent of the main query
    #[inline]
    #[must_use]
    pub fn secondary_intent(&self) -> Option<IntentCategory> {
        self.main.secondary_intent
    }

    /// Aggregate confidence: the worst per-query level, and low when no
    /// cluster query backed the main one
    #[must_use]
    pub fn confidence(&self) -> Confidence {
        if self.clusters.is_empty() {
            return Confidence::Low;
        }
        self.queries()
            .map(|q| q.confidence)
            .min()
            .unwrap_or(Confidence::Low)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn evidence(query: &str, confidence: Confidence) -> QueryEvidence {
        QueryEvidence {
            query: query.to_string(),
            dominant_intent: IntentCategory::Informational,
            secondary_intent: None,
            required_subtopics: vec![],
            page_archetypes: vec!["guide".to_string()],
            confidence,
        }
    }

    #[test]
    fn confidence_is_worst_query() {
        let serp = SerpEvidence::new(
            evidence("main", Confidence::High),
            vec![evidence("a", Confidence::High), evidence("b", Confidence::Medium)],
        )
        .unwrap();
        assert_eq!(serp.confidence(), Confidence::Medium);
        assert_eq!(serp.queries().count(), 3);
    }

    #[test]
    fn missing_clusters_degrade_confidence() {
        let serp = SerpEvidence::new(evidence("main", Confidence::High), vec![]).unwrap();
        assert_eq!(serp.confidence(), Confidence::Low);
    }

    #[test]
    fn too_many_clusters_rejected() {
        let clusters = (0..5).map(|i| evidence(&i.to_string(), Confidence::High)).collect();
        let result = SerpEvidence::new(evidence("main", Confidence::High), clusters);
        assert!(matches!(result, Err(ModelError::InvalidEvidence(_))));
    }
}
