//! Search query planning

use crate::error::AlignmentError;
use linkbridge_model::text::normalize_term;
use linkbridge_model::ProfileSet;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Queries to research for one job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryPlan {
    /// Primary keyword
    pub main: String,
    /// Related queries
    pub clusters: Vec<String>,
}

impl QueryPlan {
    /// Main query first, then clusters
    #[must_use]
    pub fn all(&self) -> Vec<String> {
        std::iter::once(self.main.clone())
            .chain(self.clusters.iter().cloned())
            .collect()
    }
}

/// Derives the main and cluster queries from the profiles
#[derive(Debug, Clone, Copy)]
pub struct QueryPlanner {
    max_clusters: usize,
}

impl QueryPlanner {
    /// Plan at most `max_clusters` cluster queries
    #[inline]
    #[must_use]
    pub fn new(max_clusters: usize) -> Self {
        Self { max_clusters }
    }

    /// Main query: first target topic, else target title, else the anchor
    /// label. Clusters: the anchor label, then the remaining target topics.
    ///
    /// # Errors
    /// Returns [`AlignmentError::EmptyQueryPlan`] when every candidate is blank
    pub fn plan(&self, profiles: &ProfileSet) -> Result<QueryPlan, AlignmentError> {
        let target = &profiles.target;
        let label = profiles.anchor_label();

        let candidates = target
            .topics
            .iter()
            .map(String::as_str)
            .chain(target.title.as_deref())
            .chain(std::iter::once(label));

        let mut seen = HashSet::new();
        let mut main = None;
        for candidate in candidates {
            let key = normalize_term(candidate);
            if !key.is_empty() {
                seen.insert(key);
                main = Some(candidate.trim().to_string());
                break;
            }
        }
        let main = main.ok_or_else(|| {
            AlignmentError::EmptyQueryPlan(format!("target '{}' has no topics", target.source))
        })?;

        let clusters = std::iter::once(label)
            .chain(target.topics.iter().map(String::as_str))
            .filter(|q| {
                let key = normalize_term(q);
                !key.is_empty() && seen.insert(key)
            })
            .map(|q| q.trim().to_string())
            .take(self.max_clusters)
            .collect();

        Ok(QueryPlan { main, clusters })
    }
}
