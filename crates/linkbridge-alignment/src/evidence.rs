//! Search evidence aggregation
//!
//! Folds a provider's ranked results for one query into [`QueryEvidence`]:
//! intent distribution, majority subtopics, archetypes and a confidence
//! level. Only the top `top_results` results are considered.

use crate::error::AlignmentError;
use linkbridge_model::text::normalize_term;
use linkbridge_model::{
    Confidence, IntentCategory, QueryEvidence, QueryResults, SerpEvidence, SerpResult,
};
use std::collections::HashSet;

/// Aggregates ranked results into per-query evidence
#[derive(Debug, Clone, Copy)]
pub struct EvidenceAggregator {
    top_results: usize,
}

impl EvidenceAggregator {
    /// Consider at most `top_results` results per query
    #[inline]
    #[must_use]
    pub fn new(top_results: usize) -> Self {
        Self {
            top_results: top_results.max(1),
        }
    }

    /// Aggregate one query; `None` when it returned no results
    #[must_use]
    pub fn aggregate(&self, results: &QueryResults) -> Option<QueryEvidence> {
        let mut top: Vec<&SerpResult> = results.results.iter().collect();
        top.sort_by_key(|r| r.rank);
        top.truncate(self.top_results);
        if top.is_empty() {
            return None;
        }

        let ranked = rank_intents(&top);
        let (dominant_intent, dominant_count) = ranked[0];
        let secondary_intent = ranked.get(1).map(|(intent, _)| *intent);

        let confidence = if results.degraded {
            Confidence::Low
        } else {
            confidence_for(top.len(), dominant_count)
        };

        Some(QueryEvidence {
            query: results.query.clone(),
            dominant_intent,
            secondary_intent,
            required_subtopics: majority_subtopics(&top),
            page_archetypes: first_seen(top.iter().map(|r| r.archetype.as_str())),
            confidence,
        })
    }

    /// Aggregate the main query and its clusters
    ///
    /// Cluster queries without results are dropped.
    ///
    /// # Errors
    /// Returns [`AlignmentError::NoResults`] when the main query is empty
    pub fn aggregate_all(
        &self,
        main: &QueryResults,
        clusters: &[QueryResults],
    ) -> Result<SerpEvidence, AlignmentError> {
        let main_evidence = self
            .aggregate(main)
            .ok_or_else(|| AlignmentError::NoResults(main.query.clone()))?;

        let cluster_evidence = clusters
            .iter()
            .filter_map(|results| {
                let evidence = self.aggregate(results);
                if evidence.is_none() {
                    tracing::debug!(query = %results.query, "cluster query returned no results");
                }
                evidence
            })
            .collect();

        Ok(SerpEvidence::new(main_evidence, cluster_evidence)?)
    }
}

/// Intents by descending frequency; ties go to the best-ranked first sighting
fn rank_intents(top: &[&SerpResult]) -> Vec<(IntentCategory, usize)> {
    let mut counts: Vec<(IntentCategory, usize)> = Vec::new();
    for result in top {
        match counts.iter_mut().find(|(intent, _)| *intent == result.intent) {
            Some((_, count)) => *count += 1,
            None => counts.push((result.intent, 1)),
        }
    }
    // stable sort keeps first-seen order among equal counts
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
}

#[allow(clippy::cast_precision_loss)]
fn confidence_for(results: usize, dominant: usize) -> Confidence {
    let share = dominant as f64 / results as f64;
    if results >= 5 && share >= 0.7 {
        Confidence::High
    } else if results >= 3 && share >= 0.5 {
        Confidence::Medium
    } else {
        Confidence::Low
    }
}

fn majority_subtopics(top: &[&SerpResult]) -> Vec<String> {
    let mut order: Vec<String> = Vec::new();
    let mut counts: Vec<usize> = Vec::new();
    for result in top {
        let mut seen_here = HashSet::new();
        for subtopic in &result.subtopics {
            let term = normalize_term(subtopic);
            if term.is_empty() || !seen_here.insert(term.clone()) {
                continue;
            }
            match order.iter().position(|t| *t == term) {
                Some(i) => counts[i] += 1,
                None => {
                    order.push(term);
                    counts.push(1);
                }
            }
        }
    }
    order
        .into_iter()
        .zip(counts)
        .filter(|(_, count)| count * 2 > top.len())
        .map(|(term, _)| term)
        .collect()
}

fn first_seen<'a>(items: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .map(normalize_term)
        .filter(|s| !s.is_empty() && seen.insert(s.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn result(rank: u32, intent: IntentCategory, subtopics: &[&str]) -> SerpResult {
        SerpResult {
            rank,
            url: format!("https://site{rank}.com/"),
            title: format!("Result {rank}"),
            intent,
            archetype: if rank % 2 == 0 { "Listicle" } else { "guide" }.to_string(),
            subtopics: subtopics.iter().map(ToString::to_string).collect(),
        }
    }

    #[test]
    fn dominant_secondary_and_majority_subtopics() {
        use IntentCategory::{Commercial, Informational};
        let results = QueryResults::new(
            "raised bed soil",
            vec![
                result(1, Informational, &["Mulch", "bed height"]),
                result(2, Commercial, &["mulch", "price"]),
                result(3, Informational, &["mulch", "bed height"]),
                result(4, Informational, &["watering"]),
                result(5, Informational, &["bed height", "mulch"]),
            ],
        );
        let evidence = EvidenceAggregator::new(10).aggregate(&results).unwrap();
        assert_eq!(evidence.dominant_intent, Informational);
        assert_eq!(evidence.secondary_intent, Some(Commercial));
        assert_eq!(evidence.required_subtopics, vec!["mulch", "bed height"]);
        assert_eq!(evidence.page_archetypes, vec!["guide", "listicle"]);
        // 5 results, 80 % share
        assert_eq!(evidence.confidence, Confidence::High);
    }

    #[test]
    fn intent_tie_goes_to_better_rank() {
        use IntentCategory::{Commercial, Informational};
        let results = QueryResults::new(
            "q",
            vec![
                result(2, Informational, &[]),
                result(1, Commercial, &[]),
                result(3, Informational, &[]),
                result(4, Commercial, &[]),
            ],
        );
        let evidence = EvidenceAggregator::new(10).aggregate(&results).unwrap();
        assert_eq!(evidence.dominant_intent, Commercial);
        assert_eq!(evidence.confidence, Confidence::Medium);
    }

    #[test]
    fn degraded_results_are_low_confidence() {
        let results = QueryResults::new(
            "q",
            (1..=6)
                .map(|r| result(r, IntentCategory::Informational, &[]))
                .collect(),
        )
        .degraded();
        let evidence = EvidenceAggregator::new(10).aggregate(&results).unwrap();
        assert_eq!(evidence.confidence, Confidence::Low);
    }

    #[test]
    fn top_n_limits_the_sample() {
        let results = QueryResults::new(
            "q",
            vec![
                result(1, IntentCategory::Informational, &["a"]),
                result(2, IntentCategory::Informational, &["a"]),
                result(3, IntentCategory::Commercial, &["b"]),
            ],
        );
        let evidence = EvidenceAggregator::new(2).aggregate(&results).unwrap();
        assert_eq!(evidence.secondary_intent, None);
        assert_eq!(evidence.required_subtopics, vec!["a"]);
    }

    #[test]
    fn empty_main_query_is_an_error() {
        let aggregator = EvidenceAggregator::new(10);
        let empty = QueryResults::new("nothing", vec![]);
        assert!(matches!(
            aggregator.aggregate_all(&empty, &[]),
            Err(AlignmentError::NoResults(q)) if q == "nothing"
        ));

        let main = QueryResults::new("main", vec![result(1, IntentCategory::Informational, &[])]);
        let serp = aggregator.aggregate_all(&main, &[empty]).unwrap();
        assert!(serp.clusters().is_empty());
    }
}
