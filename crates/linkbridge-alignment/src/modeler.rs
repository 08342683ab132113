//! Alignment modelling and bridge selection
//!
//! Fuses the three profiles with aggregated search evidence:
//!
//! 1. Each profile's intent is compared against the search intent
//! 2. `overall` is the weakest of the three axes
//! 3. `niche_overlap` is the Jaccard similarity between the publisher's
//!    focus and the search demand (archetypes plus required subtopics)
//! 4. The bridge is a table lookup on `(overall, niche_overlap)`, degraded
//!    when the evidence is low-confidence

use crate::config::AlignmentConfig;
use crate::intent::compare_with_serp;
use linkbridge_model::text::{dedup_normalized, normalize_term};
use linkbridge_model::{
    Alignment, AlignmentVerdict, BridgeRecommendation, BridgeType, Confidence, ProfileSet,
    SerpEvidence,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Verdict plus recommendation for one job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignmentOutcome {
    /// Per-axis and overall alignment
    pub verdict: AlignmentVerdict,
    /// Bridge and content restrictions
    pub recommendation: BridgeRecommendation,
    /// Aggregate evidence confidence
    pub confidence: Confidence,
}

/// Fuses profiles and search evidence into an [`AlignmentOutcome`]
#[derive(Debug, Clone)]
pub struct AlignmentModeler {
    config: AlignmentConfig,
}

impl AlignmentModeler {
    /// Create with configuration
    #[inline]
    #[must_use]
    pub fn new(config: AlignmentConfig) -> Self {
        Self { config }
    }

    /// Configuration in use
    #[inline]
    #[must_use]
    pub fn config(&self) -> &AlignmentConfig {
        &self.config
    }

    /// Model one job
    #[must_use]
    pub fn model(&self, profiles: &ProfileSet, serp: &SerpEvidence) -> AlignmentOutcome {
        let verdict = self.verdict(profiles, serp);
        let overlap = niche_overlap(&profiles.publisher.focus_terms(), serp);
        let confidence = serp.confidence();
        let (bridge, rationale) = self.decide_bridge(verdict.overall(), overlap, confidence);

        tracing::debug!(
            overall = %verdict.overall(),
            niche_overlap = overlap,
            confidence = confidence.as_str(),
            bridge = %bridge,
            "alignment modelled"
        );

        let recommendation = BridgeRecommendation {
            bridge,
            rationale,
            required_subtopics: self.required_subtopics(serp),
            forbidden_angles: forbidden_angles(profiles, &verdict),
            niche_overlap: overlap,
        };

        AlignmentOutcome {
            verdict,
            recommendation,
            confidence,
        }
    }

    /// Per-axis verdict against the main query's intents
    #[must_use]
    pub fn verdict(&self, profiles: &ProfileSet, serp: &SerpEvidence) -> AlignmentVerdict {
        let dominant = serp.dominant_intent();
        let secondary = serp.secondary_intent();
        AlignmentVerdict::from_axes(
            compare_with_serp(profiles.anchor.intent, dominant, secondary),
            compare_with_serp(profiles.target.intent, dominant, secondary),
            compare_with_serp(profiles.publisher.intent, dominant, secondary),
        )
    }

    /// Bridge decision table; the rationale is never empty
    #[must_use]
    pub fn decide_bridge(
        &self,
        overall: Alignment,
        overlap: f64,
        confidence: Confidence,
    ) -> (BridgeType, String) {
        let strong = self.config.strong_overlap;
        let pivot = self.config.pivot_overlap;

        if overall == Alignment::Off {
            return (
                BridgeType::Wrapper,
                format!("overall alignment is off (niche overlap {overlap:.2}); neutral framing"),
            );
        }
        if overlap < pivot {
            return (
                BridgeType::Wrapper,
                format!(
                    "niche overlap {overlap:.2} is below {pivot:.2} with {overall} alignment; neutral framing"
                ),
            );
        }
        if overall == Alignment::Aligned && overlap >= strong {
            if confidence == Confidence::Low {
                return (
                    BridgeType::Pivot,
                    format!(
                        "aligned with niche overlap {overlap:.2}, but search evidence confidence \
                         is low so a strong bridge is withheld; thematic detour"
                    ),
                );
            }
            return (
                BridgeType::Strong,
                format!(
                    "aligned with niche overlap {overlap:.2} >= {strong:.2} and {} confidence; direct link",
                    confidence.as_str()
                ),
            );
        }
        (
            BridgeType::Pivot,
            format!("{overall} alignment with niche overlap {overlap:.2}; thematic detour"),
        )
    }

    /// Union of per-query subtopics ranked by how many queries demand them
    #[must_use]
    pub fn required_subtopics(&self, serp: &SerpEvidence) -> Vec<String> {
        let mut first_seen: Vec<String> = Vec::new();
        let mut frequency: HashMap<String, usize> = HashMap::new();
        for query in serp.queries() {
            for term in dedup_normalized(&query.required_subtopics) {
                let count = frequency.entry(term.clone()).or_insert(0);
                if *count == 0 {
                    first_seen.push(term);
                }
                *count += 1;
            }
        }
        // stable sort keeps first-seen order on ties
        first_seen.sort_by(|a, b| frequency[b].cmp(&frequency[a]));
        first_seen.truncate(self.config.max_required_subtopics);
        first_seen
    }
}

/// Jaccard similarity between publisher focus and search demand
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn niche_overlap(publisher_focus: &[String], serp: &SerpEvidence) -> f64 {
    let focus: HashSet<&str> = publisher_focus.iter().map(String::as_str).collect();
    let demand: HashSet<String> = serp
        .queries()
        .flat_map(|q| q.page_archetypes.iter().chain(q.required_subtopics.iter()))
        .map(|term| normalize_term(term.as_str()))
        .filter(|term| !term.is_empty())
        .collect();
    let demand: HashSet<&str> = demand.iter().map(String::as_str).collect();

    let union = focus.union(&demand).count();
    if union == 0 {
        return 0.0;
    }
    focus.intersection(&demand).count() as f64 / union as f64
}

/// Publisher restrictions, plus an offer-bound angle when the target only
/// partially matches the search intent
fn forbidden_angles(profiles: &ProfileSet, verdict: &AlignmentVerdict) -> Vec<String> {
    let mut angles: Vec<String> = profiles
        .publisher
        .restrictions
        .iter()
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
        .collect();

    if verdict.target_vs_serp() == Alignment::Partial {
        let offer = profiles.target.summary.trim();
        angles.push(if offer.is_empty() {
            format!("claims beyond what {} states", profiles.target.source)
        } else {
            format!("claims beyond the stated offer: {offer}")
        });
    }

    let mut seen = HashSet::new();
    angles.retain(|a| seen.insert(a.to_lowercase()));
    angles
}

#[cfg(test)]
mod tests {
    use super::*;
    use linkbridge_model::{IntentCategory, ProfileRole, QueryEvidence, SourceProfile};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn modeler() -> AlignmentModeler {
        AlignmentModeler::new(AlignmentConfig::default())
    }

    fn query(text: &str, subtopics: &[&str], confidence: Confidence) -> QueryEvidence {
        QueryEvidence {
            query: text.to_string(),
            dominant_intent: IntentCategory::Investigational,
            secondary_intent: Some(IntentCategory::Commercial),
            required_subtopics: subtopics.iter().map(ToString::to_string).collect(),
            page_archetypes: vec!["guide".to_string()],
            confidence,
        }
    }

    fn serp() -> SerpEvidence {
        SerpEvidence::new(
            query("soil", &["mulch", "bed height"], Confidence::High),
            vec![
                query("a", &["bed height", "watering"], Confidence::High),
                query("b", &["watering", "bed height"], Confidence::Medium),
            ],
        )
        .unwrap()
    }

    fn profiles(target_intent: IntentCategory) -> ProfileSet {
        ProfileSet::new(
            SourceProfile::new(ProfileRole::Target, "https://shop.example.com", target_intent)
                .with_summary("bagged soil mix for raised beds"),
            SourceProfile::new(
                ProfileRole::Publisher,
                "garden-weekly.com",
                IntentCategory::Investigational,
            )
            .with_topics(["guide", "mulch", "bed height", "watering"])
            .with_restrictions(["no gambling content", "No gambling content"]),
            SourceProfile::new(ProfileRole::Anchor, "soil mix", IntentCategory::Investigational),
        )
    }

    #[test]
    fn bridge_table() {
        let m = modeler();
        assert_eq!(
            m.decide_bridge(Alignment::Aligned, 0.75, Confidence::High).0,
            BridgeType::Strong
        );
        assert_eq!(
            m.decide_bridge(Alignment::Partial, 0.5, Confidence::High).0,
            BridgeType::Pivot
        );
        assert_eq!(
            m.decide_bridge(Alignment::Off, 0.9, Confidence::High).0,
            BridgeType::Wrapper
        );
        assert_eq!(
            m.decide_bridge(Alignment::Aligned, 0.3, Confidence::High).0,
            BridgeType::Wrapper
        );
        assert_eq!(
            m.decide_bridge(Alignment::Partial, 0.9, Confidence::High).0,
            BridgeType::Pivot
        );
    }

    #[test]
    fn low_confidence_withholds_strong() {
        let (bridge, rationale) = modeler().decide_bridge(Alignment::Aligned, 0.95, Confidence::Low);
        assert_eq!(bridge, BridgeType::Pivot);
        assert!(rationale.contains("confidence is low"));
    }

    proptest! {
        #[test]
        fn rationale_never_empty(
            overall in proptest::sample::select(vec![Alignment::Off, Alignment::Partial, Alignment::Aligned]),
            overlap in 0.0f64..=1.0,
            confidence in proptest::sample::select(vec![Confidence::Low, Confidence::Medium, Confidence::High]),
        ) {
            let (bridge, rationale) = modeler().decide_bridge(overall, overlap, confidence);
            prop_assert!(!rationale.is_empty());
            if confidence == Confidence::Low {
                prop_assert_ne!(bridge, BridgeType::Strong);
            }
        }
    }

    #[test]
    fn subtopics_ranked_by_query_frequency() {
        assert_eq!(
            modeler().required_subtopics(&serp()),
            vec!["bed height", "watering", "mulch"]
        );
    }

    #[test]
    fn subtopics_capped() {
        let mut config = AlignmentConfig::default();
        config.max_required_subtopics = 1;
        assert_eq!(
            AlignmentModeler::new(config).required_subtopics(&serp()),
            vec!["bed height"]
        );
    }

    #[test]
    fn overlap_is_jaccard() {
        let focus = vec!["guide".to_string(), "mulch".to_string(), "compost".to_string()];
        // demand: guide, mulch, bed height, watering
        let overlap = niche_overlap(&focus, &serp());
        assert!((overlap - 2.0 / 5.0).abs() < 1e-9);
        let empty = SerpEvidence::new(
            QueryEvidence {
                page_archetypes: vec![],
                ..query("x", &[], Confidence::High)
            },
            vec![],
        )
        .unwrap();
        assert_eq!(niche_overlap(&[], &empty), 0.0);
    }

    #[test]
    fn full_model_aligned_strong() {
        let outcome = modeler().model(&profiles(IntentCategory::Investigational), &serp());
        assert_eq!(outcome.verdict.overall(), Alignment::Aligned);
        assert!((outcome.recommendation.niche_overlap - 1.0).abs() < 1e-9);
        assert_eq!(outcome.recommendation.bridge, BridgeType::Strong);
        assert_eq!(outcome.confidence, Confidence::Medium);
        assert_eq!(outcome.recommendation.forbidden_angles, vec!["no gambling content"]);
    }

    #[test]
    fn partial_target_forbids_offer_overreach() {
        let outcome = modeler().model(&profiles(IntentCategory::Informational), &serp());
        assert_eq!(outcome.verdict.target_vs_serp(), Alignment::Partial);
        assert_eq!(outcome.recommendation.bridge, BridgeType::Pivot);
        assert_eq!(
            outcome.recommendation.forbidden_angles,
            vec![
                "no gambling content".to_string(),
                "claims beyond the stated offer: bagged soil mix for raised beds".to_string()
            ]
        );
    }
}
