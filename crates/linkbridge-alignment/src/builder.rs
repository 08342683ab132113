//! Generation constraint builder
//!
//! Pure mapping from a bridge recommendation and the job profiles to the
//! numeric and structural constraints the generator receives and the quality
//! gate later enforces.

use crate::config::AlignmentConfig;
use linkbridge_model::text::{dedup_normalized, host_of};
use linkbridge_model::{
    AnchorPolicy, BridgeRecommendation, GenerationConstraints, LsiTarget, ProfileSet,
    SerpEvidence, TrustRequirement, MAX_ANCHOR_REPETITIONS,
};

/// Anchors never sit in the two topmost heading levels
const FORBIDDEN_HEADING_LEVELS: [u8; 2] = [1, 2];

/// Builds [`GenerationConstraints`]
#[derive(Debug, Clone)]
pub struct GenerationConstraintBuilder {
    config: AlignmentConfig,
}

impl GenerationConstraintBuilder {
    /// Create with configuration
    #[inline]
    #[must_use]
    pub fn new(config: AlignmentConfig) -> Self {
        Self { config }
    }

    /// Derive constraints for one job
    #[must_use]
    pub fn build(
        &self,
        recommendation: &BridgeRecommendation,
        profiles: &ProfileSet,
        serp: &SerpEvidence,
    ) -> GenerationConstraints {
        let content = &self.config.content;
        let band = self.config.trust.band(recommendation.bridge);

        let anchor = AnchorPolicy {
            label: profiles.anchor_label().trim().to_string(),
            target_url: profiles.target.source.clone(),
            max_repetitions: MAX_ANCHOR_REPETITIONS,
            forbidden_heading_levels: FORBIDDEN_HEADING_LEVELS.to_vec(),
            primary_keyword: serp.main().query.clone(),
            brand_label: brand_label(profiles),
            commercial_intent: profiles.anchor.intent.is_commercial(),
        };

        let trust = TrustRequirement {
            min: band.min,
            max: band.max,
            preferred_tier: band.preferred_tier,
            excluded_domains: self.excluded_domains(profiles),
        };

        let mut vocabulary = dedup_normalized(
            recommendation
                .required_subtopics
                .iter()
                .chain(profiles.target.topics.iter())
                .chain(profiles.target.entities.iter()),
        );
        vocabulary.truncate(content.lsi_vocabulary_cap);

        GenerationConstraints {
            bridge: recommendation.bridge,
            language: profiles.publisher.language.clone(),
            min_words: content.min_words,
            max_words: content.max_words,
            anchor,
            trust,
            lsi: LsiTarget {
                min: content.lsi_min,
                max: content.lsi_max,
                window_sentences: content.lsi_window_sentences,
                vocabulary,
            },
            required_subtopics: recommendation.required_subtopics.clone(),
            forbidden_angles: recommendation.forbidden_angles.clone(),
        }
    }

    /// Target host followed by configured competitors
    fn excluded_domains(&self, profiles: &ProfileSet) -> Vec<String> {
        let mut domains: Vec<String> = Vec::new();
        let candidates = profiles
            .target
            .host()
            .into_iter()
            .chain(self.config.competitors.iter().filter_map(|c| host_of(c)));
        for domain in candidates {
            if !domains.contains(&domain) {
                domains.push(domain);
            }
        }
        domains
    }
}

/// Target brand, else the capitalized first label of its host
fn brand_label(profiles: &ProfileSet) -> String {
    if let Some(brand) = profiles.target.brand.as_deref().map(str::trim) {
        if !brand.is_empty() {
            return brand.to_string();
        }
    }
    let stem = profiles
        .target
        .host()
        .and_then(|host| host.split('.').next().map(str::to_string))
        .unwrap_or_default();
    let mut chars = stem.chars();
    chars
        .next()
        .map(|first| first.to_uppercase().chain(chars).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use linkbridge_model::{
        BridgeType, Confidence, IntentCategory, ProfileRole, QueryEvidence, SourceProfile,
        TrustTier,
    };
    use pretty_assertions::assert_eq;

    fn profiles(brand: Option<&str>) -> ProfileSet {
        let mut target = SourceProfile::new(
            ProfileRole::Target,
            "https://www.greenroot-supply.com/soil",
            IntentCategory::Commercial,
        )
        .with_topics(["Soil Mix", "raised beds"])
        .with_entities(["GreenRoot"]);
        if let Some(brand) = brand {
            target = target.with_brand(brand);
        }
        ProfileSet::new(
            target,
            SourceProfile::new(
                ProfileRole::Publisher,
                "garden-weekly.de",
                IntentCategory::Informational,
            )
            .with_language("de"),
            SourceProfile::new(ProfileRole::Anchor, " buy soil mix ", IntentCategory::Transactional),
        )
    }

    fn serp() -> SerpEvidence {
        SerpEvidence::new(
            QueryEvidence {
                query: "soil mix".into(),
                dominant_intent: IntentCategory::Commercial,
                secondary_intent: None,
                required_subtopics: vec![],
                page_archetypes: vec![],
                confidence: Confidence::High,
            },
            vec![],
        )
        .unwrap()
    }

    fn recommendation(bridge: BridgeType) -> BridgeRecommendation {
        BridgeRecommendation {
            bridge,
            rationale: "test".into(),
            required_subtopics: vec!["mulch".into(), "soil mix".into()],
            forbidden_angles: vec!["no medical claims".into()],
            niche_overlap: 0.8,
        }
    }

    fn builder() -> GenerationConstraintBuilder {
        GenerationConstraintBuilder::new(
            AlignmentConfig::default()
                .with_competitors(["https://www.rival-soil.com", "greenroot-supply.com"]),
        )
    }

    #[test]
    fn strong_bridge_constraints() {
        let c = builder().build(&recommendation(BridgeType::Strong), &profiles(None), &serp());
        assert_eq!(c.language, "de");
        assert_eq!((c.min_words, c.max_words), (900, 2500));
        assert_eq!(c.anchor.label, "buy soil mix");
        assert_eq!(c.anchor.max_repetitions, 2);
        assert_eq!(c.anchor.forbidden_heading_levels, vec![1, 2]);
        assert_eq!(c.anchor.primary_keyword, "soil mix");
        assert_eq!(c.anchor.brand_label, "Greenroot-supply");
        assert!(c.anchor.commercial_intent);
        assert_eq!((c.trust.min, c.trust.max), (1, 1));
        assert_eq!(c.trust.preferred_tier, Some(TrustTier::Government));
        assert_eq!(
            c.trust.excluded_domains,
            vec!["greenroot-supply.com", "rival-soil.com"]
        );
        assert_eq!(c.lsi.vocabulary, vec!["mulch", "soil mix", "raised beds", "greenroot"]);
        assert_eq!((c.lsi.min, c.lsi.max, c.lsi.window_sentences), (6, 10, 2));
        assert_eq!(c.forbidden_angles, vec!["no medical claims"]);
    }

    #[test]
    fn trust_band_follows_bridge() {
        let b = builder();
        let pivot = b.build(&recommendation(BridgeType::Pivot), &profiles(None), &serp());
        assert_eq!((pivot.trust.min, pivot.trust.max), (1, 2));
        let wrapper = b.build(&recommendation(BridgeType::Wrapper), &profiles(None), &serp());
        assert_eq!((wrapper.trust.min, wrapper.trust.max), (2, 3));
        assert_eq!(wrapper.trust.preferred_tier, None);
    }

    #[test]
    fn explicit_brand_wins() {
        let c = builder().build(
            &recommendation(BridgeType::Pivot),
            &profiles(Some("GreenRoot")),
            &serp(),
        );
        assert_eq!(c.anchor.brand_label, "GreenRoot");
    }
}
