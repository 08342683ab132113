//! Alignment and content-target configuration

use crate::error::AlignmentError;
use linkbridge_model::{BridgeType, TrustTier, MAX_CLUSTER_QUERIES};
use serde::{Deserialize, Serialize};

/// Trust-source band for one bridge type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustBand {
    /// Minimum distinct sources
    pub min: u32,
    /// Maximum distinct sources
    pub max: u32,
    /// Preferred tier, if any
    #[serde(default)]
    pub preferred_tier: Option<TrustTier>,
}

impl TrustBand {
    /// Band without a tier preference
    #[inline]
    #[must_use]
    pub fn new(min: u32, max: u32) -> Self {
        Self {
            min,
            max,
            preferred_tier: None,
        }
    }

    /// With preferred tier
    #[inline]
    #[must_use]
    pub fn with_preferred_tier(mut self, tier: TrustTier) -> Self {
        self.preferred_tier = Some(tier);
        self
    }
}

/// Trust-source bands per bridge type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrustPolicy {
    /// Direct link: one source, government preferred
    pub strong: TrustBand,
    /// Thematic detour
    pub pivot: TrustBand,
    /// Neutral framing: triangulate
    pub wrapper: TrustBand,
}

impl Default for TrustPolicy {
    fn default() -> Self {
        Self {
            strong: TrustBand::new(1, 1).with_preferred_tier(TrustTier::Government),
            pivot: TrustBand::new(1, 2),
            wrapper: TrustBand::new(2, 3),
        }
    }
}

impl TrustPolicy {
    /// Band for `bridge`
    #[must_use]
    pub fn band(&self, bridge: BridgeType) -> &TrustBand {
        match bridge {
            BridgeType::Strong => &self.strong,
            BridgeType::Pivot => &self.pivot,
            BridgeType::Wrapper => &self.wrapper,
        }
    }
}

/// Length and LSI targets handed to the generator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentTargets {
    /// Minimum word count (gated)
    pub min_words: usize,
    /// Maximum word count (generation hint)
    pub max_words: usize,
    /// Minimum distinct LSI terms near the anchor (gated)
    pub lsi_min: usize,
    /// Maximum distinct LSI terms near the anchor (generation hint)
    pub lsi_max: usize,
    /// LSI window radius in sentences
    pub lsi_window_sentences: usize,
    /// Cap on the LSI vocabulary offered to the generator
    pub lsi_vocabulary_cap: usize,
}

impl Default for ContentTargets {
    fn default() -> Self {
        Self {
            min_words: 900,
            max_words: 2500,
            lsi_min: 6,
            lsi_max: 10,
            lsi_window_sentences: 2,
            lsi_vocabulary_cap: 16,
        }
    }
}

/// Alignment modelling configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignmentConfig {
    /// Niche overlap at or above which an aligned job gets a strong bridge
    pub strong_overlap: f64,
    /// Niche overlap below which every job gets a wrapper bridge
    pub pivot_overlap: f64,
    /// Cap on required subtopics
    pub max_required_subtopics: usize,
    /// Cap on cluster queries
    pub max_cluster_queries: usize,
    /// Results per query considered during aggregation
    pub top_results: usize,
    /// Competitor domains never cited as trust sources
    pub competitors: Vec<String>,
    /// Length and LSI targets
    pub content: ContentTargets,
    /// Trust-source bands
    pub trust: TrustPolicy,
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self {
            strong_overlap: 0.7,
            pivot_overlap: 0.4,
            max_required_subtopics: 8,
            max_cluster_queries: MAX_CLUSTER_QUERIES,
            top_results: 10,
            competitors: Vec::new(),
            content: ContentTargets::default(),
            trust: TrustPolicy::default(),
        }
    }
}

impl AlignmentConfig {
    /// With competitor domains
    #[must_use]
    pub fn with_competitors<I, S>(mut self, competitors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.competitors = competitors.into_iter().map(Into::into).collect();
        self
    }

    /// With overlap cutoffs
    #[inline]
    #[must_use]
    pub fn with_overlap_cutoffs(mut self, pivot: f64, strong: f64) -> Self {
        self.pivot_overlap = pivot;
        self.strong_overlap = strong;
        self
    }

    /// With content targets
    #[inline]
    #[must_use]
    pub fn with_content(mut self, content: ContentTargets) -> Self {
        self.content = content;
        self
    }

    /// Reject inconsistent bounds
    ///
    /// # Errors
    /// Returns [`AlignmentError::InvalidConfig`] naming the first violation
    pub fn validate(&self) -> Result<(), AlignmentError> {
        if !(0.0..=1.0).contains(&self.pivot_overlap)
            || !(0.0..=1.0).contains(&self.strong_overlap)
            || self.pivot_overlap > self.strong_overlap
        {
            return invalid(format!(
                "overlap cutoffs must satisfy 0 <= pivot ({}) <= strong ({}) <= 1",
                self.pivot_overlap, self.strong_overlap
            ));
        }
        if self.max_required_subtopics == 0 {
            return invalid("max_required_subtopics must be positive".into());
        }
        if self.max_cluster_queries == 0 || self.max_cluster_queries > MAX_CLUSTER_QUERIES {
            return invalid(format!(
                "max_cluster_queries must be within 1..={MAX_CLUSTER_QUERIES}"
            ));
        }
        if self.top_results == 0 {
            return invalid("top_results must be positive".into());
        }

        let content = &self.content;
        if content.min_words > content.max_words {
            return invalid(format!(
                "min_words ({}) exceeds max_words ({})",
                content.min_words, content.max_words
            ));
        }
        if content.lsi_min > content.lsi_max {
            return invalid(format!(
                "lsi_min ({}) exceeds lsi_max ({})",
                content.lsi_min, content.lsi_max
            ));
        }
        if content.lsi_vocabulary_cap < content.lsi_min {
            return invalid("lsi_vocabulary_cap is smaller than lsi_min".into());
        }

        for (name, band) in [
            ("strong", &self.trust.strong),
            ("pivot", &self.trust.pivot),
            ("wrapper", &self.trust.wrapper),
        ] {
            if band.min == 0 || band.min > band.max {
                return invalid(format!(
                    "{name} trust band must satisfy 1 <= min ({}) <= max ({})",
                    band.min, band.max
                ));
            }
        }
        Ok(())
    }
}

fn invalid(message: String) -> Result<(), AlignmentError> {
    Err(AlignmentError::InvalidConfig(message))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = AlignmentConfig::default();
        config.validate().unwrap();
        assert_eq!(config.trust.band(BridgeType::Wrapper).min, 2);
        assert_eq!(
            config.trust.band(BridgeType::Strong).preferred_tier,
            Some(TrustTier::Government)
        );
    }

    #[test]
    fn rejects_swapped_cutoffs() {
        let config = AlignmentConfig::default().with_overlap_cutoffs(0.8, 0.5);
        assert!(matches!(config.validate(), Err(AlignmentError::InvalidConfig(_))));
    }

    #[test]
    fn rejects_inverted_lsi_bounds() {
        let config = AlignmentConfig::default().with_content(ContentTargets {
            lsi_min: 12,
            ..ContentTargets::default()
        });
        assert!(config.validate().is_err());
    }
}
