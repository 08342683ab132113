//! Generation constraints handed to the content generator
//!
//! The same structure is what the quality gate checks a draft against.

use crate::verdict::BridgeType;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fixed cap on anchor occurrences per article
pub const MAX_ANCHOR_REPETITIONS: u32 = 2;

/// Credibility class of a cited source, best first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrustTier {
    /// Government bodies and standards organisations
    Government,
    /// Universities and research institutions
    Academic,
    /// Industry bodies and vendors
    Industry,
    /// News and media outlets
    Media,
}

impl TrustTier {
    /// Numeric tier, 1 = most credible
    #[inline]
    #[must_use]
    pub fn rank(self) -> u8 {
        match self {
            Self::Government => 1,
            Self::Academic => 2,
            Self::Industry => 3,
            Self::Media => 4,
        }
    }

    /// At least as credible as `required`
    #[inline]
    #[must_use]
    pub fn meets(self, required: Self) -> bool {
        self <= required
    }

    /// Stable label
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Government => "government",
            Self::Academic => "academic",
            Self::Industry => "industry",
            Self::Media => "media",
        }
    }
}

impl fmt::Display for TrustTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tier {} ({})", self.rank(), self.as_str())
    }
}

/// Where and how the anchor may appear
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorPolicy {
    /// Proposed link label
    pub label: String,
    /// Destination URL
    pub target_url: String,
    /// Maximum anchor occurrences in the article
    pub max_repetitions: u32,
    /// Heading levels the anchor must not appear in
    pub forbidden_heading_levels: Vec<u8>,
    /// Main search keyword; an anchor equal to it is exact-match
    pub primary_keyword: String,
    /// Lowest-risk label for the target (its brand)
    pub brand_label: String,
    /// Anchor carries strong commercial intent
    pub commercial_intent: bool,
}

/// Required trust-source count and tier mix
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustRequirement {
    /// Minimum distinct sources
    pub min: u32,
    /// Maximum distinct sources the generator should cite
    pub max: u32,
    /// At least one source should reach this tier
    pub preferred_tier: Option<TrustTier>,
    /// Domains that never count as trust sources (target, competitors)
    pub excluded_domains: Vec<String>,
}

/// LSI term target around the anchor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LsiTarget {
    /// Minimum distinct normalized terms in the window
    pub min: usize,
    /// Maximum distinct normalized terms in the window
    pub max: usize,
    /// Window radius in sentences around the anchor sentence
    pub window_sentences: usize,
    /// Candidate terms, normalized, in priority order
    pub vocabulary: Vec<String>,
}

/// Numeric and structural constraints for one article
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationConstraints {
    /// Bridge strategy the article follows
    pub bridge: BridgeType,
    /// Article language
    pub language: String,
    /// Minimum word count
    pub min_words: usize,
    /// Maximum word count
    pub max_words: usize,
    /// Anchor placement policy
    pub anchor: AnchorPolicy,
    /// Trust-source requirement
    pub trust: TrustRequirement,
    /// LSI target
    pub lsi: LsiTarget,
    /// Subtopics to cover
    pub required_subtopics: Vec<String>,
    /// Angles to avoid
    pub forbidden_angles: Vec<String>,
}
