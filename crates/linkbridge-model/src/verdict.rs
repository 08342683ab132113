//! Alignment verdicts and bridge recommendations

use crate::intent::Alignment;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Per-axis and overall alignment
///
/// `overall` is always the weakest axis; it cannot be set on its own and is
/// recomputed when a verdict is deserialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "VerdictAxes")]
pub struct AlignmentVerdict {
    anchor_vs_serp: Alignment,
    target_vs_serp: Alignment,
    publisher_vs_serp: Alignment,
    overall: Alignment,
}

#[derive(Deserialize)]
struct VerdictAxes {
    anchor_vs_serp: Alignment,
    target_vs_serp: Alignment,
    publisher_vs_serp: Alignment,
}

impl From<VerdictAxes> for AlignmentVerdict {
    fn from(axes: VerdictAxes) -> Self {
        Self::from_axes(axes.anchor_vs_serp, axes.target_vs_serp, axes.publisher_vs_serp)
    }
}

impl AlignmentVerdict {
    /// Build a verdict; overall follows the weakest-link rule
    #[must_use]
    pub fn from_axes(
        anchor_vs_serp: Alignment,
        target_vs_serp: Alignment,
        publisher_vs_serp: Alignment,
    ) -> Self {
        Self {
            anchor_vs_serp,
            target_vs_serp,
            publisher_vs_serp,
            overall: anchor_vs_serp.worst(target_vs_serp).worst(publisher_vs_serp),
        }
    }

    /// Anchor intent vs. search intent
    #[inline]
    #[must_use]
    pub fn anchor_vs_serp(&self) -> Alignment {
        self.anchor_vs_serp
    }

    /// Target intent vs. search intent
    #[inline]
    #[must_use]
    pub fn target_vs_serp(&self) -> Alignment {
        self.target_vs_serp
    }

    /// Publisher intent vs. search intent
    #[inline]
    #[must_use]
    pub fn publisher_vs_serp(&self) -> Alignment {
        self.publisher_vs_serp
    }

    /// Weakest of the three axes
    #[inline]
    #[must_use]
    pub fn overall(&self) -> Alignment {
        self.overall
    }
}

/// Narrative strategy linking publisher content to the target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BridgeType {
    /// Direct topical link
    Strong,
    /// Thematic detour
    Pivot,
    /// Neutral framing
    Wrapper,
}

impl BridgeType {
    /// Stable label
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Strong => "strong",
            Self::Pivot => "pivot",
            Self::Wrapper => "wrapper",
        }
    }
}

impl fmt::Display for BridgeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bridge decision plus the content constraints that come with it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeRecommendation {
    /// Chosen bridge
    pub bridge: BridgeType,
    /// Why this bridge was chosen; never empty
    pub rationale: String,
    /// Subtopics the article must cover, most demanded first
    pub required_subtopics: Vec<String>,
    /// Angles the article must not take
    pub forbidden_angles: Vec<String>,
    /// Publisher focus vs. search demand similarity in [0, 1]
    pub niche_overlap: f64,
}
