//! Categorical intent and alignment levels

use crate::error::ModelError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Search / page intent category
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentCategory {
    /// Learn about a topic
    Informational,
    /// Compare or evaluate options before buying
    Investigational,
    /// Browse offers from a provider
    Commercial,
    /// Complete a purchase or sign-up
    Transactional,
    /// Reach a specific site or page
    Navigational,
}

impl IntentCategory {
    /// Every category, in declaration order
    pub const ALL: [Self; 5] = [
        Self::Informational,
        Self::Investigational,
        Self::Commercial,
        Self::Transactional,
        Self::Navigational,
    ];

    /// Stable label
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Informational => "informational",
            Self::Investigational => "investigational",
            Self::Commercial => "commercial",
            Self::Transactional => "transactional",
            Self::Navigational => "navigational",
        }
    }

    /// Strong commercial intent (offers or purchase)
    #[inline]
    #[must_use]
    pub fn is_commercial(self) -> bool {
        matches!(self, Self::Commercial | Self::Transactional)
    }
}

impl fmt::Display for IntentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IntentCategory {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ModelError::UnknownLabel(s.to_string()))
    }
}

/// Alignment between two intent signals
///
/// Variants are ordered worst to best, so `min` yields the weakest link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Alignment {
    /// Incompatible intents
    Off,
    /// Adjacent but distinct intents
    Partial,
    /// Identical or compatible intents
    Aligned,
}

impl Alignment {
    /// Weaker of two levels
    #[inline]
    #[must_use]
    pub fn worst(self, other: Self) -> Self {
        self.min(other)
    }

    /// Stable label
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Partial => "partial",
            Self::Aligned => "aligned",
        }
    }
}

impl fmt::Display for Alignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Confidence of search evidence, ordered worst to best
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    /// Sparse or contradictory results
    Low,
    /// Usable but mixed
    Medium,
    /// Consistent, well-populated results
    High,
}

impl Confidence {
    /// Stable label
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alignment_orders_worst_first() {
        assert!(Alignment::Off < Alignment::Partial);
        assert!(Alignment::Partial < Alignment::Aligned);
        assert_eq!(Alignment::Aligned.worst(Alignment::Off), Alignment::Off);
    }

    #[test]
    fn intent_parses_labels() {
        assert_eq!(
            "Commercial".parse::<IntentCategory>().unwrap(),
            IntentCategory::Commercial
        );
        assert!("shopping".parse::<IntentCategory>().is_err());
    }

    #[test]
    fn commercial_intents() {
        assert!(IntentCategory::Transactional.is_commercial());
        assert!(!IntentCategory::Investigational.is_commercial());
    }
}
