//! Quality gate configuration
//!
//! Scoring weights, compliance templates and keyword lists, anchor rules and
//! the trust-source registry. All of it is policy, injected at construction.

use crate::error::QualityError;
use linkbridge_model::text::host_of;
use linkbridge_model::{Severity, TrustTier, Vertical};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Score deductions per issue severity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Score of an issue-free article
    pub max_score: u32,
    /// Deduction per blocking issue
    pub blocking: u32,
    /// Deduction per warning
    pub warning: u32,
    /// Deduction per informational issue
    pub info: u32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            max_score: 100,
            blocking: 40,
            warning: 8,
            info: 2,
        }
    }
}

impl ScoringConfig {
    /// Deduction for one issue of `severity`
    #[inline]
    #[must_use]
    pub fn weight(&self, severity: Severity) -> u32 {
        match severity {
            Severity::Blocking => self.blocking,
            Severity::Warning => self.warning,
            Severity::Info => self.info,
        }
    }
}

/// A vetted fallback source the autofix may cite
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustSourceEntry {
    /// Link text
    pub name: String,
    /// Source URL
    pub url: String,
    /// Credibility tier
    pub tier: TrustTier,
    /// Topics the source is relevant for
    #[serde(default)]
    pub topics: Vec<String>,
}

impl TrustSourceEntry {
    /// Create an entry
    #[must_use]
    pub fn new<I, S>(name: &str, url: &str, tier: TrustTier, topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.to_string(),
            url: url.to_string(),
            tier,
            topics: topics.into_iter().map(Into::into).collect(),
        }
    }
}

/// Quality gate configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityConfig {
    /// Score deductions
    pub scoring: ScoringConfig,
    /// Disclaimer template per regulated vertical
    pub disclaimers: BTreeMap<Vertical, String>,
    /// Detection keywords per regulated vertical
    pub vertical_keywords: BTreeMap<Vertical, Vec<String>>,
    /// Distinct keywords needed before a vertical is detected
    pub vertical_min_hits: usize,
    /// Anchor labels classified as generic
    pub generic_anchor_phrases: Vec<String>,
    /// Share of partial-anchor tokens that must appear in the topical vocabulary
    pub weak_fit_threshold: f64,
    /// Standards bodies classified as tier 1 regardless of TLD
    pub standards_domains: Vec<String>,
    /// Media outlets classified as tier 4
    pub media_domains: Vec<String>,
    /// Sources the autofix may cite
    pub trust_registry: Vec<TrustSourceEntry>,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(ToString::to_string).collect()
}

impl Default for QualityConfig {
    fn default() -> Self {
        let disclaimers = BTreeMap::from([
            (
                Vertical::Finance,
                "This article is for general information only and is not financial advice."
                    .to_string(),
            ),
            (
                Vertical::Health,
                "This article is for general information only and is not a substitute for \
                 professional medical advice."
                    .to_string(),
            ),
            (
                Vertical::Legal,
                "This article is general information, not legal advice for your situation."
                    .to_string(),
            ),
            (
                Vertical::Gambling,
                "Play responsibly. Only adults of legal age may take part.".to_string(),
            ),
            (
                Vertical::Crypto,
                "Digital assets are highly volatile and you could lose the full amount you put in."
                    .to_string(),
            ),
        ]);

        let vertical_keywords = BTreeMap::from([
            (
                Vertical::Finance,
                strings(&[
                    "loan", "mortgage", "interest rate", "credit score", "investment",
                    "savings account", "retirement", "stock market", "tax return", "insurance",
                ]),
            ),
            (
                Vertical::Health,
                strings(&[
                    "medical", "medication", "symptom", "diagnosis", "treatment", "disease",
                    "doctor", "therapy", "prescription", "supplement",
                ]),
            ),
            (
                Vertical::Legal,
                strings(&[
                    "lawyer", "attorney", "lawsuit", "court", "litigation", "liability",
                    "legal advice", "contract law",
                ]),
            ),
            (
                Vertical::Gambling,
                strings(&[
                    "casino", "betting", "poker", "slots", "wager", "sportsbook", "jackpot",
                    "odds",
                ]),
            ),
            (
                Vertical::Crypto,
                strings(&[
                    "bitcoin", "crypto", "cryptocurrency", "blockchain", "ethereum", "altcoin",
                    "defi", "exchange wallet",
                ]),
            ),
        ]);

        Self {
            scoring: ScoringConfig::default(),
            disclaimers,
            vertical_keywords,
            vertical_min_hits: 2,
            generic_anchor_phrases: strings(&[
                "click here", "here", "this site", "this page", "this article", "read more",
                "learn more", "more info", "website", "visit",
            ]),
            weak_fit_threshold: 0.5,
            standards_domains: strings(&["iso.org", "w3.org", "ietf.org", "ieee.org", "nist.gov"]),
            media_domains: strings(&[
                "nytimes.com", "bbc.com", "bbc.co.uk", "theguardian.com", "reuters.com",
                "forbes.com", "cnn.com", "washingtonpost.com",
            ]),
            trust_registry: vec![
                TrustSourceEntry::new(
                    "US Department of Agriculture",
                    "https://www.usda.gov/",
                    TrustTier::Government,
                    ["agriculture", "gardening", "soil", "food"],
                ),
                TrustSourceEntry::new(
                    "World Health Organization",
                    "https://www.who.int/",
                    TrustTier::Government,
                    ["health", "nutrition", "medicine"],
                ),
                TrustSourceEntry::new(
                    "US Securities and Exchange Commission",
                    "https://www.sec.gov/",
                    TrustTier::Government,
                    ["finance", "investing", "crypto"],
                ),
                TrustSourceEntry::new(
                    "National Institute of Standards and Technology",
                    "https://www.nist.gov/",
                    TrustTier::Government,
                    ["standards", "technology", "security", "measurement"],
                ),
                TrustSourceEntry::new(
                    "Royal Horticultural Society",
                    "https://www.rhs.org.uk/",
                    TrustTier::Industry,
                    ["gardening", "plants", "soil"],
                ),
                TrustSourceEntry::new(
                    "MIT OpenCourseWare",
                    "https://ocw.mit.edu/",
                    TrustTier::Academic,
                    ["engineering", "science", "technology"],
                ),
            ],
        }
    }
}

impl QualityConfig {
    /// With scoring weights
    #[inline]
    #[must_use]
    pub fn with_scoring(mut self, scoring: ScoringConfig) -> Self {
        self.scoring = scoring;
        self
    }

    /// With a disclaimer template for `vertical`
    #[must_use]
    pub fn with_disclaimer(mut self, vertical: Vertical, template: impl Into<String>) -> Self {
        self.disclaimers.insert(vertical, template.into());
        self
    }

    /// Without a disclaimer template for `vertical`
    #[must_use]
    pub fn without_disclaimer(mut self, vertical: Vertical) -> Self {
        self.disclaimers.remove(&vertical);
        self
    }

    /// With trust registry
    #[inline]
    #[must_use]
    pub fn with_trust_registry(mut self, registry: Vec<TrustSourceEntry>) -> Self {
        self.trust_registry = registry;
        self
    }

    /// Reject unusable settings
    ///
    /// # Errors
    /// Returns [`QualityError::InvalidConfig`] naming the first violation
    pub fn validate(&self) -> Result<(), QualityError> {
        if self.scoring.max_score == 0 {
            return Err(QualityError::InvalidConfig("max_score must be positive".into()));
        }
        if self.vertical_min_hits == 0 {
            return Err(QualityError::InvalidConfig(
                "vertical_min_hits must be positive".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.weak_fit_threshold) {
            return Err(QualityError::InvalidConfig(format!(
                "weak_fit_threshold {} is outside [0, 1]",
                self.weak_fit_threshold
            )));
        }
        if let Some((vertical, _)) = self.disclaimers.iter().find(|(_, t)| t.trim().is_empty()) {
            return Err(QualityError::InvalidConfig(format!(
                "empty disclaimer template for {vertical}"
            )));
        }
        if let Some(entry) = self.trust_registry.iter().find(|e| host_of(&e.url).is_none()) {
            return Err(QualityError::InvalidConfig(format!(
                "trust registry entry '{}' has no usable URL",
                entry.name
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_every_vertical() {
        let config = QualityConfig::default();
        config.validate().unwrap();
        for vertical in Vertical::ALL {
            assert!(config.disclaimers.contains_key(&vertical));
            assert!(config.vertical_keywords.contains_key(&vertical));
        }
        assert_eq!(config.scoring.weight(Severity::Warning), 8);
    }

    #[test]
    fn rejects_blank_disclaimer() {
        let config = QualityConfig::default().with_disclaimer(Vertical::Legal, "  ");
        assert!(matches!(config.validate(), Err(QualityError::InvalidConfig(_))));
    }
}
