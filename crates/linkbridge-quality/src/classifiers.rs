//! Rule-based classifiers used by the gate
//!
//! Each one implements [`Classifier`]; [`Classifiers`] bundles them behind
//! `Arc<dyn ...>` so a model-backed implementation can be swapped in.

use crate::config::QualityConfig;
use linkbridge_model::text::{contains_term, host_matches, host_of, normalize_term};
use linkbridge_model::{AnchorType, Classifier, PromptInput, TrustTier, Vertical};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Anchor label with the keyword and brand it is judged against
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnchorContext {
    /// Visible anchor text
    pub label: String,
    /// Main search keyword
    pub primary_keyword: String,
    /// Target brand
    pub brand: String,
}

impl PromptInput for AnchorContext {
    fn prompt(&self) -> String {
        format!(
            "anchor: {}\nkeyword: {}\nbrand: {}",
            self.label, self.primary_keyword, self.brand
        )
    }
}

/// Generic phrase, then brand, then keyword match
#[derive(Debug, Clone)]
pub struct AnchorTypeRules {
    generic_phrases: Vec<String>,
}

impl AnchorTypeRules {
    /// Create with the generic phrase list
    #[must_use]
    pub fn new(generic_phrases: &[String]) -> Self {
        Self {
            generic_phrases: generic_phrases.iter().map(|p| normalize_term(p)).collect(),
        }
    }
}

impl Classifier<AnchorContext> for AnchorTypeRules {
    type Category = AnchorType;

    fn classify(&self, input: &AnchorContext) -> AnchorType {
        let label = normalize_term(&input.label);
        let brand = normalize_term(&input.brand);
        if self.generic_phrases.contains(&label) {
            AnchorType::Generic
        } else if contains_term(&label, &brand) {
            AnchorType::Branded
        } else if label == normalize_term(&input.primary_keyword) {
            AnchorType::Exact
        } else {
            AnchorType::Partial
        }
    }
}

/// Tier by domain: standards bodies and public suffixes first, then
/// academia, then the media list; everything else is industry
///
/// `gov`, `mil` and `edu` count as the top-level label or as the label in
/// front of a two-letter country code (`gov.uk`, `edu.au`); `ac` only in
/// front of a country code. `int` only as the top-level label.
#[derive(Debug, Clone)]
pub struct TrustTierRules {
    standards: Vec<String>,
    media: Vec<String>,
}

impl TrustTierRules {
    /// Create with standards and media domain lists
    #[must_use]
    pub fn new(standards: &[String], media: &[String]) -> Self {
        Self {
            standards: standards.to_vec(),
            media: media.to_vec(),
        }
    }
}

impl Classifier<str> for TrustTierRules {
    type Category = TrustTier;

    fn classify(&self, url_or_host: &str) -> TrustTier {
        let Some(host) = host_of(url_or_host) else {
            return TrustTier::Industry;
        };
        let labels: Vec<&str> = host.split('.').collect();
        let public = public_suffix(&labels, &["gov", "mil"]) || labels.last() == Some(&"int");
        if public || self.standards.iter().any(|d| host_matches(&host, d)) {
            TrustTier::Government
        } else if public_suffix(&labels, &["edu"]) || country_second_level(&labels, &["ac"]) {
            TrustTier::Academic
        } else if self.media.iter().any(|d| host_matches(&host, d)) {
            TrustTier::Media
        } else {
            TrustTier::Industry
        }
    }
}

/// `labels` ends in one of `names`, or in one of `names` plus a country code
fn public_suffix(labels: &[&str], names: &[&str]) -> bool {
    match labels {
        [_, .., last] if names.contains(last) => true,
        _ => country_second_level(labels, names),
    }
}

/// `labels` ends in one of `names` followed by a two-letter country code
fn country_second_level(labels: &[&str], names: &[&str]) -> bool {
    match labels {
        [.., second, cc] => {
            names.contains(second) && cc.len() == 2 && cc.bytes().all(|b| b.is_ascii_alphabetic())
        }
        _ => false,
    }
}

/// An article passage checked against one regulated vertical
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerticalPassage {
    /// Vertical in question
    pub vertical: Vertical,
    /// Article text, disclaimers removed
    pub passage: String,
}

impl PromptInput for VerticalPassage {
    fn prompt(&self) -> String {
        format!("vertical: {}
passage: {}", self.vertical, self.passage)
    }
}

/// A passage belongs to a vertical once it has enough distinct keyword hits
#[derive(Debug, Clone)]
pub struct VerticalRules {
    keywords: BTreeMap<Vertical, Vec<String>>,
    min_hits: usize,
}

impl VerticalRules {
    /// Create with keyword lists and a minimum hit count
    #[must_use]
    pub fn new(keywords: &BTreeMap<Vertical, Vec<String>>, min_hits: usize) -> Self {
        Self {
            keywords: keywords
                .iter()
                .map(|(v, words)| (*v, words.iter().map(|w| normalize_term(w)).collect()))
                .collect(),
            min_hits,
        }
    }
}

impl Classifier<VerticalPassage> for VerticalRules {
    type Category = bool;

    fn classify(&self, input: &VerticalPassage) -> bool {
        let Some(words) = self.keywords.get(&input.vertical) else {
            return false;
        };
        let passage = normalize_term(&input.passage);
        words.iter().filter(|w| contains_term(&passage, w)).count() >= self.min_hits
    }
}

/// Classifiers the gate consults
#[derive(Clone)]
pub struct Classifiers {
    /// Anchor type
    pub anchor: Arc<dyn Classifier<AnchorContext, Category = AnchorType>>,
    /// Source tier
    pub trust: Arc<dyn Classifier<str, Category = TrustTier>>,
    /// Membership in a regulated vertical
    pub vertical: Arc<dyn Classifier<VerticalPassage, Category = bool>>,
}

impl fmt::Debug for Classifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Classifiers").finish_non_exhaustive()
    }
}

impl Classifiers {
    /// Deterministic rule-based set
    #[must_use]
    pub fn rule_based(config: &QualityConfig) -> Self {
        Self {
            anchor: Arc::new(AnchorTypeRules::new(&config.generic_anchor_phrases)),
            trust: Arc::new(TrustTierRules::new(
                &config.standards_domains,
                &config.media_domains,
            )),
            vertical: Arc::new(VerticalRules::new(
                &config.vertical_keywords,
                config.vertical_min_hits,
            )),
        }
    }

    /// With a different anchor classifier
    #[must_use]
    pub fn with_anchor(
        mut self,
        anchor: Arc<dyn Classifier<AnchorContext, Category = AnchorType>>,
    ) -> Self {
        self.anchor = anchor;
        self
    }

    /// With a different trust tier classifier
    #[must_use]
    pub fn with_trust(mut self, trust: Arc<dyn Classifier<str, Category = TrustTier>>) -> Self {
        self.trust = trust;
        self
    }

    /// With a different vertical classifier
    #[must_use]
    pub fn with_vertical(
        mut self,
        vertical: Arc<dyn Classifier<VerticalPassage, Category = bool>>,
    ) -> Self {
        self.vertical = vertical;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn anchor(label: &str) -> AnchorContext {
        AnchorContext {
            label: label.to_string(),
            primary_keyword: "raised bed soil".to_string(),
            brand: "GreenRoot".to_string(),
        }
    }

    #[test]
    fn anchor_rules_in_priority_order() {
        let rules = AnchorTypeRules::new(&QualityConfig::default().generic_anchor_phrases);
        assert_eq!(rules.classify(&anchor("Click here!")), AnchorType::Generic);
        assert_eq!(rules.classify(&anchor("GreenRoot soil")), AnchorType::Branded);
        assert_eq!(rules.classify(&anchor("Raised-bed soil")), AnchorType::Exact);
        assert_eq!(rules.classify(&anchor("soil for beds")), AnchorType::Partial);
    }

    #[test]
    fn tiers_by_domain() {
        let config = QualityConfig::default();
        let rules = TrustTierRules::new(&config.standards_domains, &config.media_domains);
        assert_eq!(rules.classify("https://www.usda.gov/x"), TrustTier::Government);
        assert_eq!(rules.classify("https://www.gov.uk/guidance"), TrustTier::Government);
        assert_eq!(rules.classify("https://www.who.int/"), TrustTier::Government);
        assert_eq!(rules.classify("https://data.gov.uk/"), TrustTier::Government);
        assert_eq!(rules.classify("https://www.iso.org/standard"), TrustTier::Government);
        assert_eq!(rules.classify("https://extension.umn.edu/"), TrustTier::Academic);
        assert_eq!(rules.classify("https://www.ox.ac.uk/"), TrustTier::Academic);
        assert_eq!(rules.classify("https://www.bbc.co.uk/news"), TrustTier::Media);
        assert_eq!(rules.classify("https://soilco.com/"), TrustTier::Industry);
    }

    #[test]
    fn public_labels_only_count_as_a_suffix() {
        let config = QualityConfig::default();
        let rules = TrustTierRules::new(&config.standards_domains, &config.media_domains);
        assert_eq!(rules.classify("https://gov.example.com/"), TrustTier::Industry);
        assert_eq!(rules.classify("https://gov.soil-deals-blog.com/post"), TrustTier::Industry);
        assert_eq!(rules.classify("https://mil.shop.net/"), TrustTier::Industry);
        assert_eq!(rules.classify("https://int.example.org/"), TrustTier::Industry);
        assert_eq!(rules.classify("https://www.gov.uk/"), TrustTier::Government);
        assert_eq!(rules.classify("https://example.edu.evil.com/"), TrustTier::Industry);
        assert_eq!(rules.classify("https://ac.example.com/"), TrustTier::Industry);
        assert_eq!(rules.classify("https://www.unimelb.edu.au/"), TrustTier::Academic);
    }

    fn passage(vertical: Vertical, text: &str) -> VerticalPassage {
        VerticalPassage {
            vertical,
            passage: text.to_string(),
        }
    }

    #[test]
    fn vertical_needs_minimum_distinct_hits() {
        let config = QualityConfig::default();
        let rules = VerticalRules::new(&config.vertical_keywords, 2);
        assert!(!rules.classify(&passage(Vertical::Finance, "A loan can help.")));
        assert!(rules.classify(&passage(Vertical::Finance, "Compare each loan and mortgage offer.")));
        assert!(!rules.classify(&passage(Vertical::Health, "Compare each loan and mortgage offer.")));
    }

    #[test]
    fn every_vertical_is_judged_on_its_own() {
        let config = QualityConfig::default();
        let rules = VerticalRules::new(&config.vertical_keywords, 2);
        let text = "Bitcoin, ethereum and blockchain, plus a loan and a mortgage.";
        let detected: Vec<_> = Vertical::ALL
            .into_iter()
            .filter(|v| rules.classify(&passage(*v, text)))
            .collect();
        assert_eq!(detected, vec![Vertical::Finance, Vertical::Crypto]);
    }
}
