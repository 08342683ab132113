//! Quality gate
//!
//! Runs a fixed sequence of checks over an artifact and turns their findings
//! into a [`QualityReport`]. Checks are pure functions of
//! `(artifact, constraints, verdict)` and the configuration, so the same
//! inputs always yield the same report.
//!
//! # Blocking criteria
//! - word count below the minimum
//! - zero trust sources
//! - high anchor risk
//! - regulated vertical without a configured disclaimer template
//! - overall alignment off
//!
//! Everything else is an autofixable warning.

use crate::classifiers::{AnchorContext, Classifiers, VerticalPassage};
use crate::config::QualityConfig;
use linkbridge_model::text::{contains_term, host_matches, host_of, normalize_term, strip_link_targets};
use linkbridge_model::{
    Alignment, AlignmentVerdict, AnchorRisk, AnchorType, Criterion, GeneratedArtifact,
    GenerationConstraints, LinkSpan, QualityIssue, QualityMetrics, QualityReport, TrustTier,
    Vertical,
};
use std::collections::BTreeMap;
use std::ops::Range;

/// Outbound links split into countable trust sources and excluded domains
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct TrustScan {
    /// Distinct countable hosts with their tier, first-seen order
    pub(crate) sources: Vec<(String, TrustTier)>,
    /// Links to the target or competitors
    pub(crate) excluded: Vec<LinkSpan>,
}

impl TrustScan {
    pub(crate) fn best_tier(&self) -> Option<TrustTier> {
        self.sources.iter().map(|(_, tier)| *tier).min()
    }
}

/// Deterministic multi-criterion gate
#[derive(Debug, Clone)]
pub struct QualityGate {
    config: QualityConfig,
    classifiers: Classifiers,
}

impl QualityGate {
    /// Gate with rule-based classifiers
    #[must_use]
    pub fn new(config: QualityConfig) -> Self {
        let classifiers = Classifiers::rule_based(&config);
        Self {
            config,
            classifiers,
        }
    }

    /// Replace the classifiers
    #[inline]
    #[must_use]
    pub fn with_classifiers(mut self, classifiers: Classifiers) -> Self {
        self.classifiers = classifiers;
        self
    }

    /// Configuration in use
    #[inline]
    #[must_use]
    pub fn config(&self) -> &QualityConfig {
        &self.config
    }

    /// Evaluate an artifact
    #[must_use]
    pub fn evaluate(
        &self,
        artifact: &GeneratedArtifact,
        constraints: &GenerationConstraints,
        verdict: &AlignmentVerdict,
    ) -> QualityReport {
        let mut issues = Vec::new();
        let mut metrics = QualityMetrics {
            word_count: artifact.word_count(),
            anchor_count: artifact.anchor_links().count(),
            ..QualityMetrics::default()
        };

        if metrics.word_count < constraints.min_words {
            issues.push(QualityIssue::blocking(
                Criterion::WordCount,
                format!(
                    "article has {} words, minimum is {}",
                    metrics.word_count, constraints.min_words
                ),
            ));
        }

        let trust = self.scan_trust_sources(artifact, constraints);
        metrics.trust_sources = trust.sources.iter().map(|(host, _)| host.clone()).collect();
        metrics.best_tier = trust.best_tier();

        if metrics.anchor_count == 0 {
            issues.push(QualityIssue::warning(
                Criterion::AnchorMissing,
                format!("no link to {}", constraints.anchor.target_url),
            ));
        } else {
            self.check_anchor_placement(artifact, constraints, &mut issues);
            metrics.lsi_terms = self.lsi_terms(artifact, constraints);
            if metrics.lsi_terms.len() < constraints.lsi.min {
                issues.push(QualityIssue::warning(
                    Criterion::LsiCount,
                    format!(
                        "{} distinct LSI terms within {} sentences of the anchor, {} required",
                        metrics.lsi_terms.len(),
                        constraints.lsi.window_sentences,
                        constraints.lsi.min
                    ),
                ));
            }
        }

        check_trust(&trust, constraints, &mut issues);

        if metrics.anchor_count > 0 {
            let anchor_type = self.anchor_type(artifact, constraints);
            let risk = self.anchor_risk(artifact, constraints, anchor_type, &metrics, &trust);
            metrics.anchor_type = anchor_type;
            metrics.anchor_risk = Some(risk);
            match risk {
                AnchorRisk::High => issues.push(QualityIssue::blocking(
                    Criterion::AnchorRisk,
                    "high anchor risk: exact-match commercial anchor without context, \
                     or repeated within one section",
                )),
                AnchorRisk::Medium => issues.push(QualityIssue::warning(
                    Criterion::AnchorRisk,
                    format!(
                        "medium anchor risk for {} anchor",
                        anchor_type.map_or("unclassified", AnchorType::as_str)
                    ),
                )),
                AnchorRisk::Low => {}
            }
        }

        metrics.verticals = self.detect_verticals(artifact);
        for &vertical in &metrics.verticals {
            match self.config.disclaimers.get(&vertical) {
                None => issues.push(QualityIssue::blocking(
                    Criterion::ComplianceDisclaimer,
                    format!("{vertical} content detected and no disclaimer template is configured"),
                )),
                Some(template) if !disclaimer_present(artifact, template) => {
                    issues.push(QualityIssue::warning(
                        Criterion::ComplianceDisclaimer,
                        format!("{vertical} content detected without its disclaimer"),
                    ));
                }
                Some(_) => {}
            }
        }

        if verdict.overall() == Alignment::Off {
            issues.push(QualityIssue::blocking(
                Criterion::IntentAlignment,
                format!(
                    "overall intent alignment is off (anchor {}, target {}, publisher {})",
                    verdict.anchor_vs_serp(),
                    verdict.target_vs_serp(),
                    verdict.publisher_vs_serp()
                ),
            ));
        }

        for issue in &issues {
            tracing::debug!(
                criterion = %issue.criterion,
                severity = ?issue.severity,
                autofixable = issue.autofixable,
                "{}",
                issue.description
            );
        }

        let deductions: u32 = issues
            .iter()
            .map(|i| self.config.scoring.weight(i.severity))
            .sum();
        let score = self.config.scoring.max_score.saturating_sub(deductions);
        QualityReport::new(issues, score, metrics)
    }

    fn check_anchor_placement(
        &self,
        artifact: &GeneratedArtifact,
        constraints: &GenerationConstraints,
        issues: &mut Vec<QualityIssue>,
    ) {
        let policy = &constraints.anchor;
        let in_heading = artifact
            .anchor_links()
            .filter_map(|link| artifact.heading_level_of(link))
            .find(|level| policy.forbidden_heading_levels.contains(level));
        if let Some(level) = in_heading {
            issues.push(QualityIssue::warning(
                Criterion::AnchorInHeading,
                format!("anchor placed in a level-{level} heading"),
            ));
        }

        let count = artifact.anchor_links().count();
        if count > policy.max_repetitions as usize {
            issues.push(QualityIssue::warning(
                Criterion::AnchorRepetition,
                format!(
                    "anchor used {count} times, at most {} allowed",
                    policy.max_repetitions
                ),
            ));
        }
    }

    /// Distinct vocabulary terms in the anchor window, anchor text excluded
    pub(crate) fn lsi_terms(
        &self,
        artifact: &GeneratedArtifact,
        constraints: &GenerationConstraints,
    ) -> Vec<String> {
        let Some(passage) = window_passage(artifact, constraints.lsi.window_sentences) else {
            return Vec::new();
        };
        let mut found: Vec<String> = Vec::new();
        for term in &constraints.lsi.vocabulary {
            let term = normalize_term(term);
            if contains_term(&passage, &term) && !found.contains(&term) {
                found.push(term);
            }
        }
        found
    }

    /// Classify outbound links
    pub(crate) fn scan_trust_sources(
        &self,
        artifact: &GeneratedArtifact,
        constraints: &GenerationConstraints,
    ) -> TrustScan {
        let mut scan = TrustScan::default();
        for link in artifact.outbound_links() {
            let Some(host) = host_of(&link.url) else {
                continue;
            };
            if is_excluded(&host, &constraints.trust.excluded_domains) {
                scan.excluded.push(link.clone());
            } else if !scan.sources.iter().any(|(h, _)| *h == host) {
                let tier = self.classifiers.trust.classify(link.url.as_str());
                scan.sources.push((host, tier));
            }
        }
        scan
    }

    /// Type of the first anchor occurrence's visible text
    pub(crate) fn anchor_type(
        &self,
        artifact: &GeneratedArtifact,
        constraints: &GenerationConstraints,
    ) -> Option<AnchorType> {
        let anchor = artifact.anchor()?;
        Some(self.classify_anchor(&anchor.text, constraints))
    }

    pub(crate) fn classify_anchor(&self, label: &str, constraints: &GenerationConstraints) -> AnchorType {
        self.classifiers.anchor.classify(&AnchorContext {
            label: label.to_string(),
            primary_keyword: constraints.anchor.primary_keyword.clone(),
            brand: constraints.anchor.brand_label.clone(),
        })
    }

    fn anchor_risk(
        &self,
        artifact: &GeneratedArtifact,
        constraints: &GenerationConstraints,
        anchor_type: Option<AnchorType>,
        metrics: &QualityMetrics,
        trust: &TrustScan,
    ) -> AnchorRisk {
        let mut per_section: BTreeMap<usize, usize> = BTreeMap::new();
        for link in artifact.anchor_links() {
            *per_section.entry(artifact.section_of(link)).or_insert(0) += 1;
        }
        let stacked = per_section.values().any(|&n| n >= 2);
        let bare_exact = anchor_type == Some(AnchorType::Exact)
            && constraints.anchor.commercial_intent
            && metrics.lsi_terms.is_empty();
        if stacked || bare_exact {
            return AnchorRisk::High;
        }

        match anchor_type {
            Some(AnchorType::Generic) if !trust_link_in_window(artifact, constraints, trust) => {
                AnchorRisk::Medium
            }
            Some(AnchorType::Partial)
                if self.topical_fit(artifact, constraints) < self.config.weak_fit_threshold =>
            {
                AnchorRisk::Medium
            }
            _ => AnchorRisk::Low,
        }
    }

    /// Share of anchor tokens found in the keyword or LSI vocabulary
    #[allow(clippy::cast_precision_loss)]
    fn topical_fit(&self, artifact: &GeneratedArtifact, constraints: &GenerationConstraints) -> f64 {
        let Some(anchor) = artifact.anchor() else {
            return 0.0;
        };
        let label = normalize_term(&anchor.text);
        let tokens: Vec<&str> = label.split(' ').filter(|t| !t.is_empty()).collect();
        if tokens.is_empty() {
            return 0.0;
        }
        let topical = std::iter::once(&constraints.anchor.primary_keyword)
            .chain(constraints.lsi.vocabulary.iter())
            .map(|t| normalize_term(t))
            .collect::<Vec<_>>()
            .join(" ");
        let hits = tokens.iter().filter(|t| contains_term(&topical, t)).count();
        hits as f64 / tokens.len() as f64
    }

    /// Regulated verticals of the article body, disclaimers excluded
    pub(crate) fn detect_verticals(&self, artifact: &GeneratedArtifact) -> Vec<Vertical> {
        let mut passage = normalize_term(&artifact.outline().plain_text);
        for template in self.config.disclaimers.values() {
            let template = normalize_term(template);
            if !template.is_empty() {
                passage = passage.replace(&template, " ");
            }
        }
        Vertical::ALL
            .into_iter()
            .filter(|vertical| {
                self.classifiers.vertical.classify(&VerticalPassage {
                    vertical: *vertical,
                    passage: passage.clone(),
                })
            })
            .collect()
    }
}

fn check_trust(trust: &TrustScan, constraints: &GenerationConstraints, issues: &mut Vec<QualityIssue>) {
    let required = &constraints.trust;
    let count = trust.sources.len();
    if count == 0 {
        issues.push(QualityIssue::blocking(
            Criterion::TrustSourceCount,
            format!("no trust sources cited, {} required", required.min),
        ));
    } else if count < required.min as usize {
        issues.push(QualityIssue::warning(
            Criterion::TrustSourceCount,
            format!("{count} trust sources cited, {} required", required.min),
        ));
    }

    if let (Some(preferred), Some(best)) = (required.preferred_tier, trust.best_tier()) {
        if !best.meets(preferred) {
            issues.push(QualityIssue::warning(
                Criterion::TrustSourceTier,
                format!("best trust source is {best}, {preferred} preferred"),
            ));
        }
    }

    if !trust.excluded.is_empty() {
        let urls: Vec<&str> = trust.excluded.iter().map(|l| l.url.as_str()).collect();
        issues.push(QualityIssue::warning(
            Criterion::TrustSourceExcluded,
            format!("links to excluded domains: {}", urls.join(", ")),
        ));
    }
}

pub(crate) fn is_excluded(host: &str, excluded: &[String]) -> bool {
    excluded.iter().any(|domain| host_matches(host, domain))
}

/// Normalized text of the anchor window with anchor links cut out
pub(crate) fn window_passage(artifact: &GeneratedArtifact, radius: usize) -> Option<String> {
    let window = artifact.context_window(radius)?;
    let text = artifact.text();
    let mut raw = String::new();
    let mut cursor = window.start;
    for link in artifact.anchor_links() {
        if link.range.start >= cursor && link.range.end <= window.end {
            raw.push_str(&text[cursor..link.range.start]);
            raw.push(' ');
            cursor = link.range.end;
        }
    }
    raw.push_str(&text[cursor..window.end]);
    Some(normalize_term(&strip_link_targets(&raw)))
}

fn within(range: &Range<usize>, window: &Range<usize>) -> bool {
    range.start >= window.start && range.end <= window.end
}

fn trust_link_in_window(
    artifact: &GeneratedArtifact,
    constraints: &GenerationConstraints,
    trust: &TrustScan,
) -> bool {
    let Some(window) = artifact.context_window(constraints.lsi.window_sentences) else {
        return false;
    };
    artifact.outbound_links().any(|link| {
        within(&link.range, &window)
            && host_of(&link.url)
                .is_some_and(|host| trust.sources.iter().any(|(h, _)| *h == host))
    })
}

pub(crate) fn disclaimer_present(artifact: &GeneratedArtifact, template: &str) -> bool {
    let passage = normalize_term(&artifact.outline().plain_text);
    contains_term(&passage, &normalize_term(template))
}
