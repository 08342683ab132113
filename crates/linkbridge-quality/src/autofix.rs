//! Single-pass autofix
//!
//! Maps each autofixable issue of a report onto the fixed remediation
//! catalog ([`AutoFixAction`]), applies the remediations once in catalog
//! order and re-runs the gate. The controller never loops; whether a second
//! pass is allowed is the pipeline's call.
//!
//! Every remediation is a text edit. The artifact is rebuilt after each one,
//! so later remediations see the structure the earlier ones produced.

use crate::error::QualityError;
use crate::gate::{disclaimer_present, is_excluded, QualityGate};
use linkbridge_model::text::{contains_term, host_of, normalize_term};
use linkbridge_model::{
    AlignmentVerdict, AutoFixAction, AutoFixEntry, Block, ContentHash, Criterion,
    GeneratedArtifact, GenerationConstraints, LinkSpan, QualityReport, QualityStatus,
};
use chrono::Utc;
use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::ops::Range;

/// Result of one autofix pass
#[derive(Debug, Clone, PartialEq)]
pub struct AutoFixOutcome {
    /// Artifact after all remediations
    pub artifact: GeneratedArtifact,
    /// Gate report for the fixed artifact
    pub report: QualityReport,
    /// One entry per attempted remediation
    pub log: Vec<AutoFixEntry>,
    /// Hash before the pass
    pub before: ContentHash,
    /// Hash after the pass
    pub after: ContentHash,
}

impl AutoFixOutcome {
    /// Whether the pass changed the text
    #[inline]
    #[must_use]
    pub fn changed(&self) -> bool {
        self.before != self.after
    }
}

/// An edited text and what was done
struct Fix {
    text: String,
    detail: String,
}

/// Applies the remediation catalog using the gate's configuration and classifiers
#[derive(Debug, Clone, Copy)]
pub struct AutoFixController<'g> {
    gate: &'g QualityGate,
}

impl<'g> AutoFixController<'g> {
    /// Create over a gate
    #[inline]
    #[must_use]
    pub fn new(gate: &'g QualityGate) -> Self {
        Self { gate }
    }

    /// Remediations for the report's autofixable issues, in catalog order,
    /// each paired with the first criterion that called for it
    #[must_use]
    pub fn plan(report: &QualityReport) -> Vec<(AutoFixAction, Criterion)> {
        let mut actions = BTreeMap::new();
        for issue in report.autofixable_issues() {
            if let Some(action) = remediation_for(issue.criterion) {
                actions.entry(action).or_insert(issue.criterion);
            }
        }
        actions.into_iter().collect()
    }

    /// Run one pass over `artifact`
    ///
    /// # Errors
    /// Returns [`QualityError::NotFixable`] unless the report's status is
    /// `pass_with_autofix`
    pub fn apply(
        &self,
        artifact: &GeneratedArtifact,
        constraints: &GenerationConstraints,
        verdict: &AlignmentVerdict,
        report: &QualityReport,
    ) -> Result<AutoFixOutcome, QualityError> {
        if report.status() != QualityStatus::PassWithAutofix {
            return Err(QualityError::NotFixable(report.status()));
        }

        let before = artifact.content_hash();
        let mut current = artifact.clone();
        let mut log = Vec::new();

        for (action, criterion) in Self::plan(report) {
            let (success, detail) = match self.remediate(action, &current, constraints) {
                Some(fix) if fix.text != current.text() => {
                    current = current.with_text(fix.text);
                    (true, fix.detail)
                }
                Some(fix) => (false, format!("{}; text unchanged", fix.detail)),
                None => (false, "nothing to change".to_string()),
            };
            tracing::info!(%action, %criterion, success, "{detail}");
            log.push(AutoFixEntry {
                action,
                criterion,
                timestamp: Utc::now(),
                success,
                detail,
            });
        }

        let after = current.content_hash();
        let report = self.gate.evaluate(&current, constraints, verdict);
        Ok(AutoFixOutcome {
            artifact: current,
            report,
            log,
            before,
            after,
        })
    }

    fn remediate(
        &self,
        action: AutoFixAction,
        artifact: &GeneratedArtifact,
        constraints: &GenerationConstraints,
    ) -> Option<Fix> {
        match action {
            AutoFixAction::UnlinkExcludedSource => self.unlink_excluded(artifact, constraints),
            AutoFixAction::TrimAnchorRepeats => trim_anchor_repeats(artifact, constraints),
            AutoFixAction::InsertAnchor => insert_anchor(artifact, constraints),
            AutoFixAction::RelocateAnchor => relocate_anchor(artifact, constraints),
            AutoFixAction::SwapAnchorType => self.swap_anchor_type(artifact, constraints),
            AutoFixAction::InjectTrustSource => self.inject_trust_source(artifact, constraints),
            AutoFixAction::InjectLsiTerms => self.inject_lsi_terms(artifact, constraints),
            AutoFixAction::AppendDisclaimer => self.append_disclaimer(artifact),
        }
    }

    fn unlink_excluded(
        &self,
        artifact: &GeneratedArtifact,
        constraints: &GenerationConstraints,
    ) -> Option<Fix> {
        let scan = self.gate.scan_trust_sources(artifact, constraints);
        if scan.excluded.is_empty() {
            return None;
        }
        let urls: Vec<&str> = scan.excluded.iter().map(|l| l.url.as_str()).collect();
        let edits = scan
            .excluded
            .iter()
            .map(|link| (link.range.clone(), label_source(artifact.text(), link)))
            .collect();
        Some(Fix {
            text: splice(artifact.text(), edits),
            detail: format!("unlinked {}", urls.join(", ")),
        })
    }

    fn swap_anchor_type(
        &self,
        artifact: &GeneratedArtifact,
        constraints: &GenerationConstraints,
    ) -> Option<Fix> {
        let current = self.gate.anchor_type(artifact, constraints)?;
        let policy = &constraints.anchor;
        let (label, kind) = [policy.brand_label.trim(), policy.label.trim()]
            .into_iter()
            .filter(|label| !label.is_empty())
            .map(|label| (label, self.gate.classify_anchor(label, constraints)))
            .find(|(_, kind)| *kind > current)?;
        let edits = artifact
            .anchor_links()
            .map(|link| (link.range.clone(), format!("[{label}]({})", link.url)))
            .collect();
        Some(Fix {
            text: splice(artifact.text(), edits),
            detail: format!("swapped {current} anchor for {kind} label '{label}'"),
        })
    }

    fn inject_trust_source(
        &self,
        artifact: &GeneratedArtifact,
        constraints: &GenerationConstraints,
    ) -> Option<Fix> {
        let required = &constraints.trust;
        let scan = self.gate.scan_trust_sources(artifact, constraints);
        let missing = (required.min as usize).saturating_sub(scan.sources.len());
        let tier_short = required
            .preferred_tier
            .filter(|preferred| !scan.best_tier().is_some_and(|best| best.meets(*preferred)));
        let wanted = if tier_short.is_some() { missing.max(1) } else { missing };
        if wanted == 0 {
            return None;
        }

        let topical = constraints
            .lsi
            .vocabulary
            .iter()
            .chain(constraints.required_subtopics.iter())
            .map(|t| normalize_term(t))
            .collect::<Vec<_>>()
            .join(" | ");

        let mut candidates: Vec<_> = self
            .gate
            .config()
            .trust_registry
            .iter()
            .enumerate()
            .filter_map(|(index, entry)| {
                let host = host_of(&entry.url)?;
                let cited = scan.sources.iter().any(|(h, _)| *h == host);
                if cited || is_excluded(&host, &required.excluded_domains) {
                    return None;
                }
                let tier_miss = tier_short.is_some_and(|preferred| !entry.tier.meets(preferred));
                let fit = entry
                    .topics
                    .iter()
                    .filter(|topic| contains_term(&topical, &normalize_term(topic)))
                    .count();
                Some(((tier_miss, Reverse(fit), entry.tier, index), entry))
            })
            .collect();
        candidates.sort_by(|a, b| a.0.cmp(&b.0));

        let picked: Vec<_> = candidates.into_iter().take(wanted).map(|(_, e)| e).collect();
        if picked.is_empty() {
            return None;
        }
        let citations: Vec<String> = picked
            .iter()
            .map(|entry| format!("[{}]({})", entry.name, entry.url))
            .collect();
        let names: Vec<&str> = picked.iter().map(|entry| entry.name.as_str()).collect();

        let sentence = format!("Further reading: {}.", citations.join(", "));
        let text = match anchor_block(artifact).or_else(|| last_paragraph(artifact)) {
            Some(block) => append_to_block(artifact.text(), &block.range, &sentence),
            None => format!("{}\n\n{sentence}\n", artifact.text().trim_end()),
        };
        Some(Fix {
            text,
            detail: format!("cited {}", names.join(", ")),
        })
    }

    fn inject_lsi_terms(
        &self,
        artifact: &GeneratedArtifact,
        constraints: &GenerationConstraints,
    ) -> Option<Fix> {
        let found = self.gate.lsi_terms(artifact, constraints);
        let missing = constraints.lsi.min.saturating_sub(found.len());
        if missing == 0 {
            return None;
        }
        let mut terms: Vec<String> = Vec::new();
        for term in &constraints.lsi.vocabulary {
            let term = normalize_term(term);
            if !term.is_empty() && !found.contains(&term) && !terms.contains(&term) {
                terms.push(term);
            }
            if terms.len() == missing {
                break;
            }
        }
        if terms.is_empty() {
            return None;
        }

        let offset = artifact.anchor_offset()?;
        let outline = artifact.outline();
        let sentence = outline.sentences.get(outline.sentence_at(offset)?)?;
        let text = artifact.text();
        let trimmed = text[sentence.range.clone()].trim_end();
        let mut at = sentence.range.start + trimmed.len();
        if trimmed.ends_with(['.', '!', '?']) {
            at -= 1;
        }
        let insertion = format!(" (see also: {})", terms.join(", "));
        Some(Fix {
            text: splice(text, vec![(at..at, insertion)]),
            detail: format!("added {}", terms.join(", ")),
        })
    }

    fn append_disclaimer(&self, artifact: &GeneratedArtifact) -> Option<Fix> {
        let disclaimers = &self.gate.config().disclaimers;
        let missing: Vec<_> = self
            .gate
            .detect_verticals(artifact)
            .into_iter()
            .filter_map(|vertical| disclaimers.get(&vertical).map(|t| (vertical, t)))
            .filter(|(_, template)| !disclaimer_present(artifact, template))
            .collect();
        if missing.is_empty() {
            return None;
        }
        let mut text = artifact.text().trim_end().to_string();
        for (_, template) in &missing {
            text.push_str(&format!("\n\n_{}_", template.trim()));
        }
        text.push('\n');
        let names: Vec<&str> = missing.iter().map(|(vertical, _)| vertical.as_str()).collect();
        Some(Fix {
            text,
            detail: format!("appended {} disclaimer", names.join(", ")),
        })
    }
}

fn remediation_for(criterion: Criterion) -> Option<AutoFixAction> {
    match criterion {
        Criterion::TrustSourceExcluded => Some(AutoFixAction::UnlinkExcludedSource),
        Criterion::AnchorRepetition => Some(AutoFixAction::TrimAnchorRepeats),
        Criterion::AnchorMissing => Some(AutoFixAction::InsertAnchor),
        Criterion::AnchorInHeading => Some(AutoFixAction::RelocateAnchor),
        Criterion::AnchorRisk => Some(AutoFixAction::SwapAnchorType),
        Criterion::TrustSourceCount | Criterion::TrustSourceTier => {
            Some(AutoFixAction::InjectTrustSource)
        }
        Criterion::LsiCount => Some(AutoFixAction::InjectLsiTerms),
        Criterion::ComplianceDisclaimer => Some(AutoFixAction::AppendDisclaimer),
        Criterion::WordCount | Criterion::IntentAlignment => None,
    }
}

fn trim_anchor_repeats(
    artifact: &GeneratedArtifact,
    constraints: &GenerationConstraints,
) -> Option<Fix> {
    let keep = constraints.anchor.max_repetitions as usize;
    let edits: Vec<_> = artifact
        .anchor_links()
        .skip(keep)
        .map(|link| (link.range.clone(), label_source(artifact.text(), link)))
        .collect();
    if edits.is_empty() {
        return None;
    }
    let detail = format!("unlinked {} extra anchor occurrences", edits.len());
    Some(Fix {
        text: splice(artifact.text(), edits),
        detail,
    })
}

fn insert_anchor(artifact: &GeneratedArtifact, constraints: &GenerationConstraints) -> Option<Fix> {
    let (index, _) = artifact.outline().paragraphs().next()?;
    let label = constraints.anchor.label.trim();
    let text = place_anchor(artifact, index, label, &constraints.anchor.target_url)?;
    Some(Fix {
        text,
        detail: format!("linked '{label}' in the first paragraph"),
    })
}

fn relocate_anchor(
    artifact: &GeneratedArtifact,
    constraints: &GenerationConstraints,
) -> Option<Fix> {
    let forbidden = &constraints.anchor.forbidden_heading_levels;
    let misplaced: Vec<_> = artifact
        .anchor_links()
        .filter(|link| {
            artifact
                .heading_level_of(link)
                .is_some_and(|level| forbidden.contains(&level))
        })
        .cloned()
        .collect();
    let first = misplaced.first()?;

    let edits = misplaced
        .iter()
        .map(|link| (link.range.clone(), label_source(artifact.text(), link)))
        .collect();
    let unlinked = artifact.with_text(splice(artifact.text(), edits));
    if unlinked.anchor().is_some() {
        return Some(Fix {
            text: unlinked.text().to_string(),
            detail: "unlinked anchor in heading, body occurrence kept".to_string(),
        });
    }

    // unlinking keeps block indices stable
    let heading = first.block;
    let outline = unlinked.outline();
    let target = outline
        .paragraphs()
        .find(|(index, _)| *index > heading)
        .or_else(|| outline.paragraphs().filter(|(index, _)| *index < heading).last())
        .map(|(index, _)| index)?;
    let label = label_source(artifact.text(), first);
    let text = place_anchor(&unlinked, target, &label, &first.url)?;
    Some(Fix {
        text,
        detail: format!("moved anchor '{}' out of a heading", first.text),
    })
}

/// Block holding the first anchor occurrence
fn anchor_block(artifact: &GeneratedArtifact) -> Option<&Block> {
    let anchor = artifact.anchor()?;
    artifact.outline().blocks.get(anchor.block)
}

fn last_paragraph(artifact: &GeneratedArtifact) -> Option<&Block> {
    artifact.outline().paragraphs().last().map(|(_, block)| block)
}

/// Link `label` where it already appears in the block, else add a sentence
fn place_anchor(
    artifact: &GeneratedArtifact,
    block_index: usize,
    label: &str,
    url: &str,
) -> Option<String> {
    let label = label.trim();
    if label.is_empty() {
        return None;
    }
    let block = artifact.outline().blocks.get(block_index)?;
    let text = artifact.text();
    if let Some(start) = find_unlinked(artifact, &block.range, label) {
        let end = start + label.len();
        let linked = format!("[{}]({url})", &text[start..end]);
        return Some(splice(text, vec![(start..end, linked)]));
    }
    let sentence = format!("Learn more about [{label}]({url}).");
    Some(append_to_block(text, &block.range, &sentence))
}

/// Case-insensitive whole-word occurrence of `label` outside existing links
fn find_unlinked(artifact: &GeneratedArtifact, range: &Range<usize>, label: &str) -> Option<usize> {
    let text = artifact.text();
    let needle = label.to_ascii_lowercase();
    let haystack = text[range.clone()].to_ascii_lowercase();
    let links = &artifact.outline().links;
    haystack
        .match_indices(&needle)
        .map(|(i, _)| range.start + i)
        .find(|&start| {
            let end = start + needle.len();
            let open = text[..start].chars().next_back().map_or(true, |c| !c.is_alphanumeric());
            let close = text[end..].chars().next().map_or(true, |c| !c.is_alphanumeric());
            open && close && !links.iter().any(|l| l.range.start < end && start < l.range.end)
        })
}

/// Append a sentence to the end of a block
fn append_to_block(text: &str, range: &Range<usize>, sentence: &str) -> String {
    let body = text[range.clone()].trim_end();
    let at = range.start + body.len();
    let separator = if body.ends_with(['.', '!', '?']) { " " } else { ". " };
    splice(text, vec![(at..at, format!("{separator}{sentence}"))])
}

/// Label of a link as written, inline markup included; `link.text` for
/// autolinks and other forms without brackets
fn label_source(text: &str, link: &LinkSpan) -> String {
    text.get(link.range.clone())
        .and_then(|syntax| syntax.strip_prefix('['))
        .and_then(|rest| rest.rfind("](").map(|end| rest[..end].to_string()))
        .unwrap_or_else(|| link.text.clone())
}

/// Apply non-overlapping byte-range replacements
fn splice(text: &str, mut edits: Vec<(Range<usize>, String)>) -> String {
    edits.sort_by(|a, b| b.0.start.cmp(&a.0.start));
    let mut out = text.to_string();
    for (range, replacement) in edits {
        out.replace_range(range, &replacement);
    }
    out
}
