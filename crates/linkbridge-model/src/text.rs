//! Text normalization helpers
//!
//! Term matching everywhere in the workspace goes through
//! [`normalize_term`]: lowercase, punctuation dropped as a word boundary,
//! whitespace collapsed. Stems and synonyms are never merged.

use once_cell::sync::Lazy;
use regex::Regex;
use std::borrow::Cow;
use std::collections::HashSet;

static LINK_TARGET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\]\([^)]*\)").expect("link target pattern is valid"));

/// Normalize a term or passage for matching
#[must_use]
pub fn normalize_term(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut boundary = false;
    for ch in input.chars() {
        if ch.is_alphanumeric() {
            if boundary && !out.is_empty() {
                out.push(' ');
            }
            boundary = false;
            out.extend(ch.to_lowercase());
        } else {
            boundary = true;
        }
    }
    out
}

/// Whole-word containment of a normalized term in a normalized passage
#[must_use]
pub fn contains_term(passage: &str, term: &str) -> bool {
    if term.is_empty() {
        return false;
    }
    let padded = format!(" {passage} ");
    padded.contains(&format!(" {term} "))
}

/// Normalize, drop empties and keep the first occurrence of each term
#[must_use]
pub fn dedup_normalized<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    items
        .into_iter()
        .map(|s| normalize_term(s.as_ref()))
        .filter(|s| !s.is_empty() && seen.insert(s.clone()))
        .collect()
}

/// Count words (tokens carrying at least one alphanumeric character)
#[must_use]
pub fn word_count(text: &str) -> usize {
    text.split_whitespace()
        .filter(|w| w.chars().any(char::is_alphanumeric))
        .count()
}

/// Replace markdown link targets `[text](url)` with `[text]`
///
/// Keeps URLs out of term matching.
#[must_use]
pub fn strip_link_targets(markdown: &str) -> Cow<'_, str> {
    LINK_TARGET.replace_all(markdown, "]")
}

/// Host part of a URL or bare domain, lowercased, without `www.`
#[must_use]
pub fn host_of(url: &str) -> Option<String> {
    let rest = url.trim();
    let rest = rest.split_once("://").map_or(rest, |(_, r)| r);
    let authority = rest.split(['/', '?', '#']).next()?;
    let authority = authority.rsplit_once('@').map_or(authority, |(_, h)| h);
    let host = authority.split(':').next()?.trim_end_matches('.');
    if host.is_empty() {
        return None;
    }
    let host = host.to_ascii_lowercase();
    Some(host.strip_prefix("www.").map(str::to_string).unwrap_or(host))
}

/// `host` equals `domain` or is a subdomain of it
#[must_use]
pub fn host_matches(host: &str, domain: &str) -> bool {
    let domain = domain.trim().trim_start_matches("www.").to_ascii_lowercase();
    if domain.is_empty() {
        return false;
    }
    host == domain || host.ends_with(&format!(".{domain}"))
}

/// URL comparison key: lowercased, trailing slash removed
#[must_use]
pub fn url_key(url: &str) -> String {
    url.trim().trim_end_matches('/').to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_lowercases_and_strips_punctuation() {
        assert_eq!(normalize_term("  Soil-Mix, RATIO!  "), "soil mix ratio");
        assert_eq!(normalize_term("..."), "");
    }

    #[test]
    fn contains_term_is_whole_word() {
        assert!(contains_term("raised bed soil mix", "soil mix"));
        assert!(!contains_term("raised bed soils mix", "soil"));
        assert!(!contains_term("anything", ""));
    }

    #[test]
    fn dedup_keeps_first_seen_order() {
        let terms = dedup_normalized(["Mulch", "bed height", "mulch.", ""]);
        assert_eq!(terms, vec!["mulch".to_string(), "bed height".to_string()]);
    }

    #[test]
    fn host_extraction() {
        assert_eq!(host_of("https://www.Example.com:8080/a?b"), Some("example.com".into()));
        assert_eq!(host_of("example.org"), Some("example.org".into()));
        assert_eq!(host_of("https://user@sub.example.org/x"), Some("sub.example.org".into()));
        assert_eq!(host_of("https:///nohost"), None);
    }

    #[test]
    fn host_matching_covers_subdomains() {
        assert!(host_matches("shop.example.com", "example.com"));
        assert!(host_matches("example.com", "www.example.com"));
        assert!(!host_matches("badexample.com", "example.com"));
    }

    #[test]
    fn link_targets_are_removed() {
        let stripped = strip_link_targets("see [the guide](https://a.gov/x.y) now");
        assert_eq!(stripped, "see [the guide] now");
    }

    #[test]
    fn counts_words() {
        assert_eq!(word_count("One two -- three."), 3);
    }
}
