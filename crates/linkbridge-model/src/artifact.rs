//! Generated article plus its structural metadata
//!
//! The text is the only source of truth. The [`Outline`] is derived from it
//! on construction and again on deserialization, so metadata can never drift
//! from the content it describes.

use crate::hash::ContentHash;
use crate::outline::{LinkSpan, Outline};
use crate::text::url_key;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Markdown article returned by the content generator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ArtifactSource")]
pub struct GeneratedArtifact {
    text: String,
    anchor_url: String,
    #[serde(skip_serializing)]
    outline: Outline,
}

#[derive(Deserialize)]
struct ArtifactSource {
    text: String,
    anchor_url: String,
}

impl From<ArtifactSource> for GeneratedArtifact {
    fn from(source: ArtifactSource) -> Self {
        Self::new(source.text, source.anchor_url)
    }
}

impl GeneratedArtifact {
    /// Analyze `text`; links pointing at `anchor_url` are anchor occurrences
    #[must_use]
    pub fn new(text: impl Into<String>, anchor_url: impl Into<String>) -> Self {
        let text = text.into();
        let outline = Outline::parse(&text);
        Self {
            text,
            anchor_url: anchor_url.into(),
            outline,
        }
    }

    /// Same anchor destination, new text
    #[must_use]
    pub fn with_text(&self, text: impl Into<String>) -> Self {
        Self::new(text, self.anchor_url.clone())
    }

    /// Markdown source
    #[inline]
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Anchor destination URL
    #[inline]
    #[must_use]
    pub fn anchor_url(&self) -> &str {
        &self.anchor_url
    }

    /// Structural metadata
    #[inline]
    #[must_use]
    pub fn outline(&self) -> &Outline {
        &self.outline
    }

    /// Blake3 hash of the text
    #[must_use]
    pub fn content_hash(&self) -> ContentHash {
        ContentHash::of_text(&self.text)
    }

    /// Words across all blocks
    #[inline]
    #[must_use]
    pub fn word_count(&self) -> usize {
        self.outline.word_count()
    }

    /// All links to the anchor destination, in document order
    pub fn anchor_links(&self) -> impl Iterator<Item = &LinkSpan> {
        let key = url_key(&self.anchor_url);
        self.outline
            .links
            .iter()
            .filter(move |link| url_key(&link.url) == key)
    }

    /// First anchor occurrence
    #[must_use]
    pub fn anchor(&self) -> Option<&LinkSpan> {
        self.anchor_links().next()
    }

    /// Links to anything other than the anchor destination
    pub fn outbound_links(&self) -> impl Iterator<Item = &LinkSpan> {
        let key = url_key(&self.anchor_url);
        self.outline
            .links
            .iter()
            .filter(move |link| url_key(&link.url) != key)
    }

    /// Byte offset of the first anchor occurrence
    #[must_use]
    pub fn anchor_offset(&self) -> Option<usize> {
        self.anchor().map(|link| link.range.start)
    }

    /// Heading level of the block holding `link`, if it is a heading
    #[must_use]
    pub fn heading_level_of(&self, link: &LinkSpan) -> Option<u8> {
        self.outline
            .blocks
            .get(link.block)
            .and_then(|block| block.heading_level())
    }

    /// Section number of the block holding `link`
    #[must_use]
    pub fn section_of(&self, link: &LinkSpan) -> usize {
        self.outline
            .blocks
            .get(link.block)
            .map_or(0, |block| block.section)
    }

    /// Byte range of `radius` sentences either side of the first anchor
    #[must_use]
    pub fn context_window(&self, radius: usize) -> Option<Range<usize>> {
        let offset = self.anchor_offset()?;
        let center = self.outline.sentence_at(offset)?;
        self.outline.window(center, radius)
    }

    /// Text of the anchor context window
    #[must_use]
    pub fn context_text(&self, radius: usize) -> Option<&str> {
        self.context_window(radius).map(|range| &self.text[range])
    }

    /// Heading boundaries: (level, byte range)
    pub fn headings(&self) -> impl Iterator<Item = (u8, Range<usize>)> + '_ {
        self.outline
            .blocks
            .iter()
            .filter_map(|block| block.heading_level().map(|level| (level, block.range.clone())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const TARGET: &str = "https://shop.example.com/soil";

    fn article() -> GeneratedArtifact {
        GeneratedArtifact::new(
            "# Guide\n\nIntro text here. Pick a [soil mix](https://shop.example.com/soil/) \
             for beds. See [USDA](https://www.usda.gov/x) too. Done.\n\n## More\n\nTail.\n",
            TARGET,
        )
    }

    #[test]
    fn anchor_matches_ignoring_trailing_slash() {
        let artifact = article();
        assert_eq!(artifact.anchor_links().count(), 1);
        assert_eq!(artifact.anchor().unwrap().text, "soil mix");
        assert_eq!(artifact.outbound_links().count(), 1);
        assert_eq!(artifact.heading_level_of(artifact.anchor().unwrap()), None);
        assert_eq!(artifact.section_of(artifact.anchor().unwrap()), 1);
    }

    #[test]
    fn context_window_spans_neighbouring_sentences() {
        let artifact = article();
        let window = artifact.context_text(1).unwrap();
        assert!(window.starts_with("Intro text here."));
        assert!(window.ends_with("too."));
        let wide = artifact.context_text(2).unwrap();
        assert!(wide.starts_with("# Guide"));
        assert!(wide.ends_with("Done."));
    }

    #[test]
    fn deserialization_rebuilds_outline() {
        let artifact = article();
        let json = serde_json::to_string(&artifact).unwrap();
        assert!(!json.contains("outline"));
        let back: GeneratedArtifact = serde_json::from_str(&json).unwrap();
        assert_eq!(back, artifact);
        assert_eq!(back.content_hash(), artifact.content_hash());
    }

    #[test]
    fn hash_tracks_text() {
        let artifact = article();
        let edited = artifact.with_text(format!("{}\nMore.", artifact.text()));
        assert_ne!(edited.content_hash(), artifact.content_hash());
        assert_eq!(edited.anchor_url(), TARGET);
    }

    #[test]
    fn missing_anchor_has_no_window() {
        let artifact = GeneratedArtifact::new("Plain text only.", TARGET);
        assert!(artifact.anchor().is_none());
        assert!(artifact.context_window(2).is_none());
        assert_eq!(artifact.headings().count(), 0);
    }
}
