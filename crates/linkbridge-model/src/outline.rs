//! Structural analysis of markdown articles
//!
//! Uses pulldown-cmark to locate headings, paragraphs and links by byte
//! range in the source text, then splits blocks into sentences so checks can
//! reason about "the sentences around the anchor".

use crate::text::word_count;
use pulldown_cmark::{Event, Parser, Tag, TagEnd};
use serde::{Deserialize, Serialize};
use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Opener {
    Heading,
    Paragraph,
    Item,
}

/// Kind of top-level text block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "level")]
pub enum BlockKind {
    /// Heading with its level (1-6)
    Heading(u8),
    /// Body paragraph (list items count as paragraphs)
    Paragraph,
}

/// A heading or paragraph with its byte range
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Block kind
    pub kind: BlockKind,
    /// Byte range in the source
    pub range: Range<usize>,
    /// Section number: 0 before the first heading, then one per heading
    pub section: usize,
}

impl Block {
    /// Heading level, if this is a heading
    #[inline]
    #[must_use]
    pub fn heading_level(&self) -> Option<u8> {
        match self.kind {
            BlockKind::Heading(level) => Some(level),
            BlockKind::Paragraph => None,
        }
    }

    /// Paragraph block
    #[inline]
    #[must_use]
    pub fn is_paragraph(&self) -> bool {
        self.kind == BlockKind::Paragraph
    }
}

/// An inline link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkSpan {
    /// Destination URL
    pub url: String,
    /// Visible link text
    pub text: String,
    /// Byte range of the whole link syntax
    pub range: Range<usize>,
    /// Index of the containing block
    pub block: usize,
}

/// A sentence inside a block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sentence {
    /// Byte range, trimmed of surrounding whitespace
    pub range: Range<usize>,
    /// Index of the containing block
    pub block: usize,
}

/// Headings, paragraphs, links and sentences of an article
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Outline {
    /// Blocks in document order
    pub blocks: Vec<Block>,
    /// Links in document order
    pub links: Vec<LinkSpan>,
    /// Sentences in document order; a heading counts as one sentence
    pub sentences: Vec<Sentence>,
    /// Rendered text of all blocks, one block per line
    pub plain_text: String,
}

impl Outline {
    /// Analyze markdown source
    #[must_use]
    pub fn parse(source: &str) -> Self {
        let mut outline = Self::default();
        // (block index, opening tag, nested items of the same kind)
        let mut current: Option<(usize, Opener, usize)> = None;
        let mut open_link: Option<LinkSpan> = None;
        let mut section = 0;

        for (event, range) in Parser::new(source).into_offset_iter() {
            match event {
                Event::Start(Tag::Heading { level, .. }) => {
                    section += 1;
                    let index = outline.push_block(BlockKind::Heading(level as u8), range, section);
                    current = Some((index, Opener::Heading, 0));
                }
                Event::Start(Tag::Paragraph) => {
                    if current.is_none() {
                        let index = outline.push_block(BlockKind::Paragraph, range, section);
                        current = Some((index, Opener::Paragraph, 0));
                    }
                }
                Event::Start(Tag::Item) => match current.as_mut() {
                    Some((_, Opener::Item, depth)) => *depth += 1,
                    Some(_) => {}
                    None => {
                        let index = outline.push_block(BlockKind::Paragraph, range, section);
                        current = Some((index, Opener::Item, 0));
                    }
                },
                Event::End(TagEnd::Heading(_)) => outline.close(&mut current, Opener::Heading),
                Event::End(TagEnd::Paragraph) => outline.close(&mut current, Opener::Paragraph),
                Event::End(TagEnd::Item) => match current.as_mut() {
                    Some((_, Opener::Item, depth)) if *depth > 0 => *depth -= 1,
                    _ => outline.close(&mut current, Opener::Item),
                },
                Event::Start(Tag::Link { dest_url, .. }) => {
                    if let Some((block, ..)) = current {
                        open_link = Some(LinkSpan {
                            url: dest_url.to_string(),
                            text: String::new(),
                            range,
                            block,
                        });
                    }
                }
                Event::End(TagEnd::Link) => {
                    if let Some(link) = open_link.take() {
                        outline.links.push(link);
                    }
                }
                Event::Text(text) | Event::Code(text) => {
                    if let Some(link) = open_link.as_mut() {
                        link.text.push_str(&text);
                    }
                    if current.is_some() {
                        outline.plain_text.push_str(&text);
                    }
                }
                Event::SoftBreak | Event::HardBreak => {
                    if current.is_some() {
                        outline.plain_text.push(' ');
                    }
                }
                _ => {}
            }
        }

        for (index, block) in outline.blocks.iter().enumerate() {
            match block.kind {
                BlockKind::Heading(_) => {
                    push_trimmed(source, block.range.clone(), index, &mut outline.sentences);
                }
                BlockKind::Paragraph => {
                    split_sentences(source, block.range.clone(), index, &mut outline.sentences);
                }
            }
        }

        outline
    }

    fn close(&mut self, current: &mut Option<(usize, Opener, usize)>, opener: Opener) {
        if matches!(current, Some((_, open, _)) if *open == opener) {
            *current = None;
            self.plain_text.push('\n');
        }
    }

    fn push_block(&mut self, kind: BlockKind, range: Range<usize>, section: usize) -> usize {
        self.blocks.push(Block {
            kind,
            range,
            section,
        });
        self.blocks.len() - 1
    }

    /// Index of the sentence containing a byte offset
    #[must_use]
    pub fn sentence_at(&self, offset: usize) -> Option<usize> {
        self.sentences
            .iter()
            .position(|s| s.range.start <= offset && offset < s.range.end)
    }

    /// Byte range covering `radius` sentences either side of `center`
    #[must_use]
    pub fn window(&self, center: usize, radius: usize) -> Option<Range<usize>> {
        if center >= self.sentences.len() {
            return None;
        }
        let lo = center.saturating_sub(radius);
        let hi = (center + radius).min(self.sentences.len() - 1);
        Some(self.sentences[lo].range.start..self.sentences[hi].range.end)
    }

    /// Words across all blocks
    #[inline]
    #[must_use]
    pub fn word_count(&self) -> usize {
        word_count(&self.plain_text)
    }

    /// Paragraph blocks with their indices
    pub fn paragraphs(&self) -> impl Iterator<Item = (usize, &Block)> {
        self.blocks.iter().enumerate().filter(|(_, b)| b.is_paragraph())
    }
}

fn split_sentences(source: &str, range: Range<usize>, block: usize, out: &mut Vec<Sentence>) {
    let slice = &source[range.clone()];
    let mut start = 0;
    let mut chars = slice.char_indices().peekable();
    while let Some((i, ch)) = chars.next() {
        if matches!(ch, '.' | '!' | '?') {
            let at_boundary = chars.peek().map_or(true, |(_, next)| next.is_whitespace());
            if at_boundary {
                let end = i + ch.len_utf8();
                push_trimmed(source, range.start + start..range.start + end, block, out);
                start = end;
            }
        }
    }
    push_trimmed(source, range.start + start..range.end, block, out);
}

fn push_trimmed(source: &str, range: Range<usize>, block: usize, out: &mut Vec<Sentence>) {
    let segment = &source[range.clone()];
    let trimmed = segment.trim();
    if trimmed.is_empty() {
        return;
    }
    let lead = segment.len() - segment.trim_start().len();
    let start = range.start + lead;
    out.push(Sentence {
        range: start..start + trimmed.len(),
        block,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const ARTICLE: &str = "# Title\n\nFirst one. Second [link](https://a.gov/x.y) here! Third?\n\n## Part [b](https://b.com)\n\nLast words.\n";

    #[test]
    fn finds_blocks_and_sections() {
        let outline = Outline::parse(ARTICLE);
        let kinds: Vec<_> = outline.blocks.iter().map(|b| b.kind).collect();
        assert_eq!(
            kinds,
            vec![
                BlockKind::Heading(1),
                BlockKind::Paragraph,
                BlockKind::Heading(2),
                BlockKind::Paragraph
            ]
        );
        let sections: Vec<_> = outline.blocks.iter().map(|b| b.section).collect();
        assert_eq!(sections, vec![1, 1, 2, 2]);
    }

    #[test]
    fn finds_links_with_ranges() {
        let outline = Outline::parse(ARTICLE);
        assert_eq!(outline.links.len(), 2);
        let first = &outline.links[0];
        assert_eq!(first.text, "link");
        assert_eq!(&ARTICLE[first.range.clone()], "[link](https://a.gov/x.y)");
        assert_eq!(first.block, 1);
        assert_eq!(outline.links[1].block, 2);
    }

    #[test]
    fn splits_sentences_without_breaking_urls() {
        let outline = Outline::parse(ARTICLE);
        let texts: Vec<_> = outline
            .sentences
            .iter()
            .map(|s| &ARTICLE[s.range.clone()])
            .collect();
        assert_eq!(
            texts,
            vec![
                "# Title",
                "First one.",
                "Second [link](https://a.gov/x.y) here!",
                "Third?",
                "## Part [b](https://b.com)",
                "Last words."
            ]
        );
    }

    #[test]
    fn window_clamps_at_edges() {
        let outline = Outline::parse(ARTICLE);
        let window = outline.window(0, 2).unwrap();
        assert_eq!(window.start, 0);
        assert_eq!(&ARTICLE[window.clone()][..7], "# Title");
        assert!(outline.window(99, 2).is_none());
    }

    #[test]
    fn plain_text_excludes_markup() {
        let outline = Outline::parse(ARTICLE);
        assert!(outline.plain_text.contains("Second link here!"));
        assert!(!outline.plain_text.contains("https"));
        assert_eq!(outline.word_count(), 11);
    }
}
