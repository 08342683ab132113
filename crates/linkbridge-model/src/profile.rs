//! Source profiles produced during preflight
//!
//! One profile per job input: the target page, the publisher site and the
//! proposed anchor label. Profiles are built by an external ingestor and
//! never modified afterwards.

use crate::intent::IntentCategory;
use crate::text::{dedup_normalized, host_of};
use serde::{Deserialize, Serialize};

/// Which job input a profile describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileRole {
    /// Destination URL
    Target,
    /// Publication site
    Publisher,
    /// Proposed link label
    Anchor,
}

impl ProfileRole {
    /// Stable label
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Target => "target",
            Self::Publisher => "publisher",
            Self::Anchor => "anchor",
        }
    }
}

/// Extracted summary of one input source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceProfile {
    /// Role of the profiled input
    pub role: ProfileRole,
    /// URL, domain or label that was profiled
    pub source: String,
    /// Content language (BCP-47 tag)
    pub language: String,
    /// Page or site title
    pub title: Option<String>,
    /// Brand name, when one was detected
    pub brand: Option<String>,
    /// Headings found on the page
    pub headings: Vec<String>,
    /// Topical focus
    pub topics: Vec<String>,
    /// Named entities
    pub entities: Vec<String>,
    /// Offer summary (target) or tone summary (publisher)
    pub summary: String,
    /// Page type hint (e.g. "product", "blog")
    pub page_type: Option<String>,
    /// Intent hint
    pub intent: IntentCategory,
    /// Brand-safety restrictions (publisher only)
    pub restrictions: Vec<String>,
}

impl SourceProfile {
    /// Create a profile with empty descriptive fields
    #[must_use]
    pub fn new(role: ProfileRole, source: impl Into<String>, intent: IntentCategory) -> Self {
        Self {
            role,
            source: source.into(),
            language: "en".to_string(),
            title: None,
            brand: None,
            headings: Vec::new(),
            topics: Vec::new(),
            entities: Vec::new(),
            summary: String::new(),
            page_type: None,
            intent,
            restrictions: Vec::new(),
        }
    }

    /// With language tag
    #[inline]
    #[must_use]
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// With title
    #[inline]
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// With brand name
    #[inline]
    #[must_use]
    pub fn with_brand(mut self, brand: impl Into<String>) -> Self {
        self.brand = Some(brand.into());
        self
    }

    /// With headings
    #[must_use]
    pub fn with_headings<I, S>(mut self, headings: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.headings = headings.into_iter().map(Into::into).collect();
        self
    }

    /// With topics
    #[must_use]
    pub fn with_topics<I, S>(mut self, topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.topics = topics.into_iter().map(Into::into).collect();
        self
    }

    /// With entities
    #[must_use]
    pub fn with_entities<I, S>(mut self, entities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entities = entities.into_iter().map(Into::into).collect();
        self
    }

    /// With offer or tone summary
    #[inline]
    #[must_use]
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    /// With page type hint
    #[inline]
    #[must_use]
    pub fn with_page_type(mut self, page_type: impl Into<String>) -> Self {
        self.page_type = Some(page_type.into());
        self
    }

    /// With brand-safety restrictions
    #[must_use]
    pub fn with_restrictions<I, S>(mut self, restrictions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.restrictions = restrictions.into_iter().map(Into::into).collect();
        self
    }

    /// Normalized topical focus: topics then entities, deduplicated
    #[must_use]
    pub fn focus_terms(&self) -> Vec<String> {
        dedup_normalized(self.topics.iter().chain(self.entities.iter()))
    }

    /// Host of the profiled source, if it is a URL or domain
    #[must_use]
    pub fn host(&self) -> Option<String> {
        host_of(&self.source)
    }
}

/// The three profiles of one job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileSet {
    /// Destination page
    pub target: SourceProfile,
    /// Publication site
    pub publisher: SourceProfile,
    /// Proposed link label
    pub anchor: SourceProfile,
}

impl ProfileSet {
    /// Group profiles
    #[must_use]
    pub fn new(target: SourceProfile, publisher: SourceProfile, anchor: SourceProfile) -> Self {
        Self {
            target,
            publisher,
            anchor,
        }
    }

    /// The anchor label as profiled
    #[inline]
    #[must_use]
    pub fn anchor_label(&self) -> &str {
        &self.anchor.source
    }
}
