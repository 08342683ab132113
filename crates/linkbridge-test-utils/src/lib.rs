//! Testing utilities for the Linkbridge workspace
//!
//! Fixture profiles and search results that model to a strong bridge, an
//! article builder that produces drafts the default quality gate passes or
//! flags in known ways, and scripted collaborator fakes.

#![allow(missing_docs)]

use linkbridge_core::{
    CollaboratorError, Collaborators, ContentGenerator, ContextBundle, JobRequest,
    ProfileIngestor, SerpProvider,
};
use linkbridge_model::text::word_count;
use linkbridge_model::{
    GeneratedArtifact, GenerationConstraints, IntentCategory, ProfileRole, QueryResults,
    SerpResult, SourceProfile,
};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const TARGET_URL: &str = "https://www.greenroot-supply.com/raised-bed-soil";
pub const PUBLISHER: &str = "garden-weekly.com";
pub const ANCHOR_LABEL: &str = "raised bed soil mix";

/// Subtopics every fixture search result covers
pub const SUBTOPICS: [&str; 8] = [
    "bed height",
    "mulch",
    "watering schedule",
    "companion planting",
    "lumber choice",
    "pest control",
    "crop rotation",
    "seed spacing",
];

pub const USDA_NAME: &str = "US Department of Agriculture";
pub const USDA_URL: &str = "https://www.usda.gov/topics/gardening";

/// Two finance keywords, enough for the default vertical rules
pub const FINANCE_PARAGRAPH: &str =
    "Some readers pay for a new bed with a personal loan or add it to a mortgage.";

pub fn request() -> JobRequest {
    JobRequest::new(PUBLISHER, TARGET_URL, ANCHOR_LABEL)
}

pub fn target_profile(url: &str) -> SourceProfile {
    SourceProfile::new(ProfileRole::Target, url, IntentCategory::Informational)
        .with_title("Raised bed soil by GreenRoot")
        .with_brand("GreenRoot")
        .with_topics(["raised bed soil", "soil mix", "organic compost"])
        .with_entities(["GreenRoot"])
        .with_summary("Bagged soil blends for raised garden beds")
        .with_page_type("product")
}

pub fn publisher_profile(domain: &str) -> SourceProfile {
    SourceProfile::new(ProfileRole::Publisher, domain, IntentCategory::Informational)
        .with_title("Garden Weekly")
        .with_topics(SUBTOPICS.iter().copied().chain(["garden news"]))
        .with_summary("friendly, practical, second person")
        .with_page_type("blog")
}

pub fn anchor_profile(label: &str) -> SourceProfile {
    SourceProfile::new(ProfileRole::Anchor, label, IntentCategory::Informational)
}

/// Six informational guides covering every subtopic
pub fn query_results(query: &str) -> QueryResults {
    let results = (1..=6)
        .map(|rank| SerpResult {
            rank,
            url: format!("https://guides{rank}.example.org/{}", query.replace(' ', "-")),
            title: format!("{query} guide #{rank}"),
            intent: IntentCategory::Informational,
            archetype: "guide".to_string(),
            subtopics: SUBTOPICS.iter().map(ToString::to_string).collect(),
        })
        .collect();
    QueryResults::new(query, results)
}

const FILLER: [&str; 5] = [
    "Small changes made early in the year tend to pay off by late summer.",
    "Readers often tell us that a calm and patient approach beats a rushed weekend project.",
    "Start with what you already have in the shed before buying anything new.",
    "A short walk around the plot each morning shows what needs attention next.",
    "Notes kept in a simple notebook make the following season far easier to plan.",
];

const LEAD: [&str; 2] = [
    "Every spring the same question lands in our reader mail.",
    "This piece walks through the basics in plain words.",
];

/// Markdown article shaped for the default gate
///
/// The anchor sentence sits in the middle of the first body paragraph,
/// surrounded by the LSI terms, so the default two-sentence window sees all
/// of them. In heading mode the anchor is linked from a level-2 heading
/// instead and only half of the terms appear, after two lead sentences.
#[derive(Debug, Clone)]
pub struct ArticleBuilder {
    target_url: String,
    label: String,
    lsi_terms: Vec<String>,
    anchor_in_heading: bool,
    trust_link: Option<(String, String)>,
    extra: Vec<String>,
    words: usize,
}

impl Default for ArticleBuilder {
    fn default() -> Self {
        Self {
            target_url: TARGET_URL.to_string(),
            label: ANCHOR_LABEL.to_string(),
            lsi_terms: SUBTOPICS.iter().map(ToString::to_string).collect(),
            anchor_in_heading: false,
            trust_link: Some((USDA_NAME.to_string(), USDA_URL.to_string())),
            extra: Vec::new(),
            words: 1500,
        }
    }
}

impl ArticleBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn anchor_in_heading(mut self) -> Self {
        self.anchor_in_heading = true;
        self
    }

    #[must_use]
    pub fn without_trust_link(mut self) -> Self {
        self.trust_link = None;
        self
    }

    #[must_use]
    pub fn trust_link(mut self, name: &str, url: &str) -> Self {
        self.trust_link = Some((name.to_string(), url.to_string()));
        self
    }

    #[must_use]
    pub fn lsi_terms(mut self, terms: &[&str]) -> Self {
        self.lsi_terms = terms.iter().map(ToString::to_string).collect();
        self
    }

    /// Extra paragraph after the filler
    #[must_use]
    pub fn paragraph(mut self, text: &str) -> Self {
        self.extra.push(text.to_string());
        self
    }

    /// Minimum words before the extra paragraphs
    #[must_use]
    pub fn words(mut self, words: usize) -> Self {
        self.words = words;
        self
    }

    #[must_use]
    pub fn build(&self) -> String {
        let link = format!("[{}]({})", self.label, self.target_url);
        let chunks = chunk_terms(&self.lsi_terms, 4);

        let mut out = String::from("# Building better garden beds\n\n");
        let context = if self.anchor_in_heading {
            out.push_str(&format!("## Choosing a {link}\n\n"));
            vec![
                LEAD[0].to_string(),
                LEAD[1].to_string(),
                keep_in_mind(&chunks[0]),
                keep_in_mind(&chunks[1]),
            ]
        } else {
            out.push_str("## Planning the space\n\n");
            vec![
                keep_in_mind(&chunks[0]),
                keep_in_mind(&chunks[1]),
                format!("A good {link} makes the whole job easier."),
                keep_in_mind(&chunks[2]),
                keep_in_mind(&chunks[3]),
            ]
        };
        out.push_str(&context.join(" "));
        out.push_str("\n\n");

        if let Some((name, url)) = &self.trust_link {
            out.push_str(&format!("Field trials from the [{name}]({url}) back this up.\n\n"));
        }

        out.push_str("## Through the season\n\n");
        while word_count(&out) < self.words {
            out.push_str(&FILLER.join(" "));
            out.push_str("\n\n");
        }
        for paragraph in &self.extra {
            out.push_str(paragraph);
            out.push_str("\n\n");
        }
        out
    }

    #[must_use]
    pub fn artifact(&self) -> GeneratedArtifact {
        GeneratedArtifact::new(self.build(), self.target_url.clone())
    }
}

fn chunk_terms(terms: &[String], parts: usize) -> Vec<Vec<String>> {
    (0..parts)
        .map(|i| terms[i * terms.len() / parts..(i + 1) * terms.len() / parts].to_vec())
        .collect()
}

fn keep_in_mind(terms: &[String]) -> String {
    match terms {
        [] => "Take it one step at a time.".to_string(),
        [only] => format!("Keep {only} in mind."),
        [init @ .., last] => format!("Keep {} and {last} in mind.", init.join(", ")),
    }
}

/// Returns the fixture profiles; every call is counted
#[derive(Debug, Default)]
pub struct FixtureIngestor {
    calls: AtomicUsize,
    failure: Option<CollaboratorError>,
}

impl FixtureIngestor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call fails with `err`
    #[must_use]
    pub fn failing(err: CollaboratorError) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            failure: Some(err),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ProfileIngestor for FixtureIngestor {
    async fn profile(
        &self,
        role: ProfileRole,
        input: &str,
    ) -> Result<SourceProfile, CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        Ok(match role {
            ProfileRole::Target => target_profile(input),
            ProfileRole::Publisher => publisher_profile(input),
            ProfileRole::Anchor => anchor_profile(input),
        })
    }
}

/// Answers every query with [`query_results`] and records the queries
#[derive(Debug, Default)]
pub struct FixtureSerp {
    queries: Mutex<Vec<String>>,
    empty: bool,
}

impl FixtureSerp {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Result sets carry no results
    #[must_use]
    pub fn without_results() -> Self {
        Self {
            queries: Mutex::new(Vec::new()),
            empty: true,
        }
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().clone()
    }
}

#[async_trait::async_trait]
impl SerpProvider for FixtureSerp {
    async fn research(&self, queries: &[String]) -> Result<Vec<QueryResults>, CollaboratorError> {
        self.queries.lock().extend(queries.iter().cloned());
        Ok(queries
            .iter()
            .map(|query| {
                if self.empty {
                    QueryResults::new(query.as_str(), Vec::new())
                } else {
                    query_results(query)
                }
            })
            .collect())
    }
}

/// Replays scripted replies, then the fallback draft (if any)
///
/// Also tracks how many calls overlapped, for limiter tests.
#[derive(Debug, Default)]
pub struct ScriptedGenerator {
    script: Mutex<VecDeque<Result<String, CollaboratorError>>>,
    fallback: Option<String>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedGenerator {
    /// Answers every call with `text`
    #[must_use]
    pub fn replying(text: impl Into<String>) -> Self {
        Self {
            fallback: Some(text.into()),
            ..Self::default()
        }
    }

    /// Queue one reply ahead of the fallback
    #[must_use]
    pub fn then(self, reply: Result<String, CollaboratorError>) -> Self {
        self.script.lock().push_back(reply);
        self
    }

    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl ContentGenerator for ScriptedGenerator {
    async fn generate(
        &self,
        constraints: &GenerationConstraints,
        _context: &ContextBundle,
    ) -> Result<GeneratedArtifact, CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = InFlight(&self.in_flight);
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let reply = self.script.lock().pop_front();
        let text = match reply {
            Some(reply) => reply?,
            None => self
                .fallback
                .clone()
                .ok_or_else(|| CollaboratorError::Generation("script exhausted".into()))?,
        };
        Ok(GeneratedArtifact::new(text, constraints.anchor.target_url.clone()))
    }
}

/// Fakes wired together, kept as concrete types for assertions
#[derive(Debug, Clone)]
pub struct Fixture {
    pub ingestor: Arc<FixtureIngestor>,
    pub serp: Arc<FixtureSerp>,
    pub generator: Arc<ScriptedGenerator>,
}

impl Fixture {
    #[must_use]
    pub fn new(generator: ScriptedGenerator) -> Self {
        Self {
            ingestor: Arc::new(FixtureIngestor::new()),
            serp: Arc::new(FixtureSerp::new()),
            generator: Arc::new(generator),
        }
    }

    /// Generator that always returns the default article
    #[must_use]
    pub fn passing() -> Self {
        Self::new(ScriptedGenerator::replying(ArticleBuilder::new().build()))
    }

    #[must_use]
    pub fn with_ingestor(mut self, ingestor: FixtureIngestor) -> Self {
        self.ingestor = Arc::new(ingestor);
        self
    }

    #[must_use]
    pub fn with_serp(mut self, serp: FixtureSerp) -> Self {
        self.serp = Arc::new(serp);
        self
    }

    #[must_use]
    pub fn collaborators(&self) -> Collaborators {
        Collaborators::new(
            self.ingestor.clone(),
            self.serp.clone(),
            self.generator.clone(),
        )
    }
}
