//! Classifier capability
//!
//! Heuristic labelling (anchor type, source tier, regulated vertical) goes
//! through [`Classifier`]. The deterministic rule-based implementations live
//! next to the checks that use them; [`ModelBackedClassifier`] wraps an
//! external [`LabelModel`] behind the same contract and falls back to a
//! rule-based classifier whenever the model cannot produce a known label.

use crate::constraints::TrustTier;
use crate::error::ModelError;
use crate::quality::AnchorType;
use std::fmt;
use std::sync::Arc;

/// A closed set of labels a classifier can return
pub trait Category: Copy + Send + Sync + 'static {
    /// Every member
    fn all() -> &'static [Self];

    /// Stable label
    fn label(&self) -> &'static str;

    /// Parse a label, case-insensitively
    fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::all()
            .iter()
            .copied()
            .find(|c| c.label().eq_ignore_ascii_case(label))
    }
}

/// Assigns a category to an input
pub trait Classifier<I: ?Sized>: Send + Sync {
    /// Result category
    type Category: Category;

    /// Classify `input`; must be deterministic for rule-based implementations
    fn classify(&self, input: &I) -> Self::Category;
}

impl<I: ?Sized, C: Classifier<I> + ?Sized> Classifier<I> for Arc<C> {
    type Category = C::Category;

    fn classify(&self, input: &I) -> Self::Category {
        (**self).classify(input)
    }
}

/// Input that can be rendered for a label model
pub trait PromptInput {
    /// Text handed to the model
    fn prompt(&self) -> String;
}

impl PromptInput for str {
    fn prompt(&self) -> String {
        self.to_string()
    }
}

impl PromptInput for String {
    fn prompt(&self) -> String {
        self.clone()
    }
}

/// External model that picks one label out of a closed set
pub trait LabelModel: Send + Sync {
    /// Return one of `labels` for `input`
    ///
    /// # Errors
    /// Returns [`ModelError::LabelModel`] when the model is unavailable
    fn complete_label(&self, task: &str, input: &str, labels: &[&str]) -> Result<String, ModelError>;
}

/// Classifier backed by a [`LabelModel`], with a rule-based fallback
pub struct ModelBackedClassifier<M, F> {
    task: String,
    model: M,
    fallback: F,
}

impl<M, F> fmt::Debug for ModelBackedClassifier<M, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelBackedClassifier")
            .field("task", &self.task)
            .field("model", &"<label model>")
            .finish_non_exhaustive()
    }
}

impl<M: LabelModel, F> ModelBackedClassifier<M, F> {
    /// Create for a named task
    #[must_use]
    pub fn new(task: impl Into<String>, model: M, fallback: F) -> Self {
        Self {
            task: task.into(),
            model,
            fallback,
        }
    }
}

impl<I, M, F> Classifier<I> for ModelBackedClassifier<M, F>
where
    I: PromptInput + ?Sized,
    M: LabelModel,
    F: Classifier<I>,
{
    type Category = F::Category;

    fn classify(&self, input: &I) -> Self::Category {
        let labels: Vec<&str> = <F::Category as Category>::all().iter().map(Category::label).collect();
        match self.model.complete_label(&self.task, &input.prompt(), &labels) {
            Ok(raw) => <F::Category as Category>::from_label(&raw).unwrap_or_else(|| {
                tracing::warn!(task = %self.task, label = %raw, "label model returned unknown label, using rules");
                self.fallback.classify(input)
            }),
            Err(error) => {
                tracing::warn!(task = %self.task, %error, "label model failed, using rules");
                self.fallback.classify(input)
            }
        }
    }
}

static ANCHOR_TYPES: [AnchorType; 4] = AnchorType::ALL;

impl Category for AnchorType {
    fn all() -> &'static [Self] {
        &ANCHOR_TYPES
    }

    fn label(&self) -> &'static str {
        self.as_str()
    }
}

static TRUST_TIERS: [TrustTier; 4] = [
    TrustTier::Government,
    TrustTier::Academic,
    TrustTier::Industry,
    TrustTier::Media,
];

impl Category for TrustTier {
    fn all() -> &'static [Self] {
        &TRUST_TIERS
    }

    fn label(&self) -> &'static str {
        self.as_str()
    }
}

static ANSWERS: [bool; 2] = [true, false];

/// Yes/no questions, such as whether a passage belongs to a vertical
impl Category for bool {
    fn all() -> &'static [Self] {
        &ANSWERS
    }

    fn label(&self) -> &'static str {
        if *self {
            "yes"
        } else {
            "no"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Result<&'static str, ()>);

    impl LabelModel for Fixed {
        fn complete_label(&self, _: &str, _: &str, labels: &[&str]) -> Result<String, ModelError> {
            assert!(!labels.is_empty());
            self.0
                .map(str::to_string)
                .map_err(|()| ModelError::LabelModel("offline".into()))
        }
    }

    struct AlwaysMedia;

    impl Classifier<str> for AlwaysMedia {
        type Category = TrustTier;

        fn classify(&self, _: &str) -> TrustTier {
            TrustTier::Media
        }
    }

    #[test]
    fn model_label_is_parsed() {
        let classifier = ModelBackedClassifier::new("tier", Fixed(Ok(" Academic ")), AlwaysMedia);
        assert_eq!(classifier.classify("mit.edu"), TrustTier::Academic);
    }

    #[test]
    fn unknown_label_falls_back() {
        let classifier = ModelBackedClassifier::new("tier", Fixed(Ok("blog")), AlwaysMedia);
        assert_eq!(classifier.classify("mit.edu"), TrustTier::Media);
    }

    #[test]
    fn model_error_falls_back() {
        let classifier = ModelBackedClassifier::new("tier", Fixed(Err(())), AlwaysMedia);
        assert_eq!(classifier.classify("mit.edu"), TrustTier::Media);
    }

    #[test]
    fn labels_parse_case_insensitively() {
        assert_eq!(bool::from_label(" YES"), Some(true));
        assert_eq!(bool::from_label("no"), Some(false));
        assert_eq!(bool::from_label("maybe"), None);
        assert_eq!(AnchorType::from_label("branded"), Some(AnchorType::Branded));
    }

    #[test]
    fn arc_classifiers_delegate() {
        let shared: Arc<dyn Classifier<str, Category = TrustTier>> = Arc::new(AlwaysMedia);
        assert_eq!(shared.classify("x.com"), TrustTier::Media);
    }
}
