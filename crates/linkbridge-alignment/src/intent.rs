//! Intent comparison
//!
//! Intents sit on a ladder `informational - investigational - commercial -
//! transactional`. Identical intents and the commercial/transactional pair
//! are aligned, direct neighbours are partial, anything further apart is
//! off. Navigational intent is only aligned with itself.

use linkbridge_model::{Alignment, IntentCategory};

fn ladder(intent: IntentCategory) -> Option<u8> {
    match intent {
        IntentCategory::Informational => Some(0),
        IntentCategory::Investigational => Some(1),
        IntentCategory::Commercial => Some(2),
        IntentCategory::Transactional => Some(3),
        IntentCategory::Navigational => None,
    }
}

/// Compare two categorical intents
#[must_use]
pub fn compare_intent(a: IntentCategory, b: IntentCategory) -> Alignment {
    if a == b || (a.is_commercial() && b.is_commercial()) {
        return Alignment::Aligned;
    }
    match (ladder(a), ladder(b)) {
        (Some(x), Some(y)) if x.abs_diff(y) == 1 => Alignment::Partial,
        _ => Alignment::Off,
    }
}

/// Compare an intent against search evidence
///
/// The secondary search intent can lift an axis at most to partial.
#[must_use]
pub fn compare_with_serp(
    intent: IntentCategory,
    dominant: IntentCategory,
    secondary: Option<IntentCategory>,
) -> Alignment {
    let primary = compare_intent(intent, dominant);
    let runner_up = secondary
        .map(|s| compare_intent(intent, s).worst(Alignment::Partial))
        .unwrap_or(Alignment::Off);
    primary.max(runner_up)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use linkbridge_model::IntentCategory::*;

    fn any_intent() -> impl Strategy<Value = IntentCategory> {
        proptest::sample::select(IntentCategory::ALL.to_vec())
    }

    proptest! {
        #[test]
        fn reflexive(a in any_intent()) {
            prop_assert_eq!(compare_intent(a, a), Alignment::Aligned);
        }

        #[test]
        fn symmetric(a in any_intent(), b in any_intent()) {
            prop_assert_eq!(compare_intent(a, b), compare_intent(b, a));
        }

        #[test]
        fn secondary_never_beats_dominant_match(a in any_intent(), s in any_intent()) {
            prop_assert_eq!(compare_with_serp(a, a, Some(s)), Alignment::Aligned);
        }
    }

    #[test]
    fn ladder_neighbours() {
        assert_eq!(compare_intent(Commercial, Transactional), Alignment::Aligned);
        assert_eq!(compare_intent(Informational, Investigational), Alignment::Partial);
        assert_eq!(compare_intent(Investigational, Commercial), Alignment::Partial);
        assert_eq!(compare_intent(Informational, Commercial), Alignment::Off);
        assert_eq!(compare_intent(Navigational, Informational), Alignment::Off);
    }

    #[test]
    fn secondary_intent_gives_partial_credit() {
        assert_eq!(
            compare_with_serp(Transactional, Informational, Some(Commercial)),
            Alignment::Partial
        );
        assert_eq!(
            compare_with_serp(Transactional, Informational, None),
            Alignment::Off
        );
    }
}
