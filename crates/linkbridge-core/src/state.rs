//! Pipeline state machine
//!
//! The transition table is static. [`JobState`] is owned by one controller
//! run and only changes through [`JobState::transition`], so an illegal
//! transition or a second rescue is an error, never a silent state change.

use crate::error::PipelineError;
use crate::types::JobId;
use chrono::{DateTime, Utc};
use linkbridge_model::ContentHash;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Hard cap on rescue passes per job
pub const MAX_RESCUE_ATTEMPTS: u8 = 1;

/// Pipeline states; `Deliver` and `Abort` are terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PipelineState {
    /// Input validation
    Receive,
    /// Profiling, search research, alignment and constraints
    Preflight,
    /// Content generation
    Write,
    /// Quality gate
    Qc,
    /// Single autofix pass
    Rescue,
    /// Artifact accepted
    Deliver,
    /// Job stopped
    Abort,
}

impl PipelineState {
    /// Every state, in pipeline order
    pub const ALL: [Self; 7] = [
        Self::Receive,
        Self::Preflight,
        Self::Write,
        Self::Qc,
        Self::Rescue,
        Self::Deliver,
        Self::Abort,
    ];

    /// Stable label
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Receive => "RECEIVE",
            Self::Preflight => "PREFLIGHT",
            Self::Write => "WRITE",
            Self::Qc => "QC",
            Self::Rescue => "RESCUE",
            Self::Deliver => "DELIVER",
            Self::Abort => "ABORT",
        }
    }

    /// No transition leaves this state
    #[inline]
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Deliver | Self::Abort)
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// States reachable from `from` in one step
#[must_use]
pub fn allowed_transitions(from: PipelineState) -> &'static [PipelineState] {
    use PipelineState::{Abort, Deliver, Preflight, Qc, Receive, Rescue, Write};
    match from {
        Receive => &[Preflight, Abort],
        Preflight => &[Write, Abort],
        Write => &[Qc, Abort],
        Qc => &[Deliver, Rescue, Abort],
        Rescue => &[Qc, Abort],
        Deliver | Abort => &[],
    }
}

/// Check one step against the table
///
/// # Errors
/// Returns [`PipelineError::IllegalTransition`] for any step not in the table
pub fn validate_transition(from: PipelineState, to: PipelineState) -> Result<(), PipelineError> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(PipelineError::IllegalTransition { from, to })
    }
}

/// One applied transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    /// State left
    pub from: PipelineState,
    /// State entered
    pub to: PipelineState,
    /// When
    pub at: DateTime<Utc>,
}

/// Mutable state of one job
#[derive(Debug, Clone)]
pub struct JobState {
    job_id: JobId,
    state: PipelineState,
    rescue_attempts: u8,
    rescue_limit: u8,
    history: Vec<Transition>,
    content_hashes: Vec<ContentHash>,
}

impl JobState {
    /// Fresh job in `RECEIVE`; `rescue_limit` is clamped to the hard cap
    #[must_use]
    pub fn new(job_id: JobId, rescue_limit: u8) -> Self {
        Self {
            job_id,
            state: PipelineState::Receive,
            rescue_attempts: 0,
            rescue_limit: rescue_limit.min(MAX_RESCUE_ATTEMPTS),
            history: Vec::new(),
            content_hashes: Vec::new(),
        }
    }

    /// Job identifier
    #[inline]
    #[must_use]
    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    /// Current state
    #[inline]
    #[must_use]
    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Rescue passes started
    #[inline]
    #[must_use]
    pub fn rescue_attempts(&self) -> u8 {
        self.rescue_attempts
    }

    /// A rescue pass is still allowed
    #[inline]
    #[must_use]
    pub fn rescue_available(&self) -> bool {
        self.rescue_attempts < self.rescue_limit
    }

    /// Transitions applied so far
    #[inline]
    #[must_use]
    pub fn history(&self) -> &[Transition] {
        &self.history
    }

    /// Hashes of every draft seen, oldest first
    #[inline]
    #[must_use]
    pub fn content_hashes(&self) -> &[ContentHash] {
        &self.content_hashes
    }

    /// Move to `to`; entering `RESCUE` consumes the rescue budget
    ///
    /// # Errors
    /// - [`PipelineError::IllegalTransition`] if the step is not in the table
    /// - [`PipelineError::RescueBudgetExhausted`] if no rescue is left
    pub fn transition(&mut self, to: PipelineState) -> Result<Transition, PipelineError> {
        validate_transition(self.state, to)?;
        if to == PipelineState::Rescue {
            if !self.rescue_available() {
                return Err(PipelineError::RescueBudgetExhausted {
                    attempts: self.rescue_attempts,
                });
            }
            self.rescue_attempts += 1;
        }
        let transition = Transition {
            from: self.state,
            to,
            at: Utc::now(),
        };
        self.state = to;
        self.history.push(transition);
        Ok(transition)
    }

    /// Record a draft's hash; `false` if the same text was seen before
    pub fn record_hash(&mut self, hash: ContentHash) -> bool {
        if self.content_hashes.contains(&hash) {
            return false;
        }
        self.content_hashes.push(hash);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn any_state() -> impl Strategy<Value = PipelineState> {
        proptest::sample::select(PipelineState::ALL.to_vec())
    }

    #[test]
    fn happy_path_with_rescue() {
        let mut job = JobState::new(JobId::new(), 1);
        for to in [
            PipelineState::Preflight,
            PipelineState::Write,
            PipelineState::Qc,
            PipelineState::Rescue,
            PipelineState::Qc,
            PipelineState::Deliver,
        ] {
            job.transition(to).unwrap();
        }
        assert_eq!(job.state(), PipelineState::Deliver);
        assert_eq!(job.rescue_attempts(), 1);
        assert_eq!(job.history().len(), 6);
    }

    #[test]
    fn second_rescue_is_refused() {
        let mut job = JobState::new(JobId::new(), 5);
        for to in [
            PipelineState::Preflight,
            PipelineState::Write,
            PipelineState::Qc,
            PipelineState::Rescue,
            PipelineState::Qc,
        ] {
            job.transition(to).unwrap();
        }
        assert_eq!(
            job.transition(PipelineState::Rescue),
            Err(PipelineError::RescueBudgetExhausted { attempts: 1 })
        );
        assert_eq!(job.state(), PipelineState::Qc);
    }

    #[test]
    fn zero_limit_disables_rescue() {
        let job = JobState::new(JobId::new(), 0);
        assert!(!job.rescue_available());
    }

    #[test]
    fn repeated_hash_is_reported() {
        let mut job = JobState::new(JobId::new(), 1);
        let a = ContentHash::of_text("draft one");
        assert!(job.record_hash(a));
        assert!(job.record_hash(ContentHash::of_text("draft two")));
        assert!(!job.record_hash(a));
        assert_eq!(job.content_hashes().len(), 2);
    }

    #[test]
    fn abort_reachable_from_every_live_state() {
        for state in PipelineState::ALL.into_iter().filter(|s| !s.is_terminal()) {
            assert!(validate_transition(state, PipelineState::Abort).is_ok(), "{state}");
        }
    }

    proptest! {
        #[test]
        fn terminal_states_have_no_exits(from in any_state(), to in any_state()) {
            if from.is_terminal() {
                prop_assert!(validate_transition(from, to).is_err());
            }
        }

        #[test]
        fn walks_stay_inside_the_table(steps in proptest::collection::vec(any_state(), 0..24)) {
            let mut job = JobState::new(JobId::new(), 1);
            for to in steps {
                let before = job.state();
                match job.transition(to) {
                    Ok(t) => {
                        prop_assert!(allowed_transitions(before).contains(&t.to));
                        prop_assert_eq!(job.state(), to);
                    }
                    Err(_) => prop_assert_eq!(job.state(), before),
                }
                prop_assert!(job.rescue_attempts() <= MAX_RESCUE_ATTEMPTS);
            }
        }
    }
}
