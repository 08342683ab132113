//! Linkbridge quality gate
//!
//! Scores a generated article against its generation constraints and the
//! alignment verdict, and applies the bounded autofix catalog.
//!
//! # Example
//!
//! ```rust,ignore
//! let gate = QualityGate::new(QualityConfig::default());
//! let report = gate.evaluate(&artifact, &constraints, &verdict);
//! if report.status() == QualityStatus::PassWithAutofix {
//!     let outcome = AutoFixController::new(&gate).apply(&artifact, &constraints, &verdict, &report)?;
//!     println!("{} -> {}", outcome.before, outcome.after);
//! }
//! ```

#![warn(unreachable_pub)]

mod autofix;
mod classifiers;
mod config;
mod error;
mod gate;

pub use autofix::{AutoFixController, AutoFixOutcome};
pub use classifiers::{
    AnchorContext, AnchorTypeRules, Classifiers, TrustTierRules, VerticalPassage, VerticalRules,
};
pub use config::{QualityConfig, ScoringConfig, TrustSourceEntry};
pub use error::QualityError;
pub use gate::QualityGate;
