//! Linkbridge alignment modelling
//!
//! Turns profiles and search results into an alignment verdict, a bridge
//! recommendation and generation constraints.
//!
//! # Example
//!
//! ```rust,ignore
//! let plan = QueryPlanner::new(config.max_cluster_queries).plan(&profiles)?;
//! let serp = EvidenceAggregator::new(config.top_results).aggregate_all(&main, &clusters)?;
//! let outcome = AlignmentModeler::new(config.clone()).model(&profiles, &serp);
//! let constraints = GenerationConstraintBuilder::new(config)
//!     .build(&outcome.recommendation, &profiles, &serp);
//! ```

#![warn(unreachable_pub)]

mod builder;
mod config;
mod error;
mod evidence;
mod intent;
mod modeler;
mod planner;

pub use builder::GenerationConstraintBuilder;
pub use config::{AlignmentConfig, ContentTargets, TrustBand, TrustPolicy};
pub use error::AlignmentError;
pub use evidence::EvidenceAggregator;
pub use intent::{compare_intent, compare_with_serp};
pub use modeler::{niche_overlap, AlignmentModeler, AlignmentOutcome};
pub use planner::{QueryPlan, QueryPlanner};
