//! Linkbridge Core - pipeline controller
//!
//! Drives a sponsored-link job from raw inputs to a delivered or aborted
//! article:
//! - Validates the publisher domain, target URL and anchor label
//! - Profiles the inputs and researches search intent
//! - Models alignment and builds generation constraints
//! - Generates, quality-checks and (at most once) rescues the draft
//! - Records every transition in a hash-chained execution log
//!
//! # Example
//!
//! ```rust,ignore
//! use linkbridge_core::{Collaborators, JobRequest, LinkbridgeConfig, PipelineRunner};
//!
//! # async fn example(collaborators: Collaborators) {
//! let config = std::sync::Arc::new(LinkbridgeConfig::default());
//! let runner = PipelineRunner::from_config(config, collaborators);
//!
//! let request = JobRequest::new("garden-weekly.com", "https://greenroot.example/soil", "soil mix");
//! let result = runner.submit(request).result().await;
//! println!("{} after {} transitions", result.final_state, result.transitions.len());
//! # }
//! ```

#![warn(unreachable_pub)]

pub mod collaborators;
pub mod config;
pub mod controller;
pub mod error;
pub mod limiter;
pub mod log;
pub mod retry;
pub mod runner;
pub mod state;
pub mod types;
pub mod validation;

pub use collaborators::{Collaborators, ContentGenerator, ProfileIngestor, SerpProvider};
pub use config::{LinkbridgeConfig, PipelineConfig};
pub use controller::{CancelToken, PipelineController};
pub use error::{CollaboratorError, ConfigError, InputValidationError, PipelineError};
pub use limiter::ProviderLimits;
pub use log::{verify_entries, ExecutionLog, LogEntry};
pub use retry::RetryPolicy;
pub use runner::{JobHandle, JobStatus, PipelineRunner};
pub use state::{
    allowed_transitions, validate_transition, JobState, PipelineState, Transition,
    MAX_RESCUE_ATTEMPTS,
};
pub use types::{AbortKind, AbortReason, ContextBundle, JobId, JobRequest, JobResult};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for driving jobs
    pub use crate::{
        AbortKind, CancelToken, Collaborators, ContentGenerator, JobRequest, JobResult,
        LinkbridgeConfig, PipelineController, PipelineRunner, PipelineState, ProfileIngestor,
        ProviderLimits, SerpProvider,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
