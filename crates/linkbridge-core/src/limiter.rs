//! Cross-job provider limits
//!
//! The only state shared between jobs. Every search and generation call
//! takes a permit from the matching semaphore for the duration of the call.

use std::sync::Arc;
use tokio::sync::Semaphore;

/// Concurrency caps on the shared upstream providers
#[derive(Debug, Clone)]
pub struct ProviderLimits {
    search: Arc<Semaphore>,
    generation: Arc<Semaphore>,
}

impl ProviderLimits {
    /// Caps for search and generation calls; a zero cap is raised to 1
    #[must_use]
    pub fn new(search: usize, generation: usize) -> Self {
        Self {
            search: Arc::new(Semaphore::new(search.max(1))),
            generation: Arc::new(Semaphore::new(generation.max(1))),
        }
    }

    /// Limiter for search provider calls
    #[inline]
    #[must_use]
    pub fn search(&self) -> &Semaphore {
        &self.search
    }

    /// Limiter for generation calls
    #[inline]
    #[must_use]
    pub fn generation(&self) -> &Semaphore {
        &self.generation
    }

    /// Refuse all further calls; in-flight calls finish
    pub fn close(&self) {
        self.search.close();
        self.generation.close();
    }
}
