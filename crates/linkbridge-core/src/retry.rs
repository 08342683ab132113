//! Collaborator call wrapper: timeout, shared limiter, bounded retry
//!
//! Retries are independent of the rescue budget. A permit from the shared
//! provider limiter is held only while a call is in flight, never during
//! the backoff sleep.

use crate::error::CollaboratorError;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio::sync::Semaphore;

/// Retry bound and exponential backoff
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Attempts per call, including the first
    pub max_attempts: u32,
    /// Delay after the first failure
    pub initial_backoff_ms: u64,
    /// Delay cap
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 200,
            max_backoff_ms: 5_000,
        }
    }
}

impl RetryPolicy {
    /// Policy with `max_attempts` and default backoff
    #[inline]
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Delay after the `attempt`-th failure (1-based), doubling up to the cap
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(20);
        let millis = self
            .initial_backoff_ms
            .saturating_mul(1u64 << shift)
            .min(self.max_backoff_ms);
        Duration::from_millis(millis)
    }

    /// Run `op` until it succeeds, fails permanently or the attempts run out
    ///
    /// Each attempt waits for a permit from `limiter` (when given), then runs
    /// under `timeout`. An elapsed deadline counts as a retryable failure.
    ///
    /// # Errors
    /// The last error seen, or [`CollaboratorError::LimiterClosed`]
    pub async fn run<T, F, Fut>(
        &self,
        call: &'static str,
        timeout: Duration,
        limiter: Option<&Semaphore>,
        mut op: F,
    ) -> Result<T, CollaboratorError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, CollaboratorError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            let outcome = {
                let _permit = match limiter {
                    Some(semaphore) => Some(
                        semaphore
                            .acquire()
                            .await
                            .map_err(|_| CollaboratorError::LimiterClosed)?,
                    ),
                    None => None,
                };
                match tokio::time::timeout(timeout, op()).await {
                    Ok(result) => result,
                    Err(_) => Err(CollaboratorError::Timeout {
                        call,
                        after: timeout,
                    }),
                }
            };

            match outcome {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt < max_attempts => {
                    let delay = self.backoff(attempt);
                    tracing::warn!(
                        call,
                        attempt,
                        max_attempts,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %err,
                        "collaborator call failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => {
                    tracing::warn!(call, attempt, error = %err, "collaborator call failed");
                    return Err(err);
                }
            }
        }
    }
}
