//! Linkbridge configuration
//!
//! One TOML document with three tables: `[alignment]`, `[quality]` and
//! `[pipeline]`. Every field has a default, so an empty file is a valid
//! configuration. The result is validated once and then shared read-only
//! across jobs.

use crate::error::ConfigError;
use crate::retry::RetryPolicy;
use crate::state::MAX_RESCUE_ATTEMPTS;
use linkbridge_alignment::AlignmentConfig;
use linkbridge_quality::QualityConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Controller bounds: rescue budget, retries, timeouts and provider caps
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Rescue passes per job (0 or 1)
    pub rescue_limit: u8,
    /// Retry policy for collaborator calls
    pub retry: RetryPolicy,
    /// Deadline for a single collaborator call
    pub call_timeout_ms: u64,
    /// Concurrent search calls across all jobs
    pub search_concurrency: usize,
    /// Concurrent generation calls across all jobs
    pub generation_concurrency: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            rescue_limit: MAX_RESCUE_ATTEMPTS,
            retry: RetryPolicy::default(),
            call_timeout_ms: 30_000,
            search_concurrency: 4,
            generation_concurrency: 2,
        }
    }
}

impl PipelineConfig {
    /// Deadline as a [`Duration`]
    #[inline]
    #[must_use]
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    /// With retry policy
    #[inline]
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// With per-call deadline
    #[inline]
    #[must_use]
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// With provider concurrency caps
    #[inline]
    #[must_use]
    pub fn with_concurrency(mut self, search: usize, generation: usize) -> Self {
        self.search_concurrency = search;
        self.generation_concurrency = generation;
        self
    }

    /// With rescue budget
    #[inline]
    #[must_use]
    pub fn with_rescue_limit(mut self, limit: u8) -> Self {
        self.rescue_limit = limit;
        self
    }

    /// Reject unusable bounds
    ///
    /// # Errors
    /// [`ConfigError::Pipeline`] naming the first violation
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fail = |msg: String| Err(ConfigError::Pipeline(msg));
        if self.rescue_limit > MAX_RESCUE_ATTEMPTS {
            return fail(format!(
                "rescue_limit {} exceeds the cap of {MAX_RESCUE_ATTEMPTS}",
                self.rescue_limit
            ));
        }
        if self.retry.max_attempts == 0 {
            return fail("retry.max_attempts must be positive".into());
        }
        if self.retry.initial_backoff_ms > self.retry.max_backoff_ms {
            return fail(format!(
                "retry.initial_backoff_ms ({}) exceeds retry.max_backoff_ms ({})",
                self.retry.initial_backoff_ms, self.retry.max_backoff_ms
            ));
        }
        if self.call_timeout_ms == 0 {
            return fail("call_timeout_ms must be positive".into());
        }
        if self.search_concurrency == 0 || self.generation_concurrency == 0 {
            return fail("concurrency caps must be positive".into());
        }
        Ok(())
    }
}

/// Complete configuration injected into the controller
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkbridgeConfig {
    /// Alignment modelling and constraint building
    pub alignment: AlignmentConfig,
    /// Quality gate and autofix
    pub quality: QualityConfig,
    /// Controller bounds
    pub pipeline: PipelineConfig,
}

impl LinkbridgeConfig {
    /// Parse and validate a TOML document
    ///
    /// # Errors
    /// [`ConfigError::Parse`] or the first validation failure
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    ///
    /// # Errors
    /// [`ConfigError::Io`] when the file cannot be read, otherwise as
    /// [`LinkbridgeConfig::from_toml_str`]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&source)?;
        tracing::debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Render as TOML
    ///
    /// # Errors
    /// [`ConfigError::Render`]
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Validate all three sections
    ///
    /// # Errors
    /// The first section that fails
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.alignment.validate()?;
        self.quality.validate()?;
        self.pipeline.validate()
    }

    /// With alignment settings
    #[inline]
    #[must_use]
    pub fn with_alignment(mut self, alignment: AlignmentConfig) -> Self {
        self.alignment = alignment;
        self
    }

    /// With quality settings
    #[inline]
    #[must_use]
    pub fn with_quality(mut self, quality: QualityConfig) -> Self {
        self.quality = quality;
        self
    }

    /// With pipeline settings
    #[inline]
    #[must_use]
    pub fn with_pipeline(mut self, pipeline: PipelineConfig) -> Self {
        self.pipeline = pipeline;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn empty_document_yields_defaults() {
        let config = LinkbridgeConfig::from_toml_str("").unwrap();
        assert_eq!(config, LinkbridgeConfig::default());
        assert_eq!(config.pipeline.call_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn partial_tables_keep_other_defaults() {
        let config = LinkbridgeConfig::from_toml_str(
            "[pipeline]\nsearch_concurrency = 8\n\n[pipeline.retry]\nmax_attempts = 5\n",
        )
        .unwrap();
        assert_eq!(config.pipeline.search_concurrency, 8);
        assert_eq!(config.pipeline.retry.max_attempts, 5);
        assert_eq!(config.pipeline.retry.initial_backoff_ms, 200);
        assert_eq!(config.pipeline.generation_concurrency, 2);
    }

    #[test]
    fn rendered_defaults_parse_back() {
        let rendered = LinkbridgeConfig::default().to_toml_string().unwrap();
        assert_eq!(
            LinkbridgeConfig::from_toml_str(&rendered).unwrap(),
            LinkbridgeConfig::default()
        );
    }

    #[test]
    fn rejects_second_rescue() {
        let err = LinkbridgeConfig::from_toml_str("[pipeline]\nrescue_limit = 2\n").unwrap_err();
        assert!(matches!(err, ConfigError::Pipeline(_)), "{err}");
    }

    #[test]
    fn rejects_zero_retry_attempts() {
        let config = LinkbridgeConfig::default()
            .with_pipeline(PipelineConfig::default().with_retry(RetryPolicy::default().with_max_attempts(0)));
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_inverted_overlap_cutoffs() {
        let err = LinkbridgeConfig::from_toml_str(
            "[alignment]\npivot_overlap = 0.8\nstrong_overlap = 0.5\n",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Alignment(_)), "{err}");
    }

    #[test]
    fn unknown_types_are_parse_errors() {
        let err = LinkbridgeConfig::from_toml_str("[pipeline]\nrescue_limit = \"one\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)), "{err}");
    }

    #[test]
    fn load_reads_file_and_reports_missing_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[pipeline]\ngeneration_concurrency = 3").unwrap();
        let config = LinkbridgeConfig::load(file.path()).unwrap();
        assert_eq!(config.pipeline.generation_concurrency, 3);

        let err = LinkbridgeConfig::load("/nonexistent/linkbridge.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
