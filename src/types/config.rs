//! Configuration for the extraction pipeline.
//!
//! Module-level tuning values become one explicit, immutable config object
//! passed into the pipeline and its phases at construction time; there is
//! no process-wide mutable state.

use std::time::Duration;

use crate::retry::RetryPolicy;

const DEFAULT_MIN_CONTENT_LEN: usize = 50;
const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.7;
const DEFAULT_MAX_CANDIDATES: usize = 1;
const DEFAULT_MODEL_TIMEOUT_SECS: u64 = 30;
const DEFAULT_STORE_TIMEOUT_SECS: u64 = 10;

/// Configuration for one pipeline instance.
///
/// The threshold, minimum-length, and backoff values are operational tuning
/// parameters, not contractual invariants.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Fragments shorter than this are a warning, or a hard Validation
    /// error when flagged for special review. Default: 50.
    pub min_content_len: usize,

    /// Similarity score below which a candidate entity is new. Default: 0.7.
    pub similarity_threshold: f32,

    /// Candidates requested per similarity search. Default: 1.
    pub max_candidates: usize,

    /// Timeout for each language model call.
    pub model_timeout: Duration,

    /// Timeout for each store RPC.
    pub store_timeout: Duration,

    /// Retry policy for model calls (few retries, longer pause).
    pub model_retry: RetryPolicy,

    /// Retry policy for store calls (minimal retries, connection errors only).
    pub store_retry: RetryPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            min_content_len: DEFAULT_MIN_CONTENT_LEN,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            max_candidates: DEFAULT_MAX_CANDIDATES,
            model_timeout: Duration::from_secs(DEFAULT_MODEL_TIMEOUT_SECS),
            store_timeout: Duration::from_secs(DEFAULT_STORE_TIMEOUT_SECS),
            model_retry: RetryPolicy::model_call(),
            store_retry: RetryPolicy::store_call(),
        }
    }
}

impl PipelineConfig {
    /// Create a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read overrides from the environment, falling back to defaults.
    ///
    /// Recognized variables: `PRENSA_MIN_CONTENT_LEN`,
    /// `PRENSA_SIMILARITY_THRESHOLD`, `PRENSA_MODEL_TIMEOUT_SECS`,
    /// `PRENSA_STORE_TIMEOUT_SECS`.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(v) = env_parse::<usize>("PRENSA_MIN_CONTENT_LEN") {
            config.min_content_len = v;
        }
        if let Some(v) = env_parse::<f32>("PRENSA_SIMILARITY_THRESHOLD") {
            config.similarity_threshold = v;
        }
        if let Some(v) = env_parse::<u64>("PRENSA_MODEL_TIMEOUT_SECS") {
            config.model_timeout = Duration::from_secs(v);
        }
        if let Some(v) = env_parse::<u64>("PRENSA_STORE_TIMEOUT_SECS") {
            config.store_timeout = Duration::from_secs(v);
        }

        config
    }

    /// Set the minimum content length.
    pub fn with_min_content_len(mut self, len: usize) -> Self {
        self.min_content_len = len;
        self
    }

    /// Set the similarity threshold.
    pub fn with_similarity_threshold(mut self, threshold: f32) -> Self {
        self.similarity_threshold = threshold;
        self
    }

    /// Set candidates requested per similarity search.
    pub fn with_max_candidates(mut self, max: usize) -> Self {
        self.max_candidates = max;
        self
    }

    /// Set the model call timeout.
    pub fn with_model_timeout(mut self, timeout: Duration) -> Self {
        self.model_timeout = timeout;
        self
    }

    /// Set the store RPC timeout.
    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    /// Set the model retry policy.
    pub fn with_model_retry(mut self, policy: RetryPolicy) -> Self {
        self.model_retry = policy;
        self
    }

    /// Set the store retry policy.
    pub fn with_store_retry(mut self, policy: RetryPolicy) -> Self {
        self.store_retry = policy;
        self
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_deployment_tuning() {
        let config = PipelineConfig::default();
        assert_eq!(config.min_content_len, 50);
        assert!((config.similarity_threshold - 0.7).abs() < f32::EPSILON);
        assert_eq!(config.max_candidates, 1);
    }

    #[test]
    fn builders_override_defaults() {
        let config = PipelineConfig::new()
            .with_min_content_len(80)
            .with_similarity_threshold(0.85)
            .with_model_timeout(Duration::from_secs(5));

        assert_eq!(config.min_content_len, 80);
        assert!((config.similarity_threshold - 0.85).abs() < f32::EPSILON);
        assert_eq!(config.model_timeout, Duration::from_secs(5));
    }
}
