//! Bounded backoff retry for external-dependency calls.
//!
//! The retry wrapper is the only construct that re-issues a call, and it
//! only ever retries serially, to avoid duplicate side effects against the
//! external store.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::{ErrorKind, PipelineError, Result};

/// How a category of external call is retried.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total calls, including the first. A value of 1 disables retries.
    pub max_attempts: u32,

    /// Delay before the first retry.
    pub wait_min: Duration,

    /// Ceiling on the delay; doubling stops here.
    pub wait_max: Duration,

    /// Error kinds eligible for retry under this policy.
    pub retry_kinds: Vec<ErrorKind>,
}

impl RetryPolicy {
    /// A policy retrying model and store errors.
    pub fn new(max_attempts: u32, wait_min: Duration, wait_max: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            wait_min,
            wait_max,
            retry_kinds: vec![ErrorKind::ExternalModel, ErrorKind::ExternalStore],
        }
    }

    /// Tuned for language model calls: few retries, longer pause.
    pub fn model_call() -> Self {
        Self {
            max_attempts: 2,
            wait_min: Duration::from_secs(2),
            wait_max: Duration::from_secs(10),
            retry_kinds: vec![ErrorKind::ExternalModel],
        }
    }

    /// Tuned for store RPCs: minimal retries, connection errors only
    /// (non-transient store failures arrive pre-marked terminal).
    pub fn store_call() -> Self {
        Self {
            max_attempts: 2,
            wait_min: Duration::from_millis(500),
            wait_max: Duration::from_secs(2),
            retry_kinds: vec![ErrorKind::ExternalStore],
        }
    }

    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            wait_min: Duration::ZERO,
            wait_max: Duration::ZERO,
            retry_kinds: Vec::new(),
        }
    }

    /// Restrict the eligible error kinds.
    pub fn with_retry_kinds(mut self, kinds: impl IntoIterator<Item = ErrorKind>) -> Self {
        self.retry_kinds = kinds.into_iter().collect();
        self
    }

    /// Whether this error may be retried under this policy.
    ///
    /// Terminal errors never retry. ServiceUnavailable short-circuits the
    /// remaining budget so system-wide overload surfaces promptly.
    pub fn should_retry(&self, error: &PipelineError) -> bool {
        !error.terminal
            && error.kind != ErrorKind::ServiceUnavailable
            && self.retry_kinds.contains(&error.kind)
    }

    /// Delay before the given retry (1-based), doubling up to `wait_max`.
    pub fn delay_before_retry(&self, retry: u32) -> Duration {
        let doubled = self
            .wait_min
            .saturating_mul(1u32 << retry.saturating_sub(1).min(16));
        doubled.min(self.wait_max).max(self.wait_min)
    }
}

/// Run `op` up to `policy.max_attempts` times, serially.
///
/// `op` receives the 1-based attempt number. Returns the first successful
/// result, or the last error with retry accounting attached.
pub async fn retry_with_backoff<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 1;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(error) if attempt < policy.max_attempts && policy.should_retry(&error) => {
                let delay = policy.delay_before_retry(attempt);
                warn!(
                    phase = %error.phase,
                    kind = %error.kind,
                    attempt,
                    max_attempts = policy.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    "retrying after external failure: {}",
                    error.message
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(error) => {
                return Err(error.with_retries(attempt - 1, policy.max_attempts));
            }
        }
    }
}

/// Run `op` once, marking any error terminal so no outer retry policy may
/// re-issue it. For calls whose failure is not transient (e.g. detecting a
/// malformed request).
pub async fn no_retry<T, F, Fut>(op: F) -> Result<T>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    op().await.map_err(PipelineError::as_terminal)
}
