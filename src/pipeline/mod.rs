//! The five-phase extraction pipeline and its controller.
//!
//! Phases run strictly in order, each consuming the output of the prior
//! ones. External calls are the only suspension points; each carries a
//! timeout and goes through the bounded retry wrapper before the phase's
//! fallback handler is consulted.

pub mod controller;
pub mod extraction;
pub mod normalization;
pub mod parse;
pub mod persistence;
pub mod quotes;
pub mod triage;

pub use controller::Pipeline;

use std::time::Duration;

use tracing::debug;

use crate::error::{PipelineError, Result};
use crate::retry::{retry_with_backoff, RetryPolicy};
use crate::traits::model::LanguageModel;
use crate::types::outcome::Phase;

/// Call the language model with a timeout and the model retry policy.
///
/// A timeout is treated as an `ExternalModel` failure; provider overload
/// becomes `ServiceUnavailable` so the retry budget is not burned.
pub(crate) async fn call_model<M: LanguageModel>(
    model: &M,
    phase: Phase,
    timeout: Duration,
    policy: &RetryPolicy,
    prompt: &str,
) -> Result<String> {
    retry_with_backoff(policy, |attempt| async move {
        debug!(phase = %phase, attempt, "calling language model");
        match tokio::time::timeout(timeout, model.complete(prompt)).await {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(crate::error::ModelError::Overloaded)) => {
                Err(PipelineError::unavailable(phase, "model service overloaded"))
            }
            Ok(Err(e)) => Err(PipelineError::model(phase, e.to_string())),
            Err(_) => Err(PipelineError::model(
                phase,
                format!("model call timed out after {:?}", timeout),
            )),
        }
    })
    .await
}

/// Call the store with a timeout and the store retry policy.
///
/// `op` is re-invoked per attempt; the policy only retries connection
/// errors because non-transient store failures arrive pre-marked terminal.
pub(crate) async fn call_store<T, F, Fut>(
    phase: Phase,
    timeout: Duration,
    policy: &RetryPolicy,
    op: F,
) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = std::result::Result<T, crate::error::StoreError>>,
{
    retry_with_backoff(policy, |attempt| {
        let fut = op();
        async move {
            debug!(phase = %phase, attempt, "calling store");
            match tokio::time::timeout(timeout, fut).await {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(e)) => Err(e.into_pipeline_error(phase)),
                Err(_) => Err(PipelineError::store(
                    phase,
                    format!("store call timed out after {:?}", timeout),
                )),
            }
        }
    })
    .await
}
