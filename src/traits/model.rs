//! Language model trait.
//!
//! Implementations wrap a specific provider and handle transport; the
//! pipeline owns prompting, timeouts, retries, and response parsing.

use async_trait::async_trait;

use crate::error::ModelError;

/// A text-completion capability.
///
/// Responses are free-form text that the pipeline expects to parse as
/// JSON-shaped data; a malformed response is the pipeline's problem, not
/// the implementation's.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Complete a prompt.
    async fn complete(&self, prompt: &str) -> Result<String, ModelError>;
}
