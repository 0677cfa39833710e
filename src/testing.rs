//! Testing utilities including mock implementations.
//!
//! These are useful for testing applications that drive the pipeline
//! without making real model or store calls. The mock model matches
//! prompts by substring, so responses can be scripted per phase.

use async_trait::async_trait;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use crate::error::{ModelError, StoreError};
use crate::retry::RetryPolicy;
use crate::traits::model::LanguageModel;
use crate::traits::store::{
    DeadLetter, EntityCandidate, EntityIndex, FragmentRecord, ResultStore,
};
use crate::types::config::PipelineConfig;

/// Prompt marker for the triage phase.
pub const TRIAGE_MARKER: &str = "Triage this news fragment";
/// Prompt marker for the extraction phase.
pub const EXTRACTION_MARKER: &str = "facts and named entities";
/// Prompt marker for the quotes phase.
pub const QUOTES_MARKER: &str = "quotes and quantitative data";

#[derive(Debug, Clone)]
enum Behavior {
    Respond(String),
    Fail(String),
    Overloaded,
}

#[derive(Debug, Clone)]
struct Rule {
    marker: String,
    behavior: Behavior,
}

/// A mock language model for testing.
///
/// Rules match prompts by substring, first match wins; an unmatched
/// prompt falls through to the default behavior (failure unless
/// overridden). All clones share the same rules and call log.
#[derive(Clone)]
pub struct MockModel {
    rules: Arc<RwLock<Vec<Rule>>>,
    fallback: Arc<RwLock<Behavior>>,
    calls: Arc<RwLock<Vec<String>>>,
}

impl Default for MockModel {
    fn default() -> Self {
        Self::new()
    }
}

impl MockModel {
    /// Create a mock with no scripted responses.
    pub fn new() -> Self {
        Self {
            rules: Arc::new(RwLock::new(Vec::new())),
            fallback: Arc::new(RwLock::new(Behavior::Fail(
                "no scripted response for prompt".into(),
            ))),
            calls: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// A mock scripted for all three phases with plausible defaults.
    pub fn scripted_defaults() -> Self {
        Self::new()
            .respond_to(
                TRIAGE_MARKER,
                r#"{"relevant": true, "reason": "contenido informativo"}"#,
            )
            .respond_to(
                EXTRACTION_MARKER,
                r#"{
                    "facts": [
                        {"statement": "El Banco Central subirá la tasa dos puntos", "category": "economia", "confidence": 0.9}
                    ],
                    "entities": [
                        {"name": "Banco Central", "kind": "organizacion", "relevance": 0.9}
                    ]
                }"#,
            )
            .respond_to(QUOTES_MARKER, r#"{"quotes": [], "data": []}"#)
    }

    /// A mock where every call fails with a transport error.
    pub fn failing(message: impl Into<String>) -> Self {
        let mock = Self::new();
        *mock.fallback.write().unwrap() = Behavior::Fail(message.into());
        mock
    }

    /// A mock where every call reports provider overload.
    pub fn overloaded() -> Self {
        let mock = Self::new();
        *mock.fallback.write().unwrap() = Behavior::Overloaded;
        mock
    }

    /// Script a response for prompts containing `marker`.
    pub fn respond_to(self, marker: impl Into<String>, response: impl Into<String>) -> Self {
        self.rules.write().unwrap().push(Rule {
            marker: marker.into(),
            behavior: Behavior::Respond(response.into()),
        });
        self
    }

    /// Script a transport failure for prompts containing `marker`.
    pub fn failing_on(self, marker: impl Into<String>, message: impl Into<String>) -> Self {
        self.rules.write().unwrap().push(Rule {
            marker: marker.into(),
            behavior: Behavior::Fail(message.into()),
        });
        self
    }

    /// Script an overload response for prompts containing `marker`.
    pub fn overloaded_on(self, marker: impl Into<String>) -> Self {
        self.rules.write().unwrap().push(Rule {
            marker: marker.into(),
            behavior: Behavior::Overloaded,
        });
        self
    }

    /// Number of calls made so far.
    pub fn call_count(&self) -> usize {
        self.calls.read().unwrap().len()
    }

    /// The prompts received, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.read().unwrap().clone()
    }

    /// Number of calls whose prompt contains `marker`.
    pub fn calls_matching(&self, marker: &str) -> usize {
        self.calls
            .read()
            .unwrap()
            .iter()
            .filter(|p| p.contains(marker))
            .count()
    }
}

#[derive(Debug)]
struct InjectedFailure(String);

impl std::fmt::Display for InjectedFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for InjectedFailure {}

#[async_trait]
impl LanguageModel for MockModel {
    async fn complete(&self, prompt: &str) -> Result<String, ModelError> {
        self.calls.write().unwrap().push(prompt.to_string());

        let behavior = {
            let rules = self.rules.read().unwrap();
            rules
                .iter()
                .find(|r| prompt.contains(&r.marker))
                .map(|r| r.behavior.clone())
                .unwrap_or_else(|| self.fallback.read().unwrap().clone())
        };

        match behavior {
            Behavior::Respond(text) => Ok(text),
            Behavior::Fail(message) => {
                Err(ModelError::Transport(Box::new(InjectedFailure(message))))
            }
            Behavior::Overloaded => Err(ModelError::Overloaded),
        }
    }
}

/// A store wrapper that injects failures around an inner store.
///
/// Injected failures are connection errors, so they exercise the retry
/// path before a phase falls back.
pub struct FailingStore<S> {
    inner: S,
    fail_search: bool,
    fail_persist: bool,
    fail_dead_letter: bool,
}

impl<S> FailingStore<S> {
    /// Fail every similarity search.
    pub fn search_errors(inner: S) -> Self {
        Self {
            inner,
            fail_search: true,
            fail_persist: false,
            fail_dead_letter: false,
        }
    }

    /// Fail every primary persist; dead letters still succeed.
    pub fn persist_errors(inner: S) -> Self {
        Self {
            inner,
            fail_search: false,
            fail_persist: true,
            fail_dead_letter: false,
        }
    }

    /// Fail both persists and dead-letter writes.
    pub fn all_writes_error(inner: S) -> Self {
        Self {
            inner,
            fail_search: false,
            fail_persist: true,
            fail_dead_letter: true,
        }
    }

    /// The wrapped store.
    pub fn inner(&self) -> &S {
        &self.inner
    }
}

fn injected() -> StoreError {
    StoreError::Connection("injected connection failure".into())
}

#[async_trait]
impl<S: EntityIndex> EntityIndex for FailingStore<S> {
    async fn similarity_search(
        &self,
        name: &str,
        kind: Option<&str>,
        threshold: f32,
        limit: usize,
    ) -> Result<Vec<EntityCandidate>, StoreError> {
        if self.fail_search {
            return Err(injected());
        }
        self.inner
            .similarity_search(name, kind, threshold, limit)
            .await
    }
}

#[async_trait]
impl<S: ResultStore> ResultStore for FailingStore<S> {
    async fn persist_outcome(&self, record: &FragmentRecord) -> Result<(), StoreError> {
        if self.fail_persist {
            return Err(injected());
        }
        self.inner.persist_outcome(record).await
    }

    async fn record_dead_letter(&self, letter: &DeadLetter) -> Result<(), StoreError> {
        if self.fail_dead_letter {
            return Err(injected());
        }
        self.inner.record_dead_letter(letter).await
    }
}

/// A config with millisecond retry waits, so failure-path tests run fast.
pub fn fast_config() -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.model_retry = RetryPolicy {
        wait_min: Duration::from_millis(5),
        wait_max: Duration::from_millis(10),
        ..RetryPolicy::model_call()
    };
    config.store_retry = RetryPolicy {
        wait_min: Duration::from_millis(5),
        wait_max: Duration::from_millis(10),
        ..RetryPolicy::store_call()
    };
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_matching_rule_wins_and_calls_are_tracked() {
        let model = MockModel::new()
            .respond_to("hola", "primera")
            .respond_to("hola mundo", "segunda");

        let response = model.complete("hola mundo").await.unwrap();
        assert_eq!(response, "primera");
        assert_eq!(model.call_count(), 1);
        assert_eq!(model.calls_matching("mundo"), 1);
    }

    #[tokio::test]
    async fn unmatched_prompt_uses_fallback() {
        let model = MockModel::new();
        assert!(model.complete("sin regla").await.is_err());

        let overloaded = MockModel::overloaded();
        assert!(matches!(
            overloaded.complete("cualquiera").await,
            Err(ModelError::Overloaded)
        ));
    }
}
