//! Storage traits for the external store's RPC surface.
//!
//! Split into focused traits for flexibility:
//! - `EntityIndex`: ranked similarity search over canonical entities
//! - `ResultStore`: persistence of fragment results + dead letters
//! - `FragmentStore`: composite trait combining both

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StoreError;
use crate::normalizer::NormalizationResult;
use crate::types::element::{ElementRelationship, ExtractedElement};

/// A canonical-entity candidate from the similarity search.
///
/// The store returns candidates already filtered and ranked; callers must
/// not re-score locally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityCandidate {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub kind: Option<String>,
    pub score: f32,
}

impl EntityCandidate {
    pub fn new(id: Uuid, name: impl Into<String>, score: f32) -> Self {
        Self {
            id,
            name: name.into(),
            kind: None,
            score,
        }
    }

    /// Set the canonical kind label.
    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }
}

/// Ranked similarity search over canonical entities.
///
/// Treated as a stateless, idempotent query service; safe to share across
/// concurrent fragments without client-side locking.
#[async_trait]
pub trait EntityIndex: Send + Sync {
    /// Search for canonical entities similar to `name`.
    ///
    /// When `kind` is None the query runs without a type filter. Results
    /// are ordered best-first and already filtered by the store.
    async fn similarity_search(
        &self,
        name: &str,
        kind: Option<&str>,
        threshold: f32,
        limit: usize,
    ) -> Result<Vec<EntityCandidate>, StoreError>;
}

/// The aggregated result of one fragment, as persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FragmentRecord {
    pub fragment_id: Uuid,
    pub article_id: String,
    pub content_hash: String,
    pub elements: Vec<ExtractedElement>,
    pub normalizations: Vec<NormalizationResult>,
    pub relationships: Vec<ElementRelationship>,
    pub warnings: Vec<String>,
    pub persisted_at: DateTime<Utc>,
}

/// A failed persistence payload, preserved for manual reconciliation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeadLetter {
    pub fragment_id: Uuid,
    pub article_id: String,
    /// The record that could not be persisted.
    pub payload: serde_json::Value,
    /// Serialized form of the error that triggered the dead letter.
    pub error: serde_json::Value,
    pub recorded_at: DateTime<Utc>,
}

/// Persistence RPCs for pipeline results.
#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Persist one fragment's aggregated result.
    async fn persist_outcome(&self, record: &FragmentRecord) -> Result<(), StoreError>;

    /// Record a payload that could not be persisted, so nothing is lost.
    async fn record_dead_letter(&self, letter: &DeadLetter) -> Result<(), StoreError>;
}

/// Composite storage trait used by the pipeline controller.
pub trait FragmentStore: EntityIndex + ResultStore {}

// Blanket implementation: anything implementing both is a FragmentStore.
impl<T: EntityIndex + ResultStore> FragmentStore for T {}
