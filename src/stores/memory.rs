//! In-memory storage implementation for testing and development.

use async_trait::async_trait;
use std::sync::RwLock;
use uuid::Uuid;

use crate::error::StoreError;
use crate::traits::store::{
    DeadLetter, EntityCandidate, EntityIndex, FragmentRecord, ResultStore,
};

/// A canonical entity seeded into the in-memory index.
#[derive(Debug, Clone)]
pub struct CanonicalEntity {
    pub id: Uuid,
    pub name: String,
    pub kind: Option<String>,
}

/// In-memory entity index and result store.
///
/// Useful for testing and development. Not suitable for production as
/// data is lost on restart. Similarity is normalized Levenshtein over
/// lowercased names.
pub struct MemoryStore {
    entities: RwLock<Vec<CanonicalEntity>>,
    records: RwLock<Vec<FragmentRecord>>,
    dead_letters: RwLock<Vec<DeadLetter>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create a new empty memory store.
    pub fn new() -> Self {
        Self {
            entities: RwLock::new(Vec::new()),
            records: RwLock::new(Vec::new()),
            dead_letters: RwLock::new(Vec::new()),
        }
    }

    /// Seed a canonical entity, builder-style.
    pub fn with_entity(self, name: impl Into<String>, kind: Option<&str>) -> Self {
        self.seed_entity(name, kind);
        self
    }

    /// Seed a canonical entity, returning its id.
    pub fn seed_entity(&self, name: impl Into<String>, kind: Option<&str>) -> Uuid {
        let id = Uuid::new_v4();
        self.entities.write().unwrap().push(CanonicalEntity {
            id,
            name: name.into(),
            kind: kind.map(str::to_string),
        });
        id
    }

    /// All persisted fragment records.
    pub fn records(&self) -> Vec<FragmentRecord> {
        self.records.read().unwrap().clone()
    }

    /// All recorded dead letters.
    pub fn dead_letters(&self) -> Vec<DeadLetter> {
        self.dead_letters.read().unwrap().clone()
    }

    /// Number of seeded canonical entities.
    pub fn entity_count(&self) -> usize {
        self.entities.read().unwrap().len()
    }

    /// Clear all stored data.
    pub fn clear(&self) {
        self.entities.write().unwrap().clear();
        self.records.write().unwrap().clear();
        self.dead_letters.write().unwrap().clear();
    }
}

fn name_similarity(a: &str, b: &str) -> f32 {
    strsim::normalized_levenshtein(&a.to_lowercase(), &b.to_lowercase()) as f32
}

#[async_trait]
impl EntityIndex for MemoryStore {
    async fn similarity_search(
        &self,
        name: &str,
        kind: Option<&str>,
        threshold: f32,
        limit: usize,
    ) -> Result<Vec<EntityCandidate>, StoreError> {
        let entities = self.entities.read().unwrap();

        let mut candidates: Vec<EntityCandidate> = entities
            .iter()
            .filter(|e| match (kind, e.kind.as_deref()) {
                (Some(wanted), Some(have)) => wanted.eq_ignore_ascii_case(have),
                _ => true,
            })
            .map(|e| {
                let mut candidate =
                    EntityCandidate::new(e.id, e.name.clone(), name_similarity(name, &e.name));
                if let Some(k) = &e.kind {
                    candidate = candidate.with_kind(k.clone());
                }
                candidate
            })
            .filter(|c| c.score >= threshold)
            .collect();

        candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
        candidates.truncate(limit);
        Ok(candidates)
    }
}

#[async_trait]
impl ResultStore for MemoryStore {
    async fn persist_outcome(&self, record: &FragmentRecord) -> Result<(), StoreError> {
        self.records.write().unwrap().push(record.clone());
        Ok(())
    }

    async fn record_dead_letter(&self, letter: &DeadLetter) -> Result<(), StoreError> {
        self.dead_letters.write().unwrap().push(letter.clone());
        Ok(())
    }
}
