//! Entity normalization against the canonical-entity index.
//!
//! Decides whether a candidate entity name refers to an already-known
//! canonical entity or is new. The store ranks candidates; the normalizer
//! takes the first returned candidate and applies the threshold; it never
//! re-scores locally.

use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::StoreError;
use crate::traits::store::EntityIndex;

/// The decision for one candidate entity name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizationResult {
    /// Name as submitted.
    pub original_name: String,

    /// Type filter as submitted, if any.
    pub original_kind: Option<String>,

    /// Canonical entity id; None when the entity is new.
    pub canonical_id: Option<Uuid>,

    /// Canonical name; None when the entity is new.
    pub canonical_name: Option<String>,

    /// Canonical type as the store returned it; None when new.
    pub canonical_kind: Option<String>,

    /// Similarity score of the match; 0.0 when new.
    pub score: f32,

    pub is_new: bool,
}

impl NormalizationResult {
    /// A "no match, treat as new" result.
    pub fn new_entity(name: impl Into<String>, kind: Option<String>) -> Self {
        Self {
            original_name: name.into(),
            original_kind: kind,
            canonical_id: None,
            canonical_name: None,
            canonical_kind: None,
            score: 0.0,
            is_new: true,
        }
    }
}

/// Matcher over an [`EntityIndex`].
pub struct EntityNormalizer<'a, S: EntityIndex> {
    index: &'a S,
}

impl<'a, S: EntityIndex> EntityNormalizer<'a, S> {
    pub fn new(index: &'a S) -> Self {
        Self { index }
    }

    /// Decide whether `name` matches a known canonical entity.
    ///
    /// The first (highest-ranked) candidate wins regardless of how many
    /// lower-ranked candidates were also returned. An empty candidate list,
    /// or a top score below `threshold`, classifies the entity as new.
    ///
    /// A failing similarity search propagates unmodified; callers decide
    /// whether a missing normalization is fatal or "treat as new".
    pub async fn normalize(
        &self,
        name: &str,
        kind: Option<&str>,
        threshold: f32,
        max_candidates: usize,
    ) -> Result<NormalizationResult, StoreError> {
        let candidates = self
            .index
            .similarity_search(name, kind, threshold, max_candidates.max(1))
            .await?;

        let top = match candidates.into_iter().next() {
            Some(c) => c,
            None => {
                debug!(name, "no canonical candidates; entity is new");
                return Ok(NormalizationResult::new_entity(
                    name,
                    kind.map(str::to_string),
                ));
            }
        };

        if top.score < threshold {
            debug!(
                name,
                top_score = top.score,
                threshold,
                "top candidate below threshold; entity is new"
            );
            return Ok(NormalizationResult::new_entity(
                name,
                kind.map(str::to_string),
            ));
        }

        debug!(
            name,
            canonical = %top.name,
            score = top.score,
            "matched canonical entity"
        );

        Ok(NormalizationResult {
            original_name: name.to_string(),
            original_kind: kind.map(str::to_string),
            canonical_id: Some(top.id),
            canonical_name: Some(top.name),
            canonical_kind: top.kind,
            score: top.score,
            is_new: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::store::EntityCandidate;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Scripted index returning a fixed candidate list and logging queries.
    struct ScriptedIndex {
        candidates: Vec<EntityCandidate>,
        fail: bool,
        queries: Mutex<Vec<(String, Option<String>, f32, usize)>>,
    }

    impl ScriptedIndex {
        fn returning(candidates: Vec<EntityCandidate>) -> Self {
            Self {
                candidates,
                fail: false,
                queries: Mutex::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self {
                candidates: Vec::new(),
                fail: true,
                queries: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl EntityIndex for ScriptedIndex {
        async fn similarity_search(
            &self,
            name: &str,
            kind: Option<&str>,
            threshold: f32,
            limit: usize,
        ) -> Result<Vec<EntityCandidate>, StoreError> {
            self.queries.lock().unwrap().push((
                name.to_string(),
                kind.map(str::to_string),
                threshold,
                limit,
            ));
            if self.fail {
                return Err(StoreError::Connection("index down".into()));
            }
            Ok(self.candidates.clone())
        }
    }

    #[tokio::test]
    async fn empty_candidates_mean_new_entity() {
        let index = ScriptedIndex::returning(vec![]);
        let result = EntityNormalizer::new(&index)
            .normalize("Fundación Azul", None, 0.7, 1)
            .await
            .unwrap();

        assert!(result.is_new);
        assert_eq!(result.score, 0.0);
        assert!(result.canonical_id.is_none());
        assert_eq!(result.original_name, "Fundación Azul");
    }

    #[tokio::test]
    async fn first_candidate_wins_over_lower_ranked() {
        // Store returns two candidates; the first one is the match.
        let top = Uuid::new_v4();
        let index = ScriptedIndex::returning(vec![
            EntityCandidate::new(top, "Microsoft", 0.98).with_kind("organizacion"),
            EntityCandidate::new(Uuid::new_v4(), "Microsoft Ibérica", 0.85),
        ]);

        let result = EntityNormalizer::new(&index)
            .normalize("Microsoft", None, 0.6, 2)
            .await
            .unwrap();

        assert!(!result.is_new);
        assert_eq!(result.canonical_id, Some(top));
        assert_eq!(result.canonical_name.as_deref(), Some("Microsoft"));
        assert_eq!(result.canonical_kind.as_deref(), Some("organizacion"));
        assert!((result.score - 0.98).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn below_threshold_top_candidate_is_new() {
        let index = ScriptedIndex::returning(vec![EntityCandidate::new(
            Uuid::new_v4(),
            "Banco Central",
            0.55,
        )]);

        let result = EntityNormalizer::new(&index)
            .normalize("Banco Centrál del Sur", Some("organizacion"), 0.7, 1)
            .await
            .unwrap();

        assert!(result.is_new);
        assert_eq!(result.score, 0.0);
        assert_eq!(result.original_kind.as_deref(), Some("organizacion"));
    }

    #[tokio::test]
    async fn omitted_kind_queries_without_filter() {
        let index = ScriptedIndex::returning(vec![]);
        EntityNormalizer::new(&index)
            .normalize("Sofía Pérez", None, 0.7, 1)
            .await
            .unwrap();

        let queries = index.queries.lock().unwrap();
        assert_eq!(queries[0].1, None);
        assert_eq!(queries[0].3, 1);
    }

    #[tokio::test]
    async fn store_errors_propagate_unmodified() {
        let index = ScriptedIndex::failing();
        let err = EntityNormalizer::new(&index)
            .normalize("Microsoft", None, 0.7, 1)
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::Connection(_)));
    }
}
