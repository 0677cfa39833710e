//! Phase 5: persistence.
//!
//! Persists the aggregated fragment record. When the primary write fails
//! after retries, the record is preserved as a dead letter so no extracted
//! data is lost; only a dead-letter failure on top of that escalates to a
//! failed run.

use chrono::Utc;
use tracing::{error, info, warn};

use crate::error::{PipelineError, Result};
use crate::pipeline::call_store;
use crate::traits::store::{DeadLetter, FragmentRecord, ResultStore};
use crate::types::config::PipelineConfig;
use crate::types::outcome::{Phase, PhaseResult};

pub(crate) async fn run_persistence<S: ResultStore>(
    store: &S,
    config: &PipelineConfig,
    record: &FragmentRecord,
) -> Result<PhaseResult> {
    let primary = call_store(
        Phase::Persistence,
        config.store_timeout,
        &config.store_retry,
        || store.persist_outcome(record),
    )
    .await;

    let persist_error = match primary {
        Ok(()) => {
            info!(
                fragment_id = %record.fragment_id,
                elements = record.elements.len(),
                "fragment record persisted"
            );
            return Ok(PhaseResult::ok(Phase::Persistence, vec![]));
        }
        Err(e) => e,
    };

    warn!(
        fragment_id = %record.fragment_id,
        support_code = %persist_error.support_code,
        "persistence failed; recording dead letter"
    );

    let letter = DeadLetter {
        fragment_id: record.fragment_id,
        article_id: record.article_id.clone(),
        payload: serde_json::to_value(record).unwrap_or_else(|e| {
            serde_json::json!({ "serialization_error": e.to_string() })
        }),
        error: persist_error.to_json(),
        recorded_at: Utc::now(),
    };

    match call_store(
        Phase::Persistence,
        config.store_timeout,
        &config.store_retry,
        || store.record_dead_letter(&letter),
    )
    .await
    {
        Ok(()) => Ok(PhaseResult::degraded(
            Phase::Persistence,
            vec![],
            format!(
                "persistence degraded: {}; record preserved as dead letter",
                persist_error.message
            ),
        )),
        Err(letter_error) => {
            error!(
                fragment_id = %record.fragment_id,
                support_code = %letter_error.support_code,
                "dead-letter write also failed; run is unrecoverable"
            );
            Err(PipelineError::store(
                Phase::Persistence,
                format!(
                    "persistence failed ({}) and the dead-letter write also failed ({})",
                    persist_error.message, letter_error.message
                ),
            )
            .as_terminal())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::memory::MemoryStore;
    use crate::testing::FailingStore;
    use uuid::Uuid;

    fn record() -> FragmentRecord {
        FragmentRecord {
            fragment_id: Uuid::new_v4(),
            article_id: "articulo-1".into(),
            content_hash: "abc".into(),
            elements: vec![],
            normalizations: vec![],
            relationships: vec![],
            warnings: vec![],
            persisted_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn persists_record() {
        let store = MemoryStore::new();
        let config = crate::testing::fast_config();
        let record = record();

        let result = run_persistence(&store, &config, &record).await.unwrap();
        assert!(result.is_success());
        assert_eq!(store.records().len(), 1);
    }

    #[tokio::test]
    async fn persist_failure_records_dead_letter() {
        let inner = MemoryStore::new();
        let store = FailingStore::persist_errors(inner);
        let config = crate::testing::fast_config();
        let record = record();

        let result = run_persistence(&store, &config, &record).await.unwrap();
        assert!(result.degraded);
        assert!(result.warnings[0].contains("dead letter"));
        assert_eq!(store.inner().dead_letters().len(), 1);
        assert_eq!(
            store.inner().dead_letters()[0].fragment_id,
            record.fragment_id
        );
    }

    #[tokio::test]
    async fn dead_letter_failure_escalates() {
        let store = FailingStore::all_writes_error(MemoryStore::new());
        let config = crate::testing::fast_config();

        let err = run_persistence(&store, &config, &record()).await.unwrap_err();
        assert!(err.terminal);
        assert_eq!(err.phase, Phase::Persistence);
    }
}
