//! The pipeline controller.
//!
//! Owns the model and store handles plus the config, and drives the five
//! phases in order for one fragment at a time. The controller holds no
//! state between runs; concurrency is the caller's choice (one controller
//! shared across tasks, or one per task).

use chrono::Utc;
use tracing::{info, warn};

use crate::error::PipelineError;
use crate::pipeline::extraction::run_extraction;
use crate::pipeline::normalization::run_normalization;
use crate::pipeline::persistence::run_persistence;
use crate::pipeline::quotes::run_quotes;
use crate::pipeline::triage::run_triage;
use crate::traits::model::LanguageModel;
use crate::traits::store::{FragmentRecord, FragmentStore};
use crate::types::config::PipelineConfig;
use crate::types::element::ExtractedElement;
use crate::types::fragment::{Fragment, FragmentPayload};
use crate::types::outcome::{Phase, PipelineOutcome, PipelineStatus};

/// Drives fragments through triage, extraction, quotes, normalization,
/// and persistence.
pub struct Pipeline<S: FragmentStore, M: LanguageModel> {
    store: S,
    model: M,
    config: PipelineConfig,
}

impl<S: FragmentStore, M: LanguageModel> Pipeline<S, M> {
    /// Create a pipeline with the default config.
    pub fn new(store: S, model: M) -> Self {
        Self::with_config(store, model, PipelineConfig::default())
    }

    /// Create a pipeline with an explicit config.
    pub fn with_config(store: S, model: M, config: PipelineConfig) -> Self {
        Self {
            store,
            model,
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Process one fragment end to end.
    ///
    /// Never panics and never returns early with partial state: every exit
    /// path produces a complete [`PipelineOutcome`]. `Failed` is reserved
    /// for terminal validation errors and unrecoverable persistence.
    pub async fn run(&self, payload: FragmentPayload) -> PipelineOutcome {
        let started_at = Utc::now();
        let article_id = payload.article_id.clone();

        let intake_warnings = match payload.validate(&self.config) {
            Ok(warnings) => warnings,
            Err(error) => {
                warn!(
                    article_id = %article_id,
                    support_code = %error.support_code,
                    "fragment rejected at intake"
                );
                return failed_outcome(
                    uuid::Uuid::new_v4(),
                    article_id,
                    vec![],
                    vec![],
                    error,
                    started_at,
                );
            }
        };

        let mut fragment = Fragment::from_payload(payload);
        info!(
            fragment_id = %fragment.id,
            article_id = %fragment.article_id,
            "pipeline run started"
        );

        let mut phases = Vec::with_capacity(Phase::ORDERED.len());
        let mut warnings = intake_warnings;

        // Phase 1: triage.
        let triage = run_triage(&self.model, &self.config, &fragment).await;
        warnings.extend(triage.result.warnings.iter().cloned());
        phases.push(triage.result);
        let forwarded_text = triage.forwarded_text;

        // Phase 2: facts and entities.
        let extraction =
            run_extraction(&self.model, &self.config, &mut fragment, &forwarded_text).await;
        warnings.extend(extraction.warnings.iter().cloned());
        let fact_statements: Vec<String> = extraction
            .elements
            .iter()
            .filter_map(|e| match e {
                ExtractedElement::Fact(fact) => Some(fact.statement.clone()),
                _ => None,
            })
            .collect();
        phases.push(extraction);

        // Phase 3: quotes and quantitative data.
        let quotes = run_quotes(
            &self.model,
            &self.config,
            &mut fragment,
            &forwarded_text,
            &fact_statements,
        )
        .await;
        warnings.extend(quotes.warnings.iter().cloned());
        phases.push(quotes);

        // Phase 4: normalization and relationships, over everything
        // extracted so far.
        let elements: Vec<ExtractedElement> = phases
            .iter()
            .flat_map(|p| p.elements.iter().cloned())
            .collect();
        let normalization = run_normalization(&self.store, &self.config, &elements).await;
        warnings.extend(normalization.result.warnings.iter().cloned());
        phases.push(normalization.result);

        // Phase 5: persistence. Failure past the dead-letter net is the
        // one mid-pipeline condition that fails the run.
        let record = FragmentRecord {
            fragment_id: fragment.id,
            article_id: fragment.article_id.clone(),
            content_hash: fragment.content_hash.clone(),
            elements,
            normalizations: normalization.normalizations.clone(),
            relationships: normalization.relationships.clone(),
            warnings: warnings.clone(),
            persisted_at: Utc::now(),
        };

        match run_persistence(&self.store, &self.config, &record).await {
            Ok(result) => {
                warnings.extend(result.warnings.iter().cloned());
                phases.push(result);
            }
            Err(error) => {
                return failed_outcome(
                    fragment.id,
                    fragment.article_id,
                    phases,
                    warnings,
                    error,
                    started_at,
                );
            }
        }

        let status = if phases.iter().all(|p| p.is_success()) {
            PipelineStatus::Success
        } else {
            PipelineStatus::PartialSuccess
        };

        info!(
            fragment_id = %fragment.id,
            status = ?status,
            elements = record.elements.len(),
            warnings = warnings.len(),
            "pipeline run finished"
        );

        PipelineOutcome {
            fragment_id: fragment.id,
            article_id: fragment.article_id,
            status,
            phases,
            warnings,
            normalizations: normalization.normalizations,
            relationships: normalization.relationships,
            error: None,
            started_at,
            finished_at: Utc::now(),
        }
    }
}

fn failed_outcome(
    fragment_id: uuid::Uuid,
    article_id: String,
    phases: Vec<crate::types::outcome::PhaseResult>,
    warnings: Vec<String>,
    error: PipelineError,
    started_at: chrono::DateTime<Utc>,
) -> PipelineOutcome {
    PipelineOutcome {
        fragment_id,
        article_id,
        status: PipelineStatus::Failed,
        phases,
        warnings,
        normalizations: vec![],
        relationships: vec![],
        error: Some(error),
        started_at,
        finished_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::memory::MemoryStore;
    use crate::testing::MockModel;

    fn long_text() -> &'static str {
        "El Banco Central anunció que la tasa de interés subirá dos puntos \
         durante el próximo trimestre, según informó su presidenta."
    }

    #[tokio::test]
    async fn clean_run_is_success() {
        let pipeline = Pipeline::new(MemoryStore::new(), MockModel::scripted_defaults());

        let outcome = pipeline
            .run(FragmentPayload::new("articulo-1", long_text()))
            .await;

        assert_eq!(outcome.status, PipelineStatus::Success);
        assert_eq!(outcome.phases.len(), 5);
        assert!(outcome.error.is_none());
    }

    #[tokio::test]
    async fn phases_run_in_fixed_order() {
        let pipeline = Pipeline::new(MemoryStore::new(), MockModel::scripted_defaults());

        let outcome = pipeline
            .run(FragmentPayload::new("articulo-1", long_text()))
            .await;

        let order: Vec<Phase> = outcome.phases.iter().map(|p| p.phase).collect();
        assert_eq!(order, Phase::ORDERED.to_vec());
    }

    #[tokio::test]
    async fn terminal_validation_fails_without_running_phases() {
        let model = MockModel::scripted_defaults();
        let pipeline = Pipeline::new(MemoryStore::new(), model.clone());

        let outcome = pipeline
            .run(FragmentPayload::new("articulo-1", "corto").needing_special_review())
            .await;

        assert_eq!(outcome.status, PipelineStatus::Failed);
        assert!(outcome.phases.is_empty());
        assert_eq!(model.call_count(), 0);
    }
}
