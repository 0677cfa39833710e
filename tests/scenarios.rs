//! Integration tests for the full pipeline.
//!
//! These tests verify the end-to-end fragment workflow:
//! 1. Validate and build the fragment
//! 2. Triage, extraction, quotes, normalization, persistence in order
//! 3. Degradation paths that keep the run alive
//! 4. The dead-letter net under persistence failure

use prensa::testing::{
    fast_config, FailingStore, MockModel, EXTRACTION_MARKER, QUOTES_MARKER, TRIAGE_MARKER,
};
use prensa::{
    ElementKind, ExtractedElement, FragmentPayload, MemoryStore, Phase, Pipeline, PipelineStatus,
};

fn long_text() -> &'static str {
    "El Banco Central anunció que la tasa de interés de referencia subirá dos \
     puntos porcentuales durante el próximo trimestre. \"La prioridad es \
     contener la inflación\", dijo María Pérez, presidenta de la entidad. El \
     aumento llevará la tasa al 42%."
}

fn scripted_model() -> MockModel {
    MockModel::new()
        .respond_to(
            TRIAGE_MARKER,
            r#"{"relevant": true, "reason": "economía nacional"}"#,
        )
        .respond_to(
            EXTRACTION_MARKER,
            r#"{
                "facts": [
                    {"statement": "El Banco Central subirá la tasa dos puntos porcentuales", "category": "economia", "confidence": 0.92},
                    {"statement": "El aumento llevará la tasa al 42%", "category": "economia", "confidence": 0.88}
                ],
                "entities": [
                    {"name": "Banco Central", "kind": "organizacion", "relevance": 0.95},
                    {"name": "María Pérez", "kind": "persona", "relevance": 0.8}
                ]
            }"#,
        )
        .respond_to(
            QUOTES_MARKER,
            r#"{
                "quotes": [
                    {"text": "La prioridad es contener la inflación", "speaker": "María Pérez", "confidence": 0.9}
                ],
                "data": [
                    {"value": 42.0, "unit": "%", "description": "tasa de interés resultante", "confidence": 0.85}
                ]
            }"#,
        )
}

#[tokio::test]
async fn clean_fragment_runs_all_phases_and_persists() {
    let store = MemoryStore::new().with_entity("Banco Central", Some("organizacion"));
    let pipeline = Pipeline::with_config(store, scripted_model(), fast_config());

    let outcome = pipeline
        .run(FragmentPayload::new("articulo-1", long_text()).with_title("Suba de tasas"))
        .await;

    assert_eq!(outcome.status, PipelineStatus::Success);
    assert!(outcome.error.is_none());
    assert_eq!(
        outcome.phases.iter().map(|p| p.phase).collect::<Vec<_>>(),
        Phase::ORDERED.to_vec()
    );

    // Two facts, two entities, one quote, one datum.
    assert_eq!(outcome.elements().count(), 6);

    // Local ids are sequential per kind, starting at 1.
    let fact_ids: Vec<u32> = outcome
        .elements()
        .filter(|e| e.kind() == ElementKind::Fact)
        .map(|e| e.local_id())
        .collect();
    assert_eq!(fact_ids, vec![1, 2]);

    // Known entity resolved, unknown person is new.
    assert_eq!(outcome.normalizations.len(), 2);
    let banco = outcome
        .normalizations
        .iter()
        .find(|n| n.original_name == "Banco Central")
        .unwrap();
    assert!(!banco.is_new);
    let persona = outcome
        .normalizations
        .iter()
        .find(|n| n.original_name == "María Pérez")
        .unwrap();
    assert!(persona.is_new);

    // The quote is attributed to its speaker.
    assert!(outcome
        .relationships
        .iter()
        .any(|r| r.relation == "attributed_to"));

    // The fact mentioning "Banco Central" links to the entity.
    assert!(outcome.relationships.iter().any(|r| r.relation == "mentions"));
}

#[tokio::test]
async fn persisted_record_round_trips_references() {
    let store = MemoryStore::new();
    let pipeline = Pipeline::with_config(store, scripted_model(), fast_config());

    let outcome = pipeline
        .run(FragmentPayload::new("articulo-1", long_text()))
        .await;
    assert_eq!(outcome.status, PipelineStatus::Success);

    // Every element's encoded reference decodes back to itself.
    for element in outcome.elements() {
        let reference = element.reference();
        let decoded = prensa::GlobalReference::decode(&reference.encode()).unwrap();
        assert_eq!(decoded, reference);
        assert_eq!(decoded.fragment_id, outcome.fragment_id);
    }
}

#[tokio::test]
async fn short_flagged_fragment_fails_at_intake() {
    let model = scripted_model();
    let pipeline = Pipeline::with_config(MemoryStore::new(), model.clone(), fast_config());

    let outcome = pipeline
        .run(FragmentPayload::new("articulo-2", "muy corto").needing_special_review())
        .await;

    assert_eq!(outcome.status, PipelineStatus::Failed);
    assert!(outcome.phases.is_empty());
    assert_eq!(model.call_count(), 0, "no phase should have run");

    let error = outcome.error.unwrap();
    assert_eq!(error.phase, Phase::Intake);
    assert!(error.message.contains("50"));
    assert!(error.support_code.starts_with("ERR_INTAKE_"));
}

#[tokio::test]
async fn short_unflagged_fragment_proceeds_with_warning() {
    let pipeline = Pipeline::with_config(MemoryStore::new(), scripted_model(), fast_config());

    let outcome = pipeline
        .run(FragmentPayload::new("articulo-3", "Suba de tasas confirmada."))
        .await;

    assert_ne!(outcome.status, PipelineStatus::Failed);
    assert!(outcome.warnings.iter().any(|w| w.contains("50")));
}

#[tokio::test]
async fn extraction_outage_degrades_to_title_fact_and_continues() {
    let model = MockModel::new()
        .respond_to(TRIAGE_MARKER, r#"{"relevant": true}"#)
        .failing_on(EXTRACTION_MARKER, "connection reset")
        .respond_to(QUOTES_MARKER, r#"{"quotes": [], "data": []}"#);
    let store = MemoryStore::new();
    let pipeline = Pipeline::with_config(store, model.clone(), fast_config());

    let outcome = pipeline
        .run(FragmentPayload::new("articulo-4", long_text()).with_title("Suba de tasas"))
        .await;

    assert_eq!(outcome.status, PipelineStatus::PartialSuccess);
    assert!(outcome.error.is_none(), "degradation is not failure");

    // The extraction call was retried before falling back.
    assert_eq!(model.calls_matching(EXTRACTION_MARKER), 2);

    // Exactly one low-confidence fact built from the title, no entities.
    let extraction = outcome.phase(Phase::Extraction).unwrap();
    assert!(extraction.degraded);
    assert_eq!(extraction.elements.len(), 1);
    match &extraction.elements[0] {
        ExtractedElement::Fact(fact) => {
            assert!(fact.statement.contains("Suba de tasas"));
            assert!(fact.confidence.unwrap() < 0.5);
        }
        other => panic!("expected fallback fact, got {:?}", other),
    }

    // Later phases still ran and the record was persisted.
    assert_eq!(outcome.phases.len(), 5);
}

#[tokio::test]
async fn quotes_outage_yields_empty_collections_not_placeholders() {
    let model = MockModel::new()
        .respond_to(TRIAGE_MARKER, r#"{"relevant": true}"#)
        .respond_to(
            EXTRACTION_MARKER,
            r#"{"facts": [{"statement": "Hecho principal"}], "entities": []}"#,
        )
        .failing_on(QUOTES_MARKER, "gateway timeout");
    let pipeline = Pipeline::with_config(MemoryStore::new(), model, fast_config());

    let outcome = pipeline
        .run(FragmentPayload::new("articulo-5", long_text()))
        .await;

    assert_eq!(outcome.status, PipelineStatus::PartialSuccess);
    let quotes = outcome.phase(Phase::QuotesAndData).unwrap();
    assert!(quotes.degraded);
    assert!(quotes.elements.is_empty());
}

#[tokio::test]
async fn persistence_failure_lands_in_dead_letter_queue() {
    let store = FailingStore::persist_errors(MemoryStore::new());
    let pipeline = Pipeline::with_config(store, scripted_model(), fast_config());

    let outcome = pipeline
        .run(FragmentPayload::new("articulo-6", long_text()))
        .await;

    assert_eq!(outcome.status, PipelineStatus::PartialSuccess);
    assert!(outcome
        .warnings
        .iter()
        .any(|w| w.contains("dead letter")));
}

#[tokio::test]
async fn dead_letter_failure_fails_the_run() {
    let store = FailingStore::all_writes_error(MemoryStore::new());
    let pipeline = Pipeline::with_config(store, scripted_model(), fast_config());

    let outcome = pipeline
        .run(FragmentPayload::new("articulo-7", long_text()))
        .await;

    assert_eq!(outcome.status, PipelineStatus::Failed);
    let error = outcome.error.unwrap();
    assert_eq!(error.phase, Phase::Persistence);
    assert!(error.terminal);

    // Earlier phase results are still reported alongside the failure.
    assert_eq!(outcome.phases.len(), 4);
}

#[tokio::test]
async fn overloaded_model_is_not_retried() {
    let model = MockModel::overloaded();
    let pipeline = Pipeline::with_config(MemoryStore::new(), model.clone(), fast_config());

    let outcome = pipeline
        .run(FragmentPayload::new("articulo-8", long_text()))
        .await;

    // Every phase degraded, but the run survived.
    assert_eq!(outcome.status, PipelineStatus::PartialSuccess);

    // One attempt per model phase: overload short-circuits the budget.
    assert_eq!(model.calls_matching(TRIAGE_MARKER), 1);
    assert_eq!(model.calls_matching(EXTRACTION_MARKER), 1);
    assert_eq!(model.calls_matching(QUOTES_MARKER), 1);
}

#[tokio::test]
async fn normalization_outage_treats_entities_as_new() {
    let store = FailingStore::search_errors(MemoryStore::new());
    let pipeline = Pipeline::with_config(store, scripted_model(), fast_config());

    let outcome = pipeline
        .run(FragmentPayload::new("articulo-9", long_text()))
        .await;

    assert_eq!(outcome.status, PipelineStatus::PartialSuccess);
    assert_eq!(outcome.normalizations.len(), 2);
    assert!(outcome.normalizations.iter().all(|n| n.is_new));
    assert!(outcome.phase(Phase::Normalization).unwrap().degraded);
}
