//! Phase 2: fact and entity extraction.
//!
//! The critical phase. When the model call fails after retries, the
//! fallback manufactures exactly one low-confidence fact from the
//! fragment's display title so downstream phases and persistence always
//! have something to work with.

use tracing::{info, warn};

use crate::error::PipelineError;
use crate::pipeline::call_model;
use crate::pipeline::parse::{parse_model_response, ModelExtractionResponse};
use crate::prompts::format_extraction_prompt;
use crate::references::ReferenceManager;
use crate::traits::model::LanguageModel;
use crate::types::config::PipelineConfig;
use crate::types::element::{ElementKind, EntityMention, ExtractedElement, Fact};
use crate::types::fragment::Fragment;
use crate::types::outcome::{Phase, PhaseResult};

/// Confidence assigned to the fallback fact built from the title.
const FALLBACK_FACT_CONFIDENCE: f32 = 0.2;

pub(crate) async fn run_extraction<M: LanguageModel>(
    model: &M,
    config: &PipelineConfig,
    fragment: &mut Fragment,
    forwarded_text: &str,
) -> PhaseResult {
    let prompt = format_extraction_prompt(fragment.display_title(), forwarded_text);
    let title = fragment.display_title().to_string();

    let response = match call_model(
        model,
        Phase::Extraction,
        config.model_timeout,
        &config.model_retry,
        &prompt,
    )
    .await
    .and_then(|raw| parse_model_response::<ModelExtractionResponse>(Phase::Extraction, &raw))
    {
        Ok(response) => response,
        Err(error) => return extraction_fallback(&mut fragment.refs, &title, &error),
    };

    let mut elements = Vec::with_capacity(response.facts.len() + response.entities.len());

    for fact in response.facts {
        if fact.statement.trim().is_empty() {
            continue;
        }
        let local_id = fragment
            .refs
            .next_id(ElementKind::Fact, Some(&fact.statement));
        elements.push(ExtractedElement::Fact(Fact {
            local_id,
            fragment_id: fragment.id,
            statement: fact.statement,
            category: fact.category,
            confidence: fact.confidence,
        }));
    }

    for entity in response.entities {
        if entity.name.trim().is_empty() {
            continue;
        }
        let local_id = fragment.refs.next_id(ElementKind::Entity, Some(&entity.name));
        elements.push(ExtractedElement::Entity(EntityMention {
            local_id,
            fragment_id: fragment.id,
            name: entity.name,
            label: entity.kind,
            relevance: entity.relevance,
        }));
    }

    info!(
        fragment_id = %fragment.id,
        facts = fragment.refs.count(ElementKind::Fact),
        entities = fragment.refs.count(ElementKind::Entity),
        "extraction complete"
    );

    PhaseResult::ok(Phase::Extraction, elements)
}

/// Fallback: one low-confidence fact built from the title, zero entities.
pub fn extraction_fallback(
    refs: &mut ReferenceManager,
    title: &str,
    error: &PipelineError,
) -> PhaseResult {
    warn!(support_code = %error.support_code, "extraction fallback: single fact from title");

    let statement = format!("Fragmento sobre: {}", title);
    let local_id = refs.next_id(ElementKind::Fact, Some(&statement));

    PhaseResult::degraded(
        Phase::Extraction,
        vec![ExtractedElement::Fact(Fact {
            local_id,
            fragment_id: refs.fragment_id(),
            statement,
            category: None,
            confidence: Some(FALLBACK_FACT_CONFIDENCE),
        })],
        format!(
            "extraction degraded: {}; single fallback fact built from the title",
            error.message
        ),
    )
}
