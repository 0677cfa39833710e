//! Phase 4: entity normalization and relationship building.
//!
//! Resolves each extracted entity mention against the canonical index and
//! links quotes and facts to the entities they involve. A failed lookup
//! never drops the entity: it is treated as new and the phase is marked
//! degraded.

use tracing::{info, warn};

use crate::normalizer::{EntityNormalizer, NormalizationResult};
use crate::pipeline::call_store;
use crate::traits::store::EntityIndex;
use crate::types::config::PipelineConfig;
use crate::types::element::{ElementRelationship, ExtractedElement};
use crate::types::outcome::{Phase, PhaseResult};

/// What normalization hands back to the controller.
#[derive(Debug)]
pub struct NormalizationOutput {
    pub result: PhaseResult,
    pub normalizations: Vec<NormalizationResult>,
    pub relationships: Vec<ElementRelationship>,
}

pub(crate) async fn run_normalization<S: EntityIndex>(
    index: &S,
    config: &PipelineConfig,
    elements: &[ExtractedElement],
) -> NormalizationOutput {
    let normalizer = EntityNormalizer::new(index);
    let mut normalizations = Vec::new();
    let mut warnings = Vec::new();
    let mut degraded = false;

    for element in elements {
        let mention = match element {
            ExtractedElement::Entity(mention) => mention,
            _ => continue,
        };

        let outcome = call_store(
            Phase::Normalization,
            config.store_timeout,
            &config.store_retry,
            || {
                normalizer.normalize(
                    &mention.name,
                    mention.label.as_deref(),
                    config.similarity_threshold,
                    config.max_candidates,
                )
            },
        )
        .await;

        match outcome {
            Ok(result) => normalizations.push(result),
            Err(error) => {
                warn!(
                    entity = %mention.name,
                    support_code = %error.support_code,
                    "normalization lookup failed; treating entity as new"
                );
                warnings.push(format!(
                    "normalization degraded for '{}': {}; treated as new",
                    mention.name, error.message
                ));
                degraded = true;
                normalizations.push(NormalizationResult::new_entity(
                    mention.name.clone(),
                    mention.label.clone(),
                ));
            }
        }
    }

    let relationships = build_relationships(elements);

    info!(
        entities = normalizations.len(),
        known = normalizations.iter().filter(|n| !n.is_new).count(),
        relationships = relationships.len(),
        "normalization complete"
    );

    let mut result = PhaseResult {
        phase: Phase::Normalization,
        elements: vec![],
        warnings,
        degraded,
    };
    if result.degraded && result.warnings.is_empty() {
        result = result.with_warning("normalization degraded");
    }

    NormalizationOutput {
        result,
        normalizations,
        relationships,
    }
}

/// Link quotes to their speakers and facts to the entities they mention.
///
/// Links are heuristic and local to the fragment: a quote is attributed to
/// an entity whose name equals its speaker (case-insensitive), and a fact
/// mentions every entity whose name appears inside its statement.
pub fn build_relationships(elements: &[ExtractedElement]) -> Vec<ElementRelationship> {
    let entities: Vec<_> = elements
        .iter()
        .filter_map(|e| match e {
            ExtractedElement::Entity(mention) => Some((e.reference(), mention)),
            _ => None,
        })
        .collect();

    let mut relationships = Vec::new();

    for element in elements {
        match element {
            ExtractedElement::Quote(quote) => {
                let Some(speaker) = quote.speaker.as_deref() else {
                    continue;
                };
                for (entity_ref, mention) in &entities {
                    if mention.name.eq_ignore_ascii_case(speaker.trim()) {
                        relationships.push(ElementRelationship {
                            from: element.reference(),
                            to: *entity_ref,
                            relation: "attributed_to".into(),
                        });
                    }
                }
            }
            ExtractedElement::Fact(fact) => {
                let statement = fact.statement.to_lowercase();
                for (entity_ref, mention) in &entities {
                    // Very short names produce spurious substring hits.
                    if mention.name.chars().count() < 3 {
                        continue;
                    }
                    if statement.contains(&mention.name.to_lowercase()) {
                        relationships.push(ElementRelationship {
                            from: element.reference(),
                            to: *entity_ref,
                            relation: "mentions".into(),
                        });
                    }
                }
            }
            _ => {}
        }
    }

    relationships
}
