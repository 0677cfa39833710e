//! Phase 1: triage.
//!
//! Asks the model whether the fragment is worth extracting and which
//! portion of the text to forward. Triage never stops the pipeline: a
//! model failure or a "not relevant" verdict both forward the full text
//! with a warning, and extraction decides what it can find.

use tracing::{info, warn};

use crate::error::PipelineError;
use crate::pipeline::call_model;
use crate::pipeline::parse::{parse_model_response, ModelTriageResponse};
use crate::prompts::format_triage_prompt;
use crate::traits::model::LanguageModel;
use crate::types::config::PipelineConfig;
use crate::types::fragment::Fragment;
use crate::types::outcome::{Phase, PhaseResult};

/// What triage hands to the downstream phases.
#[derive(Debug)]
pub struct TriageOutput {
    pub result: PhaseResult,

    /// Text the extraction phases should work on.
    pub forwarded_text: String,

    /// The model's relevance verdict; advisory only.
    pub relevant: bool,
}

pub(crate) async fn run_triage<M: LanguageModel>(
    model: &M,
    config: &PipelineConfig,
    fragment: &Fragment,
) -> TriageOutput {
    let prompt = format_triage_prompt(fragment.display_title(), &fragment.text);

    let response = match call_model(
        model,
        Phase::Triage,
        config.model_timeout,
        &config.model_retry,
        &prompt,
    )
    .await
    .and_then(|raw| parse_model_response::<ModelTriageResponse>(Phase::Triage, &raw))
    {
        Ok(response) => response,
        Err(error) => return triage_fallback(&fragment.text, &error),
    };

    let forwarded_text = match response.relevant_text {
        Some(text) if !text.trim().is_empty() => text,
        _ => fragment.text.clone(),
    };

    let result = if response.relevant {
        info!(fragment_id = %fragment.id, "triage: fragment relevant");
        PhaseResult::ok(Phase::Triage, vec![])
    } else {
        let reason = response.reason.as_deref().unwrap_or("no reason given");
        info!(fragment_id = %fragment.id, reason, "triage: fragment judged not relevant");
        PhaseResult::ok(Phase::Triage, vec![]).with_warning(format!(
            "triage judged the fragment not relevant ({}); extraction will run anyway",
            reason
        ))
    };

    TriageOutput {
        result,
        forwarded_text,
        relevant: response.relevant,
    }
}

/// Fallback: forward the full text and mark the phase degraded.
///
/// Pure over its inputs, so identical errors yield identical results.
pub fn triage_fallback(fragment_text: &str, error: &PipelineError) -> TriageOutput {
    warn!(support_code = %error.support_code, "triage fallback: forwarding full text");

    TriageOutput {
        result: PhaseResult::degraded(
            Phase::Triage,
            vec![],
            format!("triage degraded: {}; full text forwarded", error.message),
        ),
        forwarded_text: fragment_text.to_string(),
        relevant: true,
    }
}
