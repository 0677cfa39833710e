//! Phase 3: quotes and quantitative data.
//!
//! Non-critical: a failing model call here degrades to empty collections
//! rather than manufacturing placeholder elements. The already-extracted
//! facts go into the prompt as context so the model does not restate them.

use tracing::{info, warn};

use crate::error::PipelineError;
use crate::pipeline::call_model;
use crate::pipeline::parse::{parse_model_response, ModelQuotesResponse};
use crate::prompts::format_quotes_prompt;
use crate::traits::model::LanguageModel;
use crate::types::config::PipelineConfig;
use crate::types::element::{ElementKind, ExtractedElement, QuantitativeDatum, Quote};
use crate::types::fragment::Fragment;
use crate::types::outcome::{Phase, PhaseResult};

pub(crate) async fn run_quotes<M: LanguageModel>(
    model: &M,
    config: &PipelineConfig,
    fragment: &mut Fragment,
    forwarded_text: &str,
    fact_statements: &[String],
) -> PhaseResult {
    let prompt = format_quotes_prompt(fact_statements, forwarded_text);

    let response = match call_model(
        model,
        Phase::QuotesAndData,
        config.model_timeout,
        &config.model_retry,
        &prompt,
    )
    .await
    .and_then(|raw| parse_model_response::<ModelQuotesResponse>(Phase::QuotesAndData, &raw))
    {
        Ok(response) => response,
        Err(error) => return quotes_fallback(&error),
    };

    let mut elements = Vec::with_capacity(response.quotes.len() + response.data.len());

    for quote in response.quotes {
        if quote.text.trim().is_empty() {
            continue;
        }
        let local_id = fragment.refs.next_id(ElementKind::Quote, Some(&quote.text));
        elements.push(ExtractedElement::Quote(Quote {
            local_id,
            fragment_id: fragment.id,
            text: quote.text,
            speaker: quote.speaker,
            context: quote.context,
            confidence: quote.confidence,
        }));
    }

    for datum in response.data {
        if datum.description.trim().is_empty() {
            continue;
        }
        let local_id = fragment
            .refs
            .next_id(ElementKind::QuantitativeDatum, Some(&datum.description));
        elements.push(ExtractedElement::QuantitativeDatum(QuantitativeDatum {
            local_id,
            fragment_id: fragment.id,
            value: datum.value,
            unit: datum.unit,
            description: datum.description,
            confidence: datum.confidence,
        }));
    }

    info!(
        fragment_id = %fragment.id,
        quotes = fragment.refs.count(ElementKind::Quote),
        data = fragment.refs.count(ElementKind::QuantitativeDatum),
        "quotes and data complete"
    );

    PhaseResult::ok(Phase::QuotesAndData, elements)
}

/// Fallback: no quotes, no data, one warning.
pub fn quotes_fallback(error: &PipelineError) -> PhaseResult {
    warn!(support_code = %error.support_code, "quotes fallback: empty collections");

    PhaseResult::degraded(
        Phase::QuotesAndData,
        vec![],
        format!(
            "quotes and data degraded: {}; continuing without quotes",
            error.message
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockModel;
    use crate::types::fragment::FragmentPayload;

    fn fragment() -> Fragment {
        Fragment::from_payload(FragmentPayload::new(
            "articulo-1",
            "\"Vamos a duplicar el presupuesto\", dijo la ministra. El aumento es del 15%.",
        ))
    }

    #[tokio::test]
    async fn extracts_quotes_and_data() {
        let model = MockModel::new().respond_to(
            "quotes and quantitative data",
            r#"{
                "quotes": [
                    {"text": "Vamos a duplicar el presupuesto", "speaker": "la ministra", "confidence": 0.9}
                ],
                "data": [
                    {"value": 15.0, "unit": "%", "description": "aumento del presupuesto", "confidence": 0.8}
                ]
            }"#,
        );
        let config = crate::testing::fast_config();
        let mut fragment = fragment();

        let result = run_quotes(&model, &config, &mut fragment, "texto", &[]).await;
        assert!(result.is_success());
        assert_eq!(result.elements_of(ElementKind::Quote).count(), 1);
        assert_eq!(
            result.elements_of(ElementKind::QuantitativeDatum).count(),
            1
        );
    }

    #[tokio::test]
    async fn failure_degrades_to_empty() {
        let model = MockModel::failing("overload upstream");
        let config = crate::testing::fast_config();
        let mut fragment = fragment();

        let result = run_quotes(&model, &config, &mut fragment, "texto", &[]).await;
        assert!(result.degraded);
        assert!(result.elements.is_empty());
    }

    #[test]
    fn fallback_is_deterministic() {
        let error = PipelineError::model(Phase::QuotesAndData, "timeout");
        assert_eq!(quotes_fallback(&error).warnings, quotes_fallback(&error).warnings);
    }
}
