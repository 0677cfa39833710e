//! Parse model responses into structured phase inputs.
//!
//! Models wrap JSON in markdown code fences often enough that responses are
//! scrubbed before parsing. A response that still fails to parse is an
//! `ExternalModel` error routed through the phase's fallback path.

use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::error::{PipelineError, Result};
use crate::types::outcome::Phase;

/// Triage response shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelTriageResponse {
    pub relevant: bool,
    #[serde(default)]
    pub reason: Option<String>,
    /// Portion of the text worth extracting; None means all of it.
    #[serde(default)]
    pub relevant_text: Option<String>,
}

/// Extraction response shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelExtractionResponse {
    #[serde(default)]
    pub facts: Vec<ModelFact>,
    #[serde(default)]
    pub entities: Vec<ModelEntity>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelFact {
    pub statement: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub confidence: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelEntity {
    pub name: String,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub relevance: Option<f32>,
}

/// Quotes/quantitative-data response shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelQuotesResponse {
    #[serde(default)]
    pub quotes: Vec<ModelQuote>,
    #[serde(default)]
    pub data: Vec<ModelDatum>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelQuote {
    pub text: String,
    #[serde(default)]
    pub speaker: Option<String>,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub confidence: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelDatum {
    pub value: f64,
    #[serde(default)]
    pub unit: Option<String>,
    pub description: String,
    #[serde(default)]
    pub confidence: Option<f32>,
}

fn code_fence_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)```(?:json)?\s*(.*?)\s*```").expect("valid regex"))
}

/// Strip a surrounding markdown code fence, if present.
pub fn strip_code_fence(raw: &str) -> &str {
    match code_fence_regex().captures(raw) {
        Some(caps) => caps.get(1).map(|m| m.as_str()).unwrap_or(raw),
        None => raw.trim(),
    }
}

/// Parse a model response as JSON for the given phase.
///
/// A malformed response becomes an `ExternalModel` error tagged with the
/// phase, so the standard fallback path handles it.
pub fn parse_model_response<T: DeserializeOwned>(phase: Phase, raw: &str) -> Result<T> {
    let cleaned = strip_code_fence(raw);
    serde_json::from_str(cleaned)
        .map_err(|e| PipelineError::model(phase, format!("malformed model response: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn parses_bare_json() {
        let response: ModelTriageResponse = parse_model_response(
            Phase::Triage,
            r#"{"relevant": true, "reason": "política nacional"}"#,
        )
        .unwrap();
        assert!(response.relevant);
        assert_eq!(response.relevant_text, None);
    }

    #[test]
    fn parses_fenced_json() {
        let raw = "```json\n{\"facts\": [{\"statement\": \"subió el PIB\"}], \"entities\": []}\n```";
        let response: ModelExtractionResponse =
            parse_model_response(Phase::Extraction, raw).unwrap();
        assert_eq!(response.facts.len(), 1);
        assert_eq!(response.facts[0].statement, "subió el PIB");
        assert!(response.facts[0].confidence.is_none());
    }

    #[test]
    fn parses_fence_without_language_tag() {
        let raw = "```\n{\"quotes\": [], \"data\": []}\n```";
        let response: ModelQuotesResponse =
            parse_model_response(Phase::QuotesAndData, raw).unwrap();
        assert!(response.quotes.is_empty());
    }

    #[test]
    fn missing_collections_default_empty() {
        let response: ModelQuotesResponse = parse_model_response(Phase::QuotesAndData, "{}").unwrap();
        assert!(response.quotes.is_empty());
        assert!(response.data.is_empty());
    }

    #[test]
    fn malformed_response_is_external_model_error() {
        let err = parse_model_response::<ModelTriageResponse>(
            Phase::Triage,
            "I could not process this fragment.",
        )
        .unwrap_err();

        assert_eq!(err.kind, ErrorKind::ExternalModel);
        assert_eq!(err.phase, Phase::Triage);
        assert!(err.message.contains("malformed"));
    }
}
