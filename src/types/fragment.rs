//! Fragments and the inbound payload they are built from.
//!
//! Construction is two-step: [`FragmentPayload::validate`] checks the strict
//! record against the config, then [`Fragment::from_payload`] fills the
//! id/hash/timestamp defaults. Validation never mutates the payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::{PipelineError, Result};
use crate::references::ReferenceManager;
use crate::types::config::PipelineConfig;
use crate::types::outcome::Phase;

/// A fragment/article record as delivered by the connector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FragmentPayload {
    /// Source article id.
    pub article_id: String,

    /// Original fragment text.
    pub text: String,

    #[serde(default)]
    pub title: Option<String>,

    /// Publishing medium (e.g. newspaper name).
    #[serde(default)]
    pub medium: Option<String>,

    /// Ordering of this fragment within its article.
    #[serde(default)]
    pub position: Option<u32>,

    /// Upstream flag marking content that needs a human pass.
    #[serde(default, rename = "requiere_revision_especial")]
    pub needs_special_review: bool,
}

impl FragmentPayload {
    pub fn new(article_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            article_id: article_id.into(),
            text: text.into(),
            title: None,
            medium: None,
            position: None,
            needs_special_review: false,
        }
    }

    /// Set the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the medium.
    pub fn with_medium(mut self, medium: impl Into<String>) -> Self {
        self.medium = Some(medium.into());
        self
    }

    /// Set the position within the article.
    pub fn with_position(mut self, position: u32) -> Self {
        self.position = Some(position);
        self
    }

    /// Flag the payload for special review.
    pub fn needing_special_review(mut self) -> Self {
        self.needs_special_review = true;
        self
    }

    /// Validate against the config.
    ///
    /// Short text together with the special-review flag is rejected as a
    /// terminal Validation error; short text alone is accepted and reported
    /// as a warning. Returns the warnings to attach to the run.
    pub fn validate(&self, config: &PipelineConfig) -> Result<Vec<String>> {
        if self.article_id.trim().is_empty() {
            return Err(PipelineError::validation(
                Phase::Intake,
                "fragment payload is missing an article id",
            ));
        }

        if self.text.trim().is_empty() {
            return Err(PipelineError::validation(
                Phase::Intake,
                "fragment payload has no text",
            ));
        }

        let mut warnings = Vec::new();
        let len = self.text.chars().count();

        if len < config.min_content_len {
            if self.needs_special_review {
                return Err(PipelineError::validation(
                    Phase::Intake,
                    format!(
                        "fragment text is below the {} character minimum and is \
                         flagged for special review ({} chars)",
                        config.min_content_len, len
                    ),
                ));
            }
            warnings.push(format!(
                "fragment text is below the {} character minimum ({} chars); \
                 extraction quality may suffer",
                config.min_content_len, len
            ));
        }

        Ok(warnings)
    }
}

/// A unit of article text being processed.
///
/// Owns exactly one [`ReferenceManager`] for its lifetime; discarded once
/// the pipeline outcome is handed back.
#[derive(Debug)]
pub struct Fragment {
    pub id: Uuid,
    pub article_id: String,
    pub text: String,
    pub title: Option<String>,
    pub medium: Option<String>,
    pub position: Option<u32>,

    /// SHA-256 of the original text, for duplicate detection downstream.
    pub content_hash: String,

    pub received_at: DateTime<Utc>,

    /// Local-id issuance for this fragment.
    pub refs: ReferenceManager,
}

impl Fragment {
    /// Build a fragment from an already-validated payload, filling the
    /// id, hash, and timestamp defaults.
    pub fn from_payload(payload: FragmentPayload) -> Self {
        let id = Uuid::new_v4();
        let content_hash = Self::hash_content(&payload.text);

        Self {
            id,
            article_id: payload.article_id,
            text: payload.text,
            title: payload.title,
            medium: payload.medium,
            position: payload.position,
            content_hash,
            received_at: Utc::now(),
            refs: ReferenceManager::new(id),
        }
    }

    /// Hash fragment text for duplicate detection.
    pub fn hash_content(text: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Best available display title: explicit title, or the leading text.
    pub fn display_title(&self) -> &str {
        match &self.title {
            Some(t) if !t.trim().is_empty() => t,
            _ => {
                let end = self
                    .text
                    .char_indices()
                    .nth(80)
                    .map(|(i, _)| i)
                    .unwrap_or(self.text.len());
                &self.text[..end]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn long_text() -> String {
        "El gobierno anunció un paquete de medidas económicas para el próximo trimestre."
            .to_string()
    }

    #[test]
    fn long_text_validates_clean() {
        let payload = FragmentPayload::new("articulo-1", long_text());
        let warnings = payload.validate(&PipelineConfig::default()).unwrap();
        assert!(warnings.is_empty());
    }

    #[test]
    fn short_text_alone_is_a_warning() {
        let payload = FragmentPayload::new("articulo-1", "Texto breve.");
        let warnings = payload.validate(&PipelineConfig::default()).unwrap();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("50"));
    }

    #[test]
    fn short_text_with_review_flag_is_rejected() {
        let payload = FragmentPayload::new("articulo-1", "Texto breve.").needing_special_review();
        let err = payload.validate(&PipelineConfig::default()).unwrap_err();
        assert!(err.terminal);
        assert!(err.message.contains("50"));
    }

    #[test]
    fn review_flag_alone_is_fine() {
        let payload = FragmentPayload::new("articulo-1", long_text()).needing_special_review();
        assert!(payload.validate(&PipelineConfig::default()).is_ok());
    }

    #[test]
    fn payload_wire_name_for_review_flag() {
        let payload: FragmentPayload = serde_json::from_str(
            r#"{"article_id": "a", "text": "t", "requiere_revision_especial": true}"#,
        )
        .unwrap();
        assert!(payload.needs_special_review);
    }

    #[test]
    fn fragment_fills_defaults() {
        let fragment = Fragment::from_payload(FragmentPayload::new("articulo-1", long_text()));
        assert!(!fragment.content_hash.is_empty());
        assert_eq!(fragment.refs.fragment_id(), fragment.id);
        assert_eq!(fragment.content_hash, Fragment::hash_content(&long_text()));
    }

    #[test]
    fn display_title_falls_back_to_text() {
        let fragment = Fragment::from_payload(
            FragmentPayload::new("articulo-1", long_text()).with_title("Medidas económicas"),
        );
        assert_eq!(fragment.display_title(), "Medidas económicas");

        let fragment = Fragment::from_payload(FragmentPayload::new("articulo-1", long_text()));
        assert!(long_text().starts_with(fragment.display_title()));
    }
}
