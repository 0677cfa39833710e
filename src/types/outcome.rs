//! Phase and pipeline outcome types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::PipelineError;
use crate::normalizer::NormalizationResult;
use crate::types::element::{ElementKind, ElementRelationship, ExtractedElement};

/// Pipeline phases, in execution order.
///
/// `Intake` tags payload validation errors raised before the first
/// executor phase runs; it has no executor of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Intake,
    Triage,
    Extraction,
    QuotesAndData,
    Normalization,
    Persistence,
}

impl Phase {
    /// The five executor phases in their fixed, total order.
    pub const ORDERED: [Phase; 5] = [
        Self::Triage,
        Self::Extraction,
        Self::QuotesAndData,
        Self::Normalization,
        Self::Persistence,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Intake => "intake",
            Self::Triage => "triage",
            Self::Extraction => "extraction",
            Self::QuotesAndData => "quotes_and_data",
            Self::Normalization => "normalization",
            Self::Persistence => "persistence",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-phase output.
///
/// A degraded (fallback) result is still a valid `PhaseResult`; an error
/// never escapes a phase executor except for terminal categories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseResult {
    pub phase: Phase,

    /// Elements this phase produced.
    pub elements: Vec<ExtractedElement>,

    /// Human-readable degradation notes.
    pub warnings: Vec<String>,

    /// True when the phase's fallback handler produced this result.
    pub degraded: bool,
}

impl PhaseResult {
    /// A fully successful phase result.
    pub fn ok(phase: Phase, elements: Vec<ExtractedElement>) -> Self {
        Self {
            phase,
            elements,
            warnings: Vec::new(),
            degraded: false,
        }
    }

    /// A degraded result produced by a fallback handler.
    pub fn degraded(
        phase: Phase,
        elements: Vec<ExtractedElement>,
        warning: impl Into<String>,
    ) -> Self {
        Self {
            phase,
            elements,
            warnings: vec![warning.into()],
            degraded: true,
        }
    }

    /// Attach an extra warning without degrading the result.
    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }

    /// Whether the phase ran without falling back.
    pub fn is_success(&self) -> bool {
        !self.degraded
    }

    /// Elements of one kind produced by this phase.
    pub fn elements_of(&self, kind: ElementKind) -> impl Iterator<Item = &ExtractedElement> {
        self.elements.iter().filter(move |e| e.kind() == kind)
    }
}

/// Overall status of one fragment's run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStatus {
    /// Every phase ran without falling back.
    Success,
    /// One or more phases degraded; results are usable but incomplete.
    PartialSuccess,
    /// Fatal validation error or unrecoverable persistence failure.
    Failed,
}

/// Aggregated result of one fragment's pipeline run.
///
/// Owned by the controller for the duration of one run, then handed to the
/// caller; the pipeline retains nothing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineOutcome {
    pub fragment_id: Uuid,
    pub article_id: String,
    pub status: PipelineStatus,

    /// Results of the executor phases that ran, in order.
    pub phases: Vec<PhaseResult>,

    /// Every degradation across all phases, plus intake warnings.
    pub warnings: Vec<String>,

    /// Canonical-entity decisions from the normalization phase.
    pub normalizations: Vec<NormalizationResult>,

    /// Relationships between extracted elements.
    pub relationships: Vec<ElementRelationship>,

    /// Set only when `status` is `Failed`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<PipelineError>,

    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl PipelineOutcome {
    pub fn is_success(&self) -> bool {
        self.status == PipelineStatus::Success
    }

    pub fn is_failed(&self) -> bool {
        self.status == PipelineStatus::Failed
    }

    /// All elements across phases, in phase order.
    pub fn elements(&self) -> impl Iterator<Item = &ExtractedElement> {
        self.phases.iter().flat_map(|p| p.elements.iter())
    }

    /// The result of one phase, if it ran.
    pub fn phase(&self, phase: Phase) -> Option<&PhaseResult> {
        self.phases.iter().find(|p| p.phase == phase)
    }
}
