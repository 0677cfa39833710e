//! Extracted element types.
//!
//! This is the single source of truth for what the pipeline extracts. The
//! upstream corpus is Spanish-language news, so the wire tokens for element
//! kinds keep the upstream vocabulary (`hecho`, `entidad`, `cita`,
//! `dato_cuantitativo`) while the Rust identifiers are English.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::references::GlobalReference;

/// Element kind enum - replaces string constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementKind {
    #[serde(rename = "hecho")]
    Fact,
    #[serde(rename = "entidad")]
    Entity,
    #[serde(rename = "cita")]
    Quote,
    #[serde(rename = "dato_cuantitativo")]
    QuantitativeDatum,
}

impl ElementKind {
    /// All four kinds in declaration order.
    pub const ALL: [ElementKind; 4] = [
        Self::Fact,
        Self::Entity,
        Self::Quote,
        Self::QuantitativeDatum,
    ];

    /// Get the stable wire token (used in global references and storage).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fact => "hecho",
            Self::Entity => "entidad",
            Self::Quote => "cita",
            Self::QuantitativeDatum => "dato_cuantitativo",
        }
    }
}

impl std::fmt::Display for ElementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ElementKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hecho" => Ok(Self::Fact),
            "entidad" => Ok(Self::Entity),
            "cita" => Ok(Self::Quote),
            "dato_cuantitativo" => Ok(Self::QuantitativeDatum),
            _ => Err(format!("unknown element kind: {}", s)),
        }
    }
}

/// A verifiable statement extracted from a fragment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fact {
    pub local_id: u32,
    pub fragment_id: Uuid,
    pub statement: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub confidence: Option<f32>,
}

/// A named entity mentioned in a fragment (pre-normalization).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityMention {
    pub local_id: u32,
    pub fragment_id: Uuid,
    pub name: String,
    /// Free-form label from the model (persona, organizacion, lugar, ...).
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub relevance: Option<f32>,
}

/// A direct quote with optional attribution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    pub local_id: u32,
    pub fragment_id: Uuid,
    pub text: String,
    #[serde(default)]
    pub speaker: Option<String>,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub confidence: Option<f32>,
}

/// A quantitative datum (figure, percentage, amount).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuantitativeDatum {
    pub local_id: u32,
    pub fragment_id: Uuid,
    pub value: f64,
    #[serde(default)]
    pub unit: Option<String>,
    pub description: String,
    #[serde(default)]
    pub confidence: Option<f32>,
}

/// Tagged variant over everything a fragment can yield.
///
/// Keeps the phase pipeline polymorphic over "a collection of extracted
/// elements" while each variant carries its own field set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum ExtractedElement {
    #[serde(rename = "hecho")]
    Fact(Fact),
    #[serde(rename = "entidad")]
    Entity(EntityMention),
    #[serde(rename = "cita")]
    Quote(Quote),
    #[serde(rename = "dato_cuantitativo")]
    QuantitativeDatum(QuantitativeDatum),
}

impl ExtractedElement {
    pub fn kind(&self) -> ElementKind {
        match self {
            Self::Fact(_) => ElementKind::Fact,
            Self::Entity(_) => ElementKind::Entity,
            Self::Quote(_) => ElementKind::Quote,
            Self::QuantitativeDatum(_) => ElementKind::QuantitativeDatum,
        }
    }

    pub fn local_id(&self) -> u32 {
        match self {
            Self::Fact(f) => f.local_id,
            Self::Entity(e) => e.local_id,
            Self::Quote(q) => q.local_id,
            Self::QuantitativeDatum(d) => d.local_id,
        }
    }

    pub fn fragment_id(&self) -> Uuid {
        match self {
            Self::Fact(f) => f.fragment_id,
            Self::Entity(e) => e.fragment_id,
            Self::Quote(q) => q.fragment_id,
            Self::QuantitativeDatum(d) => d.fragment_id,
        }
    }

    pub fn confidence(&self) -> Option<f32> {
        match self {
            Self::Fact(f) => f.confidence,
            Self::Entity(e) => e.relevance,
            Self::Quote(q) => q.confidence,
            Self::QuantitativeDatum(d) => d.confidence,
        }
    }

    /// The fragment-qualified reference for this element.
    pub fn reference(&self) -> GlobalReference {
        GlobalReference::new(self.fragment_id(), self.kind(), self.local_id())
    }
}

/// A directed link between two extracted elements.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementRelationship {
    pub from: GlobalReference,
    pub to: GlobalReference,
    /// Relation label (e.g. `attributed_to`, `mentions`).
    pub relation: String,
}
