//! Per-fragment identifier issuance and the global-reference codec.
//!
//! Every fragment owns exactly one [`ReferenceManager`] for its lifetime.
//! Local ids are sequential per element kind, starting at 1, with no gaps
//! or reuse. A [`GlobalReference`] qualifies a local id with the owning
//! fragment id so elements can be linked across phases and records.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::element::ElementKind;

/// A fragment-qualified element reference: (fragment id, kind, local id).
///
/// Encoding then decoding is lossless for every value any manager produces;
/// the encoding is fragment-id-qualified, not instance-qualified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GlobalReference {
    pub fragment_id: Uuid,
    pub kind: ElementKind,
    pub local_id: u32,
}

impl GlobalReference {
    pub fn new(fragment_id: Uuid, kind: ElementKind, local_id: u32) -> Self {
        Self {
            fragment_id,
            kind,
            local_id,
        }
    }

    /// Encode as `<fragment-uuid>/<kind-token>/<local-id>`.
    pub fn encode(&self) -> String {
        format!("{}/{}/{}", self.fragment_id, self.kind, self.local_id)
    }

    /// Decode an encoded reference back into the exact triple.
    pub fn decode(encoded: &str) -> Result<Self, String> {
        encoded.parse()
    }
}

impl std::fmt::Display for GlobalReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.encode())
    }
}

impl std::str::FromStr for GlobalReference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, '/');
        let fragment_id = parts
            .next()
            .ok_or_else(|| format!("malformed reference: {}", s))?
            .parse::<Uuid>()
            .map_err(|e| format!("bad fragment id in reference {}: {}", s, e))?;
        let kind = parts
            .next()
            .ok_or_else(|| format!("reference missing kind: {}", s))?
            .parse::<ElementKind>()?;
        let local_id = parts
            .next()
            .ok_or_else(|| format!("reference missing local id: {}", s))?
            .parse::<u32>()
            .map_err(|e| format!("bad local id in reference {}: {}", s, e))?;

        if local_id == 0 {
            return Err(format!("local ids start at 1, got 0 in {}", s));
        }

        Ok(Self {
            fragment_id,
            kind,
            local_id,
        })
    }
}

/// Exact per-kind issuance counts for one fragment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceStats {
    pub facts: u32,
    pub entities: u32,
    pub quotes: u32,
    pub quantitative_data: u32,
}

impl ReferenceStats {
    pub fn count(&self, kind: ElementKind) -> u32 {
        match kind {
            ElementKind::Fact => self.facts,
            ElementKind::Entity => self.entities,
            ElementKind::Quote => self.quotes,
            ElementKind::QuantitativeDatum => self.quantitative_data,
        }
    }

    pub fn total(&self) -> u32 {
        self.facts + self.entities + self.quotes + self.quantitative_data
    }
}

/// Deterministic, collision-free local-id issuance for one fragment.
///
/// Counters start fresh at 1 for every fragment regardless of global
/// issuance history; independent fragments never cross-contaminate.
#[derive(Debug)]
pub struct ReferenceManager {
    fragment_id: Uuid,
    counters: HashMap<ElementKind, u32>,
    descriptions: HashMap<ElementKind, Vec<String>>,
}

impl ReferenceManager {
    /// Create a manager for one fragment. All counters start at 0.
    pub fn new(fragment_id: Uuid) -> Self {
        Self {
            fragment_id,
            counters: HashMap::new(),
            descriptions: HashMap::new(),
        }
    }

    /// The owning fragment's id.
    pub fn fragment_id(&self) -> Uuid {
        self.fragment_id
    }

    /// Issue the next sequential id for `kind`, starting at 1.
    ///
    /// The description is informational only (empty or very long values are
    /// accepted) and never affects numbering; it is kept for stats review.
    pub fn next_id(&mut self, kind: ElementKind, description: Option<&str>) -> u32 {
        let counter = self.counters.entry(kind).or_insert(0);
        *counter += 1;

        self.descriptions
            .entry(kind)
            .or_default()
            .push(description.unwrap_or_default().to_string());

        *counter
    }

    /// Exact counts issued so far for each of the four element kinds.
    pub fn stats(&self) -> ReferenceStats {
        ReferenceStats {
            facts: self.count(ElementKind::Fact),
            entities: self.count(ElementKind::Entity),
            quotes: self.count(ElementKind::Quote),
            quantitative_data: self.count(ElementKind::QuantitativeDatum),
        }
    }

    /// Count issued for one kind.
    pub fn count(&self, kind: ElementKind) -> u32 {
        self.counters.get(&kind).copied().unwrap_or(0)
    }

    /// Descriptions recorded for one kind, in issuance order.
    pub fn descriptions(&self, kind: ElementKind) -> &[String] {
        self.descriptions
            .get(&kind)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Encode a reference for an element of this fragment.
    ///
    /// Deterministic function of (fragment id, kind, local id); no state
    /// beyond the owning fragment id.
    pub fn encode_reference(&self, kind: ElementKind, local_id: u32) -> GlobalReference {
        GlobalReference::new(self.fragment_id, kind, local_id)
    }

    /// Decode a reference produced by this or any other manager instance.
    pub fn decode_reference(encoded: &str) -> Result<GlobalReference, String> {
        GlobalReference::decode(encoded)
    }
}
