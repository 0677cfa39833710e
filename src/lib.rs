//! News Fragment Extraction Pipeline
//!
//! A staged LLM pipeline that turns raw news fragments into structured,
//! referenceable elements: facts, entities, quotes, and quantitative data.
//! Entities are resolved against a canonical index, elements are linked,
//! and everything is persisted with a dead-letter net.
//!
//! # Design Philosophy
//!
//! **"Never fail completely"**
//!
//! - Five fixed phases; each degrades independently instead of aborting
//! - Per-fragment reference managers, so local ids stay deterministic
//! - Explicit fallbacks: a model outage still yields a usable record
//! - Library handles mechanics, the connector handles queueing
//!
//! # Usage
//!
//! ```rust,ignore
//! use prensa::{FragmentPayload, MemoryStore, Pipeline};
//! use prensa::testing::MockModel;
//!
//! let store = MemoryStore::new().with_entity("Banco Central", Some("organizacion"));
//! let pipeline = Pipeline::new(store, MockModel::scripted_defaults());
//!
//! let payload = FragmentPayload::new("articulo-1", "El Banco Central anunció...")
//!     .with_title("Suba de tasas");
//! let outcome = pipeline.run(payload).await;
//! ```
//!
//! # Modules
//!
//! - [`traits`] - Core trait abstractions (LanguageModel, EntityIndex, ResultStore)
//! - [`types`] - Fragments, extracted elements, outcomes, config
//! - [`pipeline`] - The five-phase pipeline and its controller
//! - [`references`] - Local-id issuance and global reference encoding
//! - [`normalizer`] - Canonical entity resolution
//! - [`stores`] - Storage implementations (MemoryStore, etc.)
//! - [`model`] - Language model implementations (OpenAI-compatible)
//! - [`testing`] - Mock implementations for testing

pub mod error;
pub mod model;
pub mod normalizer;
pub mod pipeline;
pub mod prompts;
pub mod references;
pub mod retry;
pub mod stores;
pub mod testing;
pub mod traits;
pub mod types;

// Re-export core types at crate root
pub use error::{ErrorKind, ModelError, PipelineError, StoreError};
pub use model::OpenAiModel;
pub use normalizer::{EntityNormalizer, NormalizationResult};
pub use pipeline::Pipeline;
pub use references::{GlobalReference, ReferenceManager, ReferenceStats};
pub use retry::RetryPolicy;
pub use stores::MemoryStore;
pub use traits::{
    model::LanguageModel,
    store::{DeadLetter, EntityCandidate, EntityIndex, FragmentRecord, FragmentStore, ResultStore},
};
pub use types::{
    config::PipelineConfig,
    element::{
        ElementKind, ElementRelationship, EntityMention, ExtractedElement, Fact,
        QuantitativeDatum, Quote,
    },
    fragment::{Fragment, FragmentPayload},
    outcome::{Phase, PhaseResult, PipelineOutcome, PipelineStatus},
};
