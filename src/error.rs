//! Typed errors for the extraction pipeline.
//!
//! Uses `thiserror` for library errors (not `anyhow`) to provide
//! strongly-typed, composable error handling. Every error raised inside a
//! phase is a [`PipelineError`] tagged with the phase it came from, an
//! [`ErrorKind`], and a support code for cross-referencing logs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::outcome::Phase;

/// Orthogonal error classification: what failed, independent of where.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Inbound payload or intermediate data failed validation.
    Validation,

    /// Language model call failed (transport, status, malformed response).
    ExternalModel,

    /// Store RPC failed (similarity search, persistence).
    ExternalStore,

    /// Internal logic fault (malformed intermediate data).
    Processing,

    /// System-wide overload; short-circuits further retries.
    ServiceUnavailable,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::ExternalModel => "external_model",
            Self::ExternalStore => "external_store",
            Self::Processing => "processing",
            Self::ServiceUnavailable => "service_unavailable",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An error raised inside the pipeline.
///
/// Always caught at the phase boundary and converted into a degraded
/// [`PhaseResult`](crate::types::outcome::PhaseResult), except for terminal
/// errors (payload validation, unrecoverable persistence) which surface in
/// the [`PipelineOutcome`](crate::types::outcome::PipelineOutcome).
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[error("[{support_code}] {kind} error in {phase}: {message}")]
pub struct PipelineError {
    /// Phase the error was raised in.
    pub phase: Phase,

    /// Error classification.
    pub kind: ErrorKind,

    /// Human-readable message.
    pub message: String,

    /// Opaque code embedded in error responses for log correlation.
    pub support_code: String,

    /// When the error was raised.
    pub timestamp: DateTime<Utc>,

    /// Retries performed before giving up (model/store kinds only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_count: Option<u32>,

    /// Retry budget that was available (model/store kinds only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,

    /// Terminal errors are never retried and surface immediately.
    #[serde(default)]
    pub terminal: bool,
}

impl PipelineError {
    /// Create a new error tagged with a phase and kind.
    pub fn new(phase: Phase, kind: ErrorKind, message: impl Into<String>) -> Self {
        let timestamp = Utc::now();
        Self {
            phase,
            kind,
            message: message.into(),
            support_code: support_code(phase, timestamp),
            timestamp,
            retry_count: None,
            max_retries: None,
            terminal: matches!(kind, ErrorKind::Validation),
        }
    }

    /// Inbound or intermediate validation failure. Always terminal.
    pub fn validation(phase: Phase, message: impl Into<String>) -> Self {
        Self::new(phase, ErrorKind::Validation, message)
    }

    /// Language model failure.
    pub fn model(phase: Phase, message: impl Into<String>) -> Self {
        Self::new(phase, ErrorKind::ExternalModel, message)
    }

    /// Store RPC failure.
    pub fn store(phase: Phase, message: impl Into<String>) -> Self {
        Self::new(phase, ErrorKind::ExternalStore, message)
    }

    /// Internal logic fault.
    pub fn processing(phase: Phase, message: impl Into<String>) -> Self {
        Self::new(phase, ErrorKind::Processing, message)
    }

    /// System-wide overload.
    pub fn unavailable(phase: Phase, message: impl Into<String>) -> Self {
        Self::new(phase, ErrorKind::ServiceUnavailable, message)
    }

    /// Mark this error terminal: no outer retry policy may re-issue it.
    pub fn as_terminal(mut self) -> Self {
        self.terminal = true;
        self
    }

    /// Attach retry accounting after a retry budget is exhausted.
    pub fn with_retries(mut self, retry_count: u32, max_retries: u32) -> Self {
        self.retry_count = Some(retry_count);
        self.max_retries = Some(max_retries);
        self
    }

    /// Serialize every field (plus kind-specific details) for transport.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_else(|_| {
            serde_json::json!({
                "phase": self.phase.as_str(),
                "kind": self.kind.as_str(),
                "message": self.message,
                "support_code": self.support_code,
            })
        })
    }
}

/// Generate a support code of the form `ERR_<PHASE>_<TIMESTAMP>`.
fn support_code(phase: Phase, timestamp: DateTime<Utc>) -> String {
    format!(
        "ERR_{}_{}",
        phase.as_str().to_uppercase(),
        timestamp.format("%Y%m%d%H%M%S")
    )
}

/// Error raised by [`LanguageModel`](crate::traits::model::LanguageModel)
/// implementations.
///
/// Phases map these into [`PipelineError`]s with the `ExternalModel` kind
/// (or `ServiceUnavailable` for overload).
#[derive(Debug, Error)]
pub enum ModelError {
    /// Transport failure (connect, TLS, body read).
    #[error("model transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Non-success HTTP status.
    #[error("model returned status {status}")]
    Status { status: u16 },

    /// Provider is overloaded or rate-limiting.
    #[error("model service overloaded")]
    Overloaded,

    /// Response carried no usable completion.
    #[error("empty model response")]
    EmptyResponse,
}

/// Error raised by store trait implementations.
///
/// Only `Connection` is considered transient; constraint and backend
/// failures are not retried.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Connection-level failure; eligible for retry.
    #[error("store connection error: {0}")]
    Connection(String),

    /// Constraint violation; retrying would fail identically.
    #[error("store constraint violation: {0}")]
    Constraint(String),

    /// Backend fault that is not a connection problem.
    #[error("store backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Store is shedding load.
    #[error("store overloaded")]
    Overloaded,
}

impl StoreError {
    /// Map into a [`PipelineError`] at a phase boundary.
    pub fn into_pipeline_error(self, phase: Phase) -> PipelineError {
        match self {
            StoreError::Overloaded => PipelineError::unavailable(phase, self.to_string()),
            StoreError::Connection(_) => PipelineError::store(phase, self.to_string()),
            // Non-transient: surface without burning the retry budget.
            StoreError::Constraint(_) | StoreError::Backend(_) => {
                PipelineError::store(phase, self.to_string()).as_terminal()
            }
        }
    }
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;
