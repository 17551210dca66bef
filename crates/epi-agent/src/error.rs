//! Agent-store error type.

use thiserror::Error;

use epi_core::EpiError;

use crate::ElementType;

/// Errors produced by `epi-agent`.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("property {0:?} already exists")]
    DuplicateProperty(String),

    #[error("property {0:?} not found")]
    UnknownProperty(String),

    #[error("property {name:?} holds {found}, not {expected}")]
    TypeMismatch {
        name:     String,
        expected: ElementType,
        found:    ElementType,
    },

    /// Growth could not satisfy a request.  Fatal for the run: the store is
    /// left exactly as it was before the failing call.
    #[error("cannot grow agent store to {requested} slots: {reason}")]
    Capacity { requested: usize, reason: String },

    #[error("range {start}..{end} is outside the {count} active agents")]
    OutOfRange { start: usize, end: usize, count: usize },

    #[error("snapshot schema mismatch: {0}")]
    SnapshotSchema(String),

    #[error("malformed snapshot: {0}")]
    SnapshotFormat(String),

    #[error("invalid state distribution: {0}")]
    Distribution(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("configuration error: {0}")]
    Config(#[from] EpiError),

    #[error("snapshot header error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AgentResult<T> = Result<T, AgentError>;
