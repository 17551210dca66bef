//! Core error type.
//!
//! Sub-crates define their own error enums; configuration problems raised
//! while consuming a [`PropertySet`](crate::PropertySet) surface as
//! `EpiError` and are wrapped by the sub-crate enums where needed.

use thiserror::Error;

/// The error type for `epi-core`.
#[derive(Debug, Error)]
pub enum EpiError {
    /// Add-only insert or merge hit a key that is already present.
    #[error("configuration key {0:?} already exists")]
    DuplicateKey(String),

    /// Update-only write or merge named a key that is not present.
    #[error("configuration key {0:?} does not exist")]
    MissingKey(String),

    #[error("configuration key {key:?} has an unexpected value: {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Shorthand result type for `epi-core`.
pub type EpiResult<T> = Result<T, EpiError>;
