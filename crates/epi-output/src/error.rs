//! Error types for epi-output.

use thiserror::Error;

use epi_agent::AgentError;

/// Errors that can occur when writing simulation output.
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),

    /// A node or state value that is not a non-negative integer.
    #[error("{0} is not a valid node or state label")]
    InvalidLabel(String),

    /// A recorded property is missing or has an unexpected type.
    #[error("agent store error: {0}")]
    Agent(#[from] AgentError),
}

/// Alias for `Result<T, OutputError>`.
pub type OutputResult<T> = Result<T, OutputError>;
