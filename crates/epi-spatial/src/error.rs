//! Spatial-subsystem error type.

use thiserror::Error;

/// Errors produced by `epi-spatial`.
#[derive(Debug, Error)]
pub enum SpatialError {
    /// A migration row cannot be normalized: its raw flows sum to zero or
    /// to a non-finite value.
    #[error("migration row {row} cannot be normalized (row sum {sum})")]
    MigrationOverflow { row: usize, sum: f64 },

    #[error("invalid migration input: {0}")]
    InvalidInput(String),

    /// Invalid grid parameters or initial-state matrix.
    #[error("{0}")]
    Grid(String),
}

pub type SpatialResult<T> = Result<T, SpatialError>;
