//! Sampling error type.

use thiserror::Error;

/// Errors produced by `epi-sampling`.
///
/// All of them are raised before any random number is consumed, so a failed
/// call leaves both the sampler and the caller's `SimRng` untouched and the
/// call may simply be retried with corrected arguments.
#[derive(Debug, Error)]
pub enum SamplingError {
    /// Malformed probability vector or survival curve.
    #[error("invalid distribution: {0}")]
    Distribution(String),

    /// Requested upper bound lies below the current value.
    #[error("upper bound {max} is below the current age {current}")]
    InvalidBound { current: u32, max: u32 },
}

pub type SamplingResult<T> = Result<T, SamplingError>;
