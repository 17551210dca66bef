//! `epi-sampling` — precomputed samplers for demographic events.
//!
//! Both samplers do all their work at construction time and are immutable
//! afterwards, so one instance can be shared read-only by every consumer.
//! Randomness always comes from a caller-supplied [`SimRng`](epi_core::SimRng).
//!
//! # Crate layout
//!
//! | Module       | Contents                                             |
//! |--------------|------------------------------------------------------|
//! | [`alias`]    | `AliasedDistribution` (Vose alias method, O(1) draw) |
//! | [`survival`] | `SurvivalCurve` (Kaplan–Meier age-of-death predictor)|
//! | [`error`]    | `SamplingError`, `SamplingResult<T>`                 |
//!
//! # Feature flags
//!
//! | Feature    | Effect                                                  |
//! |------------|---------------------------------------------------------|
//! | `parallel` | `par_sample_into` draws its chunks on Rayon's pool.     |

pub mod alias;
pub mod error;
pub mod survival;


pub use alias::{AliasedDistribution, PROBABILITY_TOLERANCE, SAMPLE_CHUNK};
pub use error::{SamplingError, SamplingResult};
pub use survival::SurvivalCurve;
