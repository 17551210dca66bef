//! `epi-core` — foundational types for the `epi` spatial epidemic toolkit.
//!
//! This crate is a dependency of every other `epi-*` crate.  It has no
//! `epi-*` dependencies.
//!
//! # What lives here
//!
//! | Module          | Contents                                              |
//! |-----------------|-------------------------------------------------------|
//! | [`ids`]         | `AgentId`, `NodeId`                                   |
//! | [`geo`]         | `GeoPoint`, `DistanceMetric`                          |
//! | [`time`]        | `Tick`                                                |
//! | [`rng`]         | `SimRng` (explicit, seeded, splittable)               |
//! | [`config`]      | `PropertySet`, `MergePolicy`                          |
//! | [`error`]       | `EpiError`, `EpiResult`                               |

pub mod config;
pub mod error;
pub mod geo;
pub mod ids;
pub mod rng;
pub mod time;

#[cfg(test)]
mod tests;

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use config::{MergePolicy, PropertySet};
pub use error::{EpiError, EpiResult};
pub use geo::{DistanceMetric, GeoPoint};
pub use ids::{AgentId, NodeId};
pub use rng::SimRng;
pub use time::{DAYS_PER_YEAR, Tick};
