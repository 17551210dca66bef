//! `epi-spatial` — migration networks and grid scenarios.
//!
//! # Crate layout
//!
//! | Module        | Contents                                                   |
//! |---------------|------------------------------------------------------------|
//! | [`migration`] | `MigrationNetwork` builder, `FlowModel`, `SelfFlow`, `MigrationMatrix` |
//! | [`grid`]      | `grid()`, `Scenario`, `GridNode`, `InitialStates`          |
//! | [`error`]     | `SpatialError`, `SpatialResult<T>`                         |
//!
//! # Feature flags
//!
//! | Flag       | Effect                                                  |
//! |------------|---------------------------------------------------------|
//! | `parallel` | Computes migration-matrix rows on Rayon's thread pool.  |

pub mod error;
pub mod grid;
pub mod migration;


pub use error::{SpatialError, SpatialResult};
pub use grid::{BoundingBox, DEFAULT_STATES, GridNode, InitialStates, Scenario, grid, uniform_population};
pub use migration::{FlowModel, MigrationMatrix, MigrationNetwork, SelfFlow};
