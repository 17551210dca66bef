//! `epi-agent` — growable columnar agent storage for the `epi` toolkit.
//!
//! # Crate layout
//!
//! | Module          | Contents                                                  |
//! |-----------------|-----------------------------------------------------------|
//! | [`column`]      | `Element`, `ElementType`, `ColumnVec`, `TypedColumn<T>`   |
//! | [`store`]       | `AgentStore` (named SoA columns, growth, squash)          |
//! | [`builder`]     | `AgentStoreBuilder` (fluent construction)                 |
//! | [`forecast`]    | `CapacityForecaster`, `capacity_from_birthrates`          |
//! | [`population`]  | `StateDistribution`, `AgentStore::initialize_population`  |
//! | [`describe`]    | `ColumnSummary`, `SummaryStats`                           |
//! | [`snapshot`]    | `save_snapshot` / `load_snapshot` / `from_snapshot`       |
//! | [`error`]       | `AgentError`, `AgentResult<T>`                            |

pub mod builder;
pub mod column;
pub mod describe;
pub mod error;
pub mod forecast;
pub mod population;
pub mod snapshot;
pub mod store;

#[cfg(test)]
mod tests;

pub use builder::AgentStoreBuilder;
pub use column::{ColumnVec, Element, ElementType, TypedColumn};
pub use describe::{ColumnSummary, SummaryStats};
pub use error::{AgentError, AgentResult};
pub use forecast::{CapacityForecaster, capacity_from_birthrates};
pub use population::{PROPORTION_TOLERANCE, StateDistribution};
pub use store::{AgentStore, MAX_CAPACITY, PropertySchema};
