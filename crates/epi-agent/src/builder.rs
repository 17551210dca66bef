//! Fluent builder for an [`AgentStore`].
//!
//! # Usage
//!
//! ```rust
//! use epi_agent::AgentStoreBuilder;
//!
//! let store = AgentStoreBuilder::new(10_000)
//!     .forecast_capacity(25_000)
//!     .property::<u8>("state", 0)
//!     .property::<u16>("nodeid", 0)
//!     .property::<f32>("susceptibility", 1.0)
//!     .agents(8_000)
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(store.count(), 8_000);
//! assert_eq!(store.capacity(), 10_000);
//! ```

use epi_core::PropertySet;

use crate::{AgentError, AgentResult, AgentStore, Element};

/// Fluent builder for [`AgentStore`].
///
/// Schema errors (e.g. a duplicate property name) are deferred and returned
/// by [`build`](Self::build).
pub struct AgentStoreBuilder {
    store:  AgentStore,
    agents: usize,
    error:  Option<AgentError>,
}

impl AgentStoreBuilder {
    /// Start a store with `capacity` reserved slots.
    pub fn new(capacity: usize) -> Self {
        Self {
            store:  AgentStore::new(capacity),
            agents: 0,
            error:  None,
        }
    }

    /// Read sizing from run configuration.
    ///
    /// | Key                 | Meaning                          | Default |
    /// |---------------------|----------------------------------|---------|
    /// | `initial_capacity`  | slots allocated up front         | —       |
    /// | `forecast_capacity` | floor for the first growth step  | 0       |
    pub fn from_config(params: &PropertySet) -> AgentResult<Self> {
        let capacity: usize = params.get_as("initial_capacity")?;
        let forecast: usize = params.get_or("forecast_capacity", 0)?;
        Ok(Self::new(capacity).forecast_capacity(forecast))
    }

    /// Growth floor, typically from `CapacityForecaster::project_capacity`.
    pub fn forecast_capacity(mut self, capacity: usize) -> Self {
        self.store.reserve_forecast(capacity);
        self
    }

    /// Declare a property column.
    pub fn property<T: Element>(mut self, name: &str, default: T) -> Self {
        if self.error.is_none() {
            if let Err(e) = self.store.add_property(name, default) {
                self.error = Some(e);
            }
        }
        self
    }

    /// Number of agents to activate at build time.
    pub fn agents(mut self, count: usize) -> Self {
        self.agents = count;
        self
    }

    pub fn build(mut self) -> AgentResult<AgentStore> {
        if let Some(e) = self.error {
            return Err(e);
        }
        if self.agents > 0 {
            self.store.add(self.agents)?;
        }
        Ok(self.store)
    }
}
