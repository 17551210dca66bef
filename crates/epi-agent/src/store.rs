//! Core agent storage: a growable structure-of-arrays keyed by property name.
//!
//! # Layout
//!
//! ```text
//! count    = 5        capacity = 8
//!              active          reserve
//!          ┌──┬──┬──┬──┬──┐┌──┬──┬──┐
//! "state"  │S │E │I │S │R ││ S│ S│ S│   u8, default S
//! "nodeid" │0 │0 │1 │2 │2 ││ 0│ 0│ 0│   u16, default 0
//!          └──┴──┴──┴──┴──┘└──┴──┴──┘
//! ```
//!
//! Every column is exactly `capacity` long.  Agent indices are stable for the
//! life of the store (until an explicit `truncate`/`squash`), so a range
//! returned by [`AgentStore::add`] stays valid across later growth even
//! though the backing storage moves.
//!
//! # Growth
//!
//! When `add(n)` needs more than `capacity` slots the new capacity is
//!
//!   max(2 × capacity, forecast_capacity, count + n)
//!
//! Every column is copied into fresh storage first; only when all copies
//! succeed are the old buffers dropped.  A failed growth leaves the store
//! untouched.  Growth takes `&mut self`, so no slice into a column can be
//! alive while it runs.

use std::ops::Range;

use rustc_hash::FxHashMap;
use tracing::debug;

use epi_core::AgentId;

use crate::column::{ColumnVec, Element, ElementType, TypedColumn};
use crate::{AgentError, AgentResult};

/// Largest capacity the store will grow to; agent indices must fit `AgentId`.
pub const MAX_CAPACITY: usize = u32::MAX as usize;

/// One named column.
pub(crate) struct Property {
    pub(crate) name:   String,
    pub(crate) column: Box<dyn ColumnVec>,
}

/// Declared name and element type of one property.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PropertySchema {
    pub name:         String,
    pub element_type: ElementType,
}

/// Growable columnar store with one row per agent.
pub struct AgentStore {
    pub(crate) count:             usize,
    pub(crate) capacity:          usize,
    /// Floor for the next growth step, usually a `CapacityForecaster`
    /// projection for the run's horizon.
    pub(crate) forecast_capacity: usize,
    pub(crate) properties:        Vec<Property>,
    pub(crate) index:             FxHashMap<String, usize>,
}

impl AgentStore {
    /// Empty store with `initial_capacity` reserved slots and no properties.
    pub fn new(initial_capacity: usize) -> Self {
        Self {
            count:             0,
            capacity:          initial_capacity.min(MAX_CAPACITY),
            forecast_capacity: 0,
            properties:        Vec::new(),
            index:             FxHashMap::default(),
        }
    }

    // ── Dimensions ────────────────────────────────────────────────────────

    /// Number of active agents.
    #[inline]
    pub fn count(&self) -> usize {
        self.count
    }

    /// Allocated slots per column.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Current growth floor set by [`reserve_forecast`](Self::reserve_forecast).
    #[inline]
    pub fn forecast_capacity(&self) -> usize {
        self.forecast_capacity
    }

    /// Iterator over all active `AgentId`s in ascending index order.
    pub fn agent_ids(&self) -> impl Iterator<Item = AgentId> + '_ {
        (0..self.count as u32).map(AgentId)
    }

    // ── Schema ────────────────────────────────────────────────────────────

    /// Declare a new property column filled with `default`.
    pub fn add_property<T: Element>(&mut self, name: &str, default: T) -> AgentResult<()> {
        if self.index.contains_key(name) {
            return Err(AgentError::DuplicateProperty(name.to_owned()));
        }
        let column = TypedColumn::filled(self.capacity, default).map_err(|e| {
            AgentError::Capacity { requested: self.capacity, reason: e.to_string() }
        })?;
        self.index.insert(name.to_owned(), self.properties.len());
        self.properties.push(Property { name: name.to_owned(), column: Box::new(column) });
        Ok(())
    }

    pub fn has_property(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn element_type(&self, name: &str) -> AgentResult<ElementType> {
        Ok(self.property(name)?.column.element_type())
    }

    /// Declared properties in declaration order.
    pub fn schema(&self) -> Vec<PropertySchema> {
        self.properties
            .iter()
            .map(|p| PropertySchema { name: p.name.clone(), element_type: p.column.element_type() })
            .collect()
    }

    pub(crate) fn properties(&self) -> impl Iterator<Item = (&str, &dyn ColumnVec)> + '_ {
        self.properties.iter().map(|p| (p.name.as_str(), p.column.as_ref()))
    }

    // ── Column access ─────────────────────────────────────────────────────

    /// Active slice `[0, count)` of property `name`.
    pub fn column<T: Element>(&self, name: &str) -> AgentResult<&[T]> {
        let count = self.count;
        let column = typed::<T>(self.property(name)?)?;
        Ok(&column.data[..count])
    }

    /// Mutable active slice `[0, count)` of property `name`.
    pub fn column_mut<T: Element>(&mut self, name: &str) -> AgentResult<&mut [T]> {
        let count = self.count;
        let idx = self.position(name)?;
        let column = typed_mut::<T>(&mut self.properties[idx])?;
        Ok(&mut column.data[..count])
    }

    /// Write to one column while reading another, e.g. updating `state`
    /// from `nodeid`.  `write` and `read` must differ.
    pub fn column_pair_mut<W: Element, R: Element>(
        &mut self,
        write: &str,
        read:  &str,
    ) -> AgentResult<(&mut [W], &[R])> {
        let wi = self.position(write)?;
        let ri = self.position(read)?;
        if wi == ri {
            return Err(AgentError::InvalidInput(format!(
                "cannot borrow property {write:?} mutably and immutably at once"
            )));
        }
        let count = self.count;
        let (w, r) = if wi < ri {
            let (lo, hi) = self.properties.split_at_mut(ri);
            (&mut lo[wi], &hi[0])
        } else {
            let (lo, hi) = self.properties.split_at_mut(wi);
            (&mut hi[0], &lo[ri])
        };
        let w = typed_mut::<W>(w)?;
        let r = typed::<R>(r)?;
        Ok((&mut w.data[..count], &r.data[..count]))
    }

    // ── Population changes ────────────────────────────────────────────────

    /// Activate `n` more agents and return their index range.
    ///
    /// New agents carry each property's default value.  Grows the store if
    /// `count + n > capacity`.
    pub fn add(&mut self, n: usize) -> AgentResult<Range<usize>> {
        let required = self.count.checked_add(n).ok_or_else(|| AgentError::Capacity {
            requested: usize::MAX,
            reason:    "agent count overflows usize".to_owned(),
        })?;
        if required > self.capacity {
            self.grow(required)?;
        }
        let start = self.count;
        self.count = required;
        Ok(start..required)
    }

    /// Set the growth floor, typically from a capacity forecast.
    pub fn reserve_forecast(&mut self, forecast_capacity: usize) {
        self.forecast_capacity = forecast_capacity.min(MAX_CAPACITY);
    }

    /// Drop agents `[n, count)`.  Capacity is unchanged; the freed slots are
    /// reset to their defaults.  No-op if `n >= count`.
    pub fn truncate(&mut self, n: usize) {
        if n >= self.count {
            return;
        }
        for p in &mut self.properties {
            p.column.reset_tail(n);
        }
        self.count = n;
    }

    /// Keep only agents whose `keep` flag is set, packing them to the front
    /// in their original order.  Returns the new count.
    ///
    /// Indices of surviving agents change; callers holding agent indices
    /// (e.g. in an event queue) must rebuild them.
    pub fn squash(&mut self, keep: &[bool]) -> AgentResult<usize> {
        if keep.len() != self.count {
            return Err(AgentError::InvalidInput(format!(
                "squash mask has {} entries for {} agents",
                keep.len(),
                self.count
            )));
        }
        for p in &mut self.properties {
            p.column.compact(keep);
        }
        self.count = keep.iter().filter(|&&k| k).count();
        Ok(self.count)
    }

    /// Check that `range` lies within the active agents.
    pub(crate) fn check_range(&self, range: &Range<usize>) -> AgentResult<()> {
        if range.start > range.end || range.end > self.count {
            return Err(AgentError::OutOfRange {
                start: range.start,
                end:   range.end,
                count: self.count,
            });
        }
        Ok(())
    }

    // ── Internals ─────────────────────────────────────────────────────────

    fn grow(&mut self, required: usize) -> AgentResult<()> {
        if required > MAX_CAPACITY {
            return Err(AgentError::Capacity {
                requested: required,
                reason:    format!("exceeds the maximum of {MAX_CAPACITY} agents"),
            });
        }
        let new_capacity = self
            .capacity
            .saturating_mul(2)
            .max(self.forecast_capacity)
            .max(required)
            .min(MAX_CAPACITY);

        // Allocate every column before releasing any old buffer.
        let mut grown = Vec::with_capacity(self.properties.len());
        for p in &self.properties {
            let column = p.column.try_grown(new_capacity).map_err(|e| AgentError::Capacity {
                requested: new_capacity,
                reason:    format!("property {:?}: {e}", p.name),
            })?;
            grown.push(column);
        }
        for (p, column) in self.properties.iter_mut().zip(grown) {
            p.column = column;
        }

        debug!(old = self.capacity, new = new_capacity, count = self.count, "agent store grown");
        self.capacity = new_capacity;
        Ok(())
    }

    fn position(&self, name: &str) -> AgentResult<usize> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| AgentError::UnknownProperty(name.to_owned()))
    }

    fn property(&self, name: &str) -> AgentResult<&Property> {
        Ok(&self.properties[self.position(name)?])
    }
}

fn typed<T: Element>(p: &Property) -> AgentResult<&TypedColumn<T>> {
    p.column
        .as_any()
        .downcast_ref::<TypedColumn<T>>()
        .ok_or_else(|| AgentError::TypeMismatch {
            name:     p.name.clone(),
            expected: T::TYPE,
            found:    p.column.element_type(),
        })
}

fn typed_mut<T: Element>(p: &mut Property) -> AgentResult<&mut TypedColumn<T>> {
    let found = p.column.element_type();
    let name = &p.name;
    p.column
        .as_any_mut()
        .downcast_mut::<TypedColumn<T>>()
        .ok_or_else(|| AgentError::TypeMismatch {
            name:     name.clone(),
            expected: T::TYPE,
            found,
        })
}
