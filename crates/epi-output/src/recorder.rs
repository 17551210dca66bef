//! `StoreRecorder<W>` — turns agent-store state into output rows.

use std::collections::BTreeMap;

use epi_agent::{AgentStore, Element};
use epi_core::Tick;

use crate::row::{ColumnSummaryRow, StateCountRow};
use crate::writer::OutputWriter;
use crate::{OutputError, OutputResult};

/// Records per-tick column summaries and per-node state counts to any
/// [`OutputWriter`].
///
/// `node_property` and `state_property` name the columns holding each
/// agent's node and compartment.
pub struct StoreRecorder<W: OutputWriter> {
    writer:         W,
    node_property:  String,
    state_property: String,
}

impl<W: OutputWriter> StoreRecorder<W> {
    pub fn new(writer: W, node_property: &str, state_property: &str) -> Self {
        Self {
            writer,
            node_property:  node_property.to_owned(),
            state_property: state_property.to_owned(),
        }
    }

    /// Write `describe()` of every column and the node × state tally.
    ///
    /// `N` and `S` are the element types of the node and state columns.
    pub fn record<N: Element, S: Element>(&mut self, tick: Tick, store: &AgentStore) -> OutputResult<()> {
        self.record_summaries(tick, store)?;
        let nodes = store.column::<N>(&self.node_property)?;
        let states = store.column::<S>(&self.state_property)?;
        let rows = tally_states(tick, nodes, states)?;
        self.writer.write_state_counts(&rows)
    }

    pub fn record_summaries(&mut self, tick: Tick, store: &AgentStore) -> OutputResult<()> {
        let rows: Vec<ColumnSummaryRow> = store
            .describe()
            .iter()
            .flat_map(|s| ColumnSummaryRow::from_summary(tick, s))
            .collect();
        self.writer.write_column_summaries(&rows)
    }

    pub fn finish(&mut self) -> OutputResult<()> {
        self.writer.finish()
    }
}

/// Count agents per `(node, state)` pair, ascending by node then state.
/// Pairs with no agents are omitted.
pub fn tally_states<N: Element, S: Element>(
    tick:   Tick,
    nodes:  &[N],
    states: &[S],
) -> OutputResult<Vec<StateCountRow>> {
    let mut counts: BTreeMap<(u32, u32), u64> = BTreeMap::new();
    for (&node, &state) in nodes.iter().zip(states) {
        let key = (as_label(node)?, as_label(state)?);
        *counts.entry(key).or_default() += 1;
    }
    Ok(counts
        .into_iter()
        .map(|((node, state), count)| StateCountRow { tick: tick.0, node, state, count })
        .collect())
}

/// Node ids and state codes must be non-negative integers.
fn as_label<T: Element>(value: T) -> OutputResult<u32> {
    let v = value.to_f64();
    if v >= 0.0 && v <= u32::MAX as f64 && v.fract() == 0.0 {
        Ok(v as u32)
    } else {
        Err(OutputError::InvalidLabel(format!("{value:?}")))
    }
}
