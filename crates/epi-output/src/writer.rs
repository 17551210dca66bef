//! The `OutputWriter` trait implemented by all backend writers.

use crate::{ColumnSummaryRow, OutputResult, StateCountRow};

/// Sink for per-tick simulation output.
pub trait OutputWriter {
    /// Write the summary rows of one tick.
    fn write_column_summaries(&mut self, rows: &[ColumnSummaryRow]) -> OutputResult<()>;

    /// Write a batch of per-node state counts.
    fn write_state_counts(&mut self, rows: &[StateCountRow]) -> OutputResult<()>;

    /// Flush and close all underlying file handles.
    ///
    /// Idempotent: safe to call more than once.
    fn finish(&mut self) -> OutputResult<()>;
}
