//! CSV output backend.
//!
//! Creates two files in the configured output directory:
//! - `column_summaries.csv`
//! - `state_counts.csv`
//!
//! Floats are written with Rust's shortest round-trip formatting, so a run
//! with a fixed seed produces byte-identical files.

use std::fs::File;
use std::path::Path;

use csv::Writer;
use tracing::debug;

use crate::writer::OutputWriter;
use crate::{ColumnSummaryRow, OutputResult, StateCountRow};

pub const COLUMN_SUMMARIES_FILE: &str = "column_summaries.csv";
pub const STATE_COUNTS_FILE: &str = "state_counts.csv";

/// Writes simulation output to two CSV files.
pub struct CsvWriter {
    summaries: Writer<File>,
    states:    Writer<File>,
    finished:  bool,
}

impl CsvWriter {
    /// Create (or truncate) the two CSV files in `dir` and write the header
    /// rows.
    pub fn new(dir: &Path) -> OutputResult<Self> {
        std::fs::create_dir_all(dir)?;

        let mut summaries = Writer::from_path(dir.join(COLUMN_SUMMARIES_FILE))?;
        summaries.write_record([
            "tick", "property", "element_type", "kind", "min", "max", "mean", "count",
        ])?;

        let mut states = Writer::from_path(dir.join(STATE_COUNTS_FILE))?;
        states.write_record(["tick", "node", "state", "count"])?;

        debug!(dir = %dir.display(), "csv output opened");
        Ok(Self {
            summaries,
            states,
            finished: false,
        })
    }
}

fn opt(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

impl OutputWriter for CsvWriter {
    fn write_column_summaries(&mut self, rows: &[ColumnSummaryRow]) -> OutputResult<()> {
        for row in rows {
            self.summaries.write_record(&[
                row.tick.to_string(),
                row.property.clone(),
                row.element_type.to_owned(),
                row.kind.to_owned(),
                opt(row.min),
                opt(row.max),
                opt(row.mean),
                row.count.to_string(),
            ])?;
        }
        Ok(())
    }

    fn write_state_counts(&mut self, rows: &[StateCountRow]) -> OutputResult<()> {
        for row in rows {
            self.states.write_record(&[
                row.tick.to_string(),
                row.node.to_string(),
                row.state.to_string(),
                row.count.to_string(),
            ])?;
        }
        Ok(())
    }

    fn finish(&mut self) -> OutputResult<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        self.summaries.flush()?;
        self.states.flush()?;
        Ok(())
    }
}
