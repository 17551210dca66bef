//! `epi-output` — simulation result writers for the epi toolkit.
//!
//! | Backend | Files created                                  |
//! |---------|------------------------------------------------|
//! | CSV     | `column_summaries.csv`, `state_counts.csv`     |
//!
//! Backends implement [`OutputWriter`] and are usually driven by a
//! [`StoreRecorder`], which reads an `AgentStore` once per recorded tick.
//!
//! # Usage
//!
//! ```rust,ignore
//! use epi_output::{CsvWriter, StoreRecorder};
//!
//! let writer = CsvWriter::new(Path::new("./output"))?;
//! let mut recorder = StoreRecorder::new(writer, "nodeid", "state");
//! for tick in 0..ticks {
//!     // ... advance the simulation ...
//!     recorder.record::<u16, u8>(Tick(tick), &store)?;
//! }
//! recorder.finish()?;
//! ```

pub mod csv;
pub mod error;
pub mod recorder;
pub mod row;
pub mod writer;


pub use csv::CsvWriter;
pub use error::{OutputError, OutputResult};
pub use recorder::{StoreRecorder, tally_states};
pub use row::{ColumnSummaryRow, StateCountRow};
pub use writer::OutputWriter;
