//! Plain data row types written by output backends.

use epi_agent::{ColumnSummary, SummaryStats};
use epi_core::Tick;

/// One line of `column_summaries.csv`.
///
/// Numeric columns produce one row with `min`/`max`/`mean`.  Categorical
/// columns produce one row per level, with the level in `min` and `max` and
/// the number of agents at that level in `count`.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSummaryRow {
    pub tick:         u64,
    pub property:     String,
    pub element_type: &'static str,
    pub kind:         &'static str,
    pub min:          Option<f64>,
    pub max:          Option<f64>,
    pub mean:         Option<f64>,
    pub count:        u64,
}

impl ColumnSummaryRow {
    pub fn from_summary(tick: Tick, summary: &ColumnSummary) -> Vec<Self> {
        let row = |min, max, mean, count| ColumnSummaryRow {
            tick: tick.0,
            property: summary.name.clone(),
            element_type: summary.element_type.as_str(),
            kind: summary.stats.kind(),
            min,
            max,
            mean,
            count,
        };
        match &summary.stats {
            SummaryStats::Empty => vec![row(None, None, None, 0)],
            SummaryStats::Numeric { min, max, mean } => {
                vec![row(Some(*min), Some(*max), Some(*mean), summary.count as u64)]
            }
            SummaryStats::Categorical { levels } => levels
                .iter()
                .map(|&(level, n)| row(Some(level as f64), Some(level as f64), None, n as u64))
                .collect(),
        }
    }
}

/// Agents of one node in one state at a given tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateCountRow {
    pub tick:  u64,
    pub node:  u32,
    pub state: u32,
    pub count: u64,
}
