//! Read-only per-column summaries.

use crate::{AgentStore, ElementType};

/// Statistics over the active range `[0, count)` of one column.
#[derive(Clone, Debug, PartialEq)]
pub enum SummaryStats {
    /// No active agents.
    Empty,
    Numeric { min: f64, max: f64, mean: f64 },
    /// `(level, agents)` pairs for categorical columns, ascending by level.
    Categorical { levels: Vec<(i64, usize)> },
}

impl SummaryStats {
    /// Short label used by output writers.
    pub fn kind(&self) -> &'static str {
        match self {
            SummaryStats::Empty => "empty",
            SummaryStats::Numeric { .. } => "numeric",
            SummaryStats::Categorical { .. } => "categorical",
        }
    }
}

/// One row of [`AgentStore::describe`].
#[derive(Clone, Debug, PartialEq)]
pub struct ColumnSummary {
    pub name:         String,
    pub element_type: ElementType,
    /// Active agents the statistics cover.
    pub count:        usize,
    pub stats:        SummaryStats,
}

impl AgentStore {
    /// Summaries for every property, in declaration order.
    pub fn describe(&self) -> Vec<ColumnSummary> {
        self.properties()
            .map(|(name, column)| ColumnSummary {
                name:         name.to_owned(),
                element_type: column.element_type(),
                count:        self.count(),
                stats:        column.summarize(self.count()),
            })
            .collect()
    }
}
