//! Derived value storage
//!
//! Inferred cell values keyed by `(column id, row id)`, plus the per-column
//! phase of the enrichment run that produced them. Keys are namespaced by
//! column id, so concurrent batches for different columns cannot clobber
//! each other.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::model::{ColumnId, FieldValue};

/// Lifecycle of a derived column's enrichment run.
///
/// The phase is set to `Processing` synchronously when the column is
/// registered, before the pipeline's first suspension point, so an observer
/// can never see a derived column with neither a pending indicator nor data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnPhase {
    Processing,
    Ready,
    Failed,
}

/// One inferred cell.
///
/// Presence of a cell means inference completed for that `(column, row)`
/// pair; absence while the column is `Processing` means pending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DerivedCell {
    Judged {
        /// Display value: `"Yes"`/`"No"` text for boolean columns, a number
        /// for numeric columns, extracted text otherwise.
        value: FieldValue,
        /// Backend confidence in [0, 1].
        confidence: f64,
        explanation: String,
        text_value: Option<String>,
    },
    /// The whole batch failed for this column; failure is batch-granular.
    Failed,
}

/// In-memory store of derived cells and column phases.
#[derive(Debug, Clone, Default)]
pub struct DerivedValueStore {
    cells: HashMap<(ColumnId, String), DerivedCell>,
    phases: HashMap<ColumnId, ColumnPhase>,
}

impl DerivedValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, column: ColumnId, row_id: impl Into<String>, cell: DerivedCell) {
        self.cells.insert((column, row_id.into()), cell);
    }

    pub fn get(&self, column: &ColumnId, row_id: &str) -> Option<&DerivedCell> {
        self.cells.get(&(column.clone(), row_id.to_string()))
    }

    /// Mark every row of a submitted batch as failed for the column.
    pub fn fail_batch<'a>(&mut self, column: &ColumnId, row_ids: impl IntoIterator<Item = &'a str>) {
        for row_id in row_ids {
            self.cells
                .insert((column.clone(), row_id.to_string()), DerivedCell::Failed);
        }
    }

    /// Remove every cell belonging to a column, along with its phase.
    pub fn purge_column(&mut self, column: &ColumnId) {
        self.cells.retain(|(col, _), _| col != column);
        self.phases.remove(column);
    }

    pub fn set_phase(&mut self, column: ColumnId, phase: ColumnPhase) {
        self.phases.insert(column, phase);
    }

    pub fn phase(&self, column: &ColumnId) -> Option<ColumnPhase> {
        self.phases.get(column).copied()
    }

    /// Drop all derived state (dataset reset).
    pub fn clear(&mut self) {
        self.cells.clear();
        self.phases.clear();
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }
}
