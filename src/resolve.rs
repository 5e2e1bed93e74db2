//! Value resolution layer
//!
//! Given a row and a column, produce the value to display: a direct field
//! read for base columns, a derived-store lookup for derived columns.

use crate::model::{ColumnDef, ColumnKind, FieldValue, Row};
use crate::store::{DerivedCell, DerivedValueStore};

/// The failure sentinel shown in cells whose batch call failed.
pub const ERROR_DISPLAY: &str = "Error";

/// Resolution outcome for one cell.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedValue {
    Present(FieldValue),
    /// Derived column still in flight for this row (or the row joined the
    /// dataset after the column's batch completed).
    Pending,
    /// The batch call that covered this row failed.
    Failed,
}

impl ResolvedValue {
    /// Display string: pending renders empty, failure renders the sentinel.
    pub fn display(&self) -> String {
        match self {
            ResolvedValue::Present(value) => value.display(),
            ResolvedValue::Pending => String::new(),
            ResolvedValue::Failed => ERROR_DISPLAY.to_string(),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            ResolvedValue::Present(value) => value.as_number(),
            _ => None,
        }
    }

    /// Whether the cell holds nothing orderable (missing/null/pending).
    pub fn is_missing(&self) -> bool {
        match self {
            ResolvedValue::Present(value) => value.is_null(),
            ResolvedValue::Pending => true,
            ResolvedValue::Failed => false,
        }
    }
}

/// Resolve the value of `column` for `row`.
///
/// `key_field` configures row identity for derived-store lookups.
pub fn resolve(
    row: &Row,
    column: &ColumnDef,
    store: &DerivedValueStore,
    key_field: &str,
) -> ResolvedValue {
    match column.kind {
        ColumnKind::Base => match row.get(&column.accessor) {
            Some(value) => ResolvedValue::Present(value.clone()),
            None => ResolvedValue::Present(FieldValue::Null),
        },
        ColumnKind::Derived => {
            let row_id = row.identity(key_field);
            match store.get(&column.id, &row_id) {
                Some(DerivedCell::Judged { value, .. }) => ResolvedValue::Present(value.clone()),
                Some(DerivedCell::Failed) => ResolvedValue::Failed,
                None => ResolvedValue::Pending,
            }
        }
    }
}
