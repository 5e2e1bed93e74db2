//! Sorting
//!
//! One active sort at a time. Missing and null values sort last regardless
//! of direction; numeric columns compare numerically with non-numeric
//! values coerced to 0; everything else compares case-insensitively as
//! strings. The underlying sort is stable, so sorting an already-sorted
//! sequence is a no-op.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::model::{ColumnDef, ColumnId, Row};
use crate::resolve::resolve;
use crate::store::DerivedValueStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

/// The active sort, if any.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortSpec {
    pub column: ColumnId,
    pub direction: SortDirection,
}

impl SortSpec {
    /// Cycle the sort for a clicked column: same column steps
    /// asc -> desc -> none; a different column resets to asc.
    pub fn cycle(current: Option<SortSpec>, clicked: &ColumnId) -> Option<SortSpec> {
        match current {
            Some(spec) if &spec.column == clicked => match spec.direction {
                SortDirection::Asc => Some(SortSpec {
                    column: spec.column,
                    direction: SortDirection::Desc,
                }),
                SortDirection::Desc => None,
            },
            _ => Some(SortSpec {
                column: clicked.clone(),
                direction: SortDirection::Asc,
            }),
        }
    }
}

/// Compare two rows under a column's ordering.
pub fn compare_rows(
    a: &Row,
    b: &Row,
    column: &ColumnDef,
    store: &DerivedValueStore,
    key_field: &str,
    direction: SortDirection,
) -> Ordering {
    let va = resolve(a, column, store, key_field);
    let vb = resolve(b, column, store, key_field);

    // Missing values pin to the end in both directions
    match (va.is_missing(), vb.is_missing()) {
        (true, true) => return Ordering::Equal,
        (true, false) => return Ordering::Greater,
        (false, true) => return Ordering::Less,
        (false, false) => {}
    }

    let ordered = if column.is_numeric() {
        let na = va.as_number().unwrap_or(0.0);
        let nb = vb.as_number().unwrap_or(0.0);
        na.partial_cmp(&nb).unwrap_or(Ordering::Equal)
    } else {
        va.display().to_lowercase().cmp(&vb.display().to_lowercase())
    };

    match direction {
        SortDirection::Asc => ordered,
        SortDirection::Desc => ordered.reverse(),
    }
}
