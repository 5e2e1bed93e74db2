//! Filtering
//!
//! Two conjunctive filters: a free-text substring match across every
//! registered column's display value, and a per-derived-boolean-column
//! tri-state. A row survives only if it passes the text filter AND every
//! active tri-state filter.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::model::{ColumnId, Row};
use crate::registry::ColumnRegistry;
use crate::resolve::{resolve, ResolvedValue};
use crate::store::DerivedValueStore;

/// Tri-state filter on a derived boolean column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriState {
    #[default]
    All,
    Yes,
    No,
}

/// Active filters for the current view.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterState {
    /// Case-insensitive substring matched against every column's display
    /// value, visible or not.
    pub text: String,
    pub tri_state: HashMap<ColumnId, TriState>,
}

impl FilterState {
    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && self.tri_state.values().all(|s| *s == TriState::All)
    }

    pub fn set_tri_state(&mut self, column: ColumnId, state: TriState) {
        if state == TriState::All {
            self.tri_state.remove(&column);
        } else {
            self.tri_state.insert(column, state);
        }
    }
}

/// Whether the resolved cell counts as an affirmative judgment.
fn is_truthy(value: &ResolvedValue) -> bool {
    match value {
        ResolvedValue::Present(v) => {
            let display = v.display();
            display.eq_ignore_ascii_case("yes") || display.eq_ignore_ascii_case("true")
        }
        _ => false,
    }
}

/// Free-text filter: matches if ANY column's resolved display value
/// contains the needle, case-insensitively. Pending cells count as empty.
pub fn passes_text_filter(
    row: &Row,
    registry: &ColumnRegistry,
    store: &DerivedValueStore,
    key_field: &str,
    needle: &str,
) -> bool {
    if needle.is_empty() {
        return true;
    }
    let needle = needle.to_lowercase();
    registry.columns().iter().any(|column| {
        resolve(row, column, store, key_field)
            .display()
            .to_lowercase()
            .contains(&needle)
    })
}

/// One tri-state filter on one column.
pub fn passes_tri_state(
    row: &Row,
    column: &ColumnId,
    registry: &ColumnRegistry,
    store: &DerivedValueStore,
    key_field: &str,
    state: TriState,
) -> bool {
    let Some(column) = registry.get(column) else {
        return true;
    };
    let truthy = is_truthy(&resolve(row, column, store, key_field));
    match state {
        TriState::All => true,
        TriState::Yes => truthy,
        TriState::No => !truthy,
    }
}

/// Conjunction of the text filter and every active tri-state filter.
pub fn passes_filters(
    row: &Row,
    registry: &ColumnRegistry,
    store: &DerivedValueStore,
    key_field: &str,
    filters: &FilterState,
) -> bool {
    passes_text_filter(row, registry, store, key_field, &filters.text)
        && filters
            .tri_state
            .iter()
            .all(|(column, state)| {
                passes_tri_state(row, column, registry, store, key_field, *state)
            })
}
