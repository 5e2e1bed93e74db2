//! Column registry
//!
//! Ordered set of column definitions: base columns supplied by the caller,
//! derived columns appended as they are requested. Registry mutations never
//! reorder existing columns; `set_base_columns` is the only operation that
//! changes the base set (e.g. switching search domains).

use tracing::debug;

use crate::model::{ColumnDef, ColumnId, ColumnKind, DerivedSpec};

#[derive(Debug, Clone, Default)]
pub struct ColumnRegistry {
    columns: Vec<ColumnDef>,
}

impl ColumnRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace all base columns, preserving registered derived columns
    /// appended after them in their original relative order.
    pub fn set_base_columns(&mut self, base: Vec<ColumnDef>) {
        let derived: Vec<ColumnDef> = self
            .columns
            .drain(..)
            .filter(|col| col.kind == ColumnKind::Derived)
            .collect();
        self.columns = base
            .into_iter()
            .map(|mut col| {
                col.kind = ColumnKind::Base;
                col.derived = None;
                col
            })
            .collect();
        self.columns.extend(derived);
    }

    /// Register a derived column and return its fresh id immediately, before
    /// any inference has run, so the caller can bind a pending indicator.
    pub fn add_derived_column(&mut self, label: impl Into<String>, spec: DerivedSpec) -> ColumnId {
        let col = ColumnDef::derived(label, spec);
        let id = col.id.clone();
        debug!(column = %id, label = %col.label, "registered derived column");
        self.columns.push(col);
        id
    }

    /// Remove a derived column. No-op (returns false) for base or unknown
    /// columns; the caller is responsible for purging its stored values.
    pub fn remove_derived_column(&mut self, id: &ColumnId) -> bool {
        let before = self.columns.len();
        self.columns
            .retain(|col| col.kind == ColumnKind::Base || &col.id != id);
        before != self.columns.len()
    }

    /// Drop every derived column (dataset reset). Returns the removed ids.
    pub fn clear_derived(&mut self) -> Vec<ColumnId> {
        let removed: Vec<ColumnId> = self
            .columns
            .iter()
            .filter(|col| col.kind == ColumnKind::Derived)
            .map(|col| col.id.clone())
            .collect();
        self.columns.retain(|col| col.kind == ColumnKind::Base);
        removed
    }

    pub fn set_visibility(&mut self, id: &ColumnId, visible: bool) -> bool {
        match self.columns.iter_mut().find(|col| &col.id == id) {
            Some(col) => {
                col.visible = visible;
                true
            }
            None => false,
        }
    }

    pub fn toggle_explanation(&mut self, id: &ColumnId) -> bool {
        match self.columns.iter_mut().find(|col| &col.id == id) {
            Some(col) => match col.derived.as_mut() {
                Some(spec) => {
                    spec.show_explanation = !spec.show_explanation;
                    true
                }
                None => false,
            },
            None => false,
        }
    }

    pub fn get(&self, id: &ColumnId) -> Option<&ColumnDef> {
        self.columns.iter().find(|col| &col.id == id)
    }

    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    pub fn derived_columns(&self) -> impl Iterator<Item = &ColumnDef> {
        self.columns.iter().filter(|col| col.is_derived())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}
