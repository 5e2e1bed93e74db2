//! Table engine
//!
//! Owns the active dataset and all per-dataset state: column registry,
//! derived-value store, sort spec, and filters. Detects whether an incoming
//! row set is a brand-new dataset (fresh search) or an expansion of the
//! current one, and clears or preserves derived state accordingly. All
//! mutation goes through the operations here; the view is recomputed from
//! scratch on demand.

use tracing::{debug, info};

use crate::error::{Result, WorkbenchError};
use crate::export;
use crate::model::{ColumnDef, ColumnId, DerivedSpec, OutputKind, Row};
use crate::registry::ColumnRegistry;
use crate::resolve::{resolve, ResolvedValue};
use crate::store::{ColumnPhase, DerivedCell, DerivedValueStore};
use crate::view::{compute_view, FilterState, SortSpec, TriState};

/// How many leading row identities make up the dataset fingerprint.
const FINGERPRINT_PREFIX: usize = 3;

#[derive(Debug, Clone)]
pub struct TableEngine {
    key_field: String,
    rows: Vec<Row>,
    registry: ColumnRegistry,
    store: DerivedValueStore,
    sort: Option<SortSpec>,
    filters: FilterState,
    fingerprint: String,
}

impl TableEngine {
    pub fn new(key_field: impl Into<String>) -> Self {
        Self {
            key_field: key_field.into(),
            rows: Vec::new(),
            registry: ColumnRegistry::new(),
            store: DerivedValueStore::new(),
            sort: None,
            filters: FilterState::default(),
            fingerprint: String::new(),
        }
    }

    /// Point the engine at a new domain: key field plus base column set.
    /// Derived columns survive only if the next `set_rows` keeps the same
    /// dataset fingerprint.
    pub fn configure(&mut self, key_field: impl Into<String>, base_columns: Vec<ColumnDef>) {
        self.key_field = key_field.into();
        self.registry.set_base_columns(base_columns);
    }

    /// Install a row set.
    ///
    /// A changed leading-row fingerprint means a new dataset: all derived
    /// columns, derived values, sort, and filters are cleared atomically.
    /// An unchanged fingerprint (including pure appends) preserves derived
    /// state, which is what lets a lazy expansion retroactively enrich
    /// newly-visible rows. Returns whether a reset occurred.
    pub fn set_rows(&mut self, rows: Vec<Row>) -> bool {
        let next_fingerprint = fingerprint(&rows, &self.key_field);
        let reset = !self.fingerprint.is_empty() && self.fingerprint != next_fingerprint;

        if reset {
            info!(
                rows = rows.len(),
                "new dataset detected, clearing derived state"
            );
            self.registry.clear_derived();
            self.store.clear();
            self.sort = None;
            self.filters = FilterState::default();
        } else {
            debug!(rows = rows.len(), "dataset retained, derived state kept");
        }

        self.fingerprint = next_fingerprint;
        self.rows = rows;
        reset
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn key_field(&self) -> &str {
        &self.key_field
    }

    /// Identities of the current rows, in dataset order.
    pub fn row_ids(&self) -> Vec<String> {
        self.rows
            .iter()
            .map(|row| row.identity(&self.key_field))
            .collect()
    }

    // -------------------------------------------------------------------
    // Columns
    // -------------------------------------------------------------------

    /// Register a derived column and mark it processing. The phase is set
    /// here, synchronously, so no observer can see the column without a
    /// pending indicator before its batch lands.
    pub fn register_derived_column(
        &mut self,
        label: impl Into<String>,
        spec: DerivedSpec,
    ) -> ColumnId {
        let id = self.registry.add_derived_column(label, spec);
        self.store.set_phase(id.clone(), ColumnPhase::Processing);
        id
    }

    /// Remove a derived column and purge its stored values. No-op for base
    /// columns.
    pub fn remove_derived_column(&mut self, id: &ColumnId) -> bool {
        let removed = self.registry.remove_derived_column(id);
        if removed {
            self.store.purge_column(id);
            self.filters.tri_state.remove(id);
        }
        removed
    }

    pub fn set_visibility(&mut self, id: &ColumnId, visible: bool) -> Result<()> {
        if self.registry.set_visibility(id, visible) {
            Ok(())
        } else {
            Err(WorkbenchError::UnknownColumn(id.clone()))
        }
    }

    pub fn toggle_explanation(&mut self, id: &ColumnId) -> Result<()> {
        if self.registry.toggle_explanation(id) {
            Ok(())
        } else {
            Err(WorkbenchError::UnknownColumn(id.clone()))
        }
    }

    pub fn registry(&self) -> &ColumnRegistry {
        &self.registry
    }

    pub fn store(&self) -> &DerivedValueStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut DerivedValueStore {
        &mut self.store
    }

    pub fn column_phase(&self, id: &ColumnId) -> Option<ColumnPhase> {
        self.store.phase(id)
    }

    // -------------------------------------------------------------------
    // Sort & filters
    // -------------------------------------------------------------------

    /// Header-click sort cycling: asc -> desc -> none on the same column,
    /// asc on a new column.
    pub fn cycle_sort(&mut self, column: &ColumnId) -> Result<()> {
        if self.registry.get(column).is_none() {
            return Err(WorkbenchError::UnknownColumn(column.clone()));
        }
        self.sort = SortSpec::cycle(self.sort.take(), column);
        Ok(())
    }

    pub fn sort(&self) -> Option<&SortSpec> {
        self.sort.as_ref()
    }

    pub fn set_text_filter(&mut self, text: impl Into<String>) {
        self.filters.text = text.into();
    }

    /// Tri-state filter, valid only on derived boolean columns.
    pub fn set_tri_state_filter(&mut self, column: &ColumnId, state: TriState) -> Result<()> {
        match self.registry.get(column) {
            Some(def) if def.derived.as_ref().map(|s| s.output) == Some(OutputKind::Bool) => {
                self.filters.set_tri_state(column.clone(), state);
                Ok(())
            }
            Some(_) => Err(WorkbenchError::Validation(format!(
                "column '{}' is not a derived boolean column",
                column
            ))),
            None => Err(WorkbenchError::UnknownColumn(column.clone())),
        }
    }

    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    // -------------------------------------------------------------------
    // Views
    // -------------------------------------------------------------------

    /// The sorted, filtered display sequence.
    pub fn display_rows(&self) -> Vec<&Row> {
        compute_view(
            &self.rows,
            &self.registry,
            &self.store,
            &self.key_field,
            self.sort.as_ref(),
            &self.filters,
        )
    }

    /// Resolve one cell.
    pub fn resolve_cell(&self, row: &Row, column: &ColumnId) -> Result<ResolvedValue> {
        let def = self
            .registry
            .get(column)
            .ok_or_else(|| WorkbenchError::UnknownColumn(column.clone()))?;
        Ok(resolve(row, def, &self.store, &self.key_field))
    }

    /// Raw derived cell (confidence, explanation) for inspection/export.
    pub fn cell_record(&self, column: &ColumnId, row_id: &str) -> Option<&DerivedCell> {
        self.store.get(column, row_id)
    }

    /// CSV of the current display sequence.
    pub fn to_csv(&self) -> String {
        export::to_csv(
            &self.display_rows(),
            &self.registry,
            &self.store,
            &self.key_field,
        )
    }

    /// Full reset: rows, columns, derived state, view state.
    pub fn reset(&mut self) {
        self.rows.clear();
        self.registry = ColumnRegistry::new();
        self.store.clear();
        self.sort = None;
        self.filters = FilterState::default();
        self.fingerprint.clear();
    }
}

/// Identity fingerprint of the dataset's leading rows.
fn fingerprint(rows: &[Row], key_field: &str) -> String {
    rows.iter()
        .take(FINGERPRINT_PREFIX)
        .map(|row| row.identity(key_field))
        .collect::<Vec<_>>()
        .join("|")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FieldValue;

    fn rows(ids: std::ops::RangeInclusive<usize>) -> Vec<Row> {
        ids.map(|i| {
            Row::new()
                .with("pmid", FieldValue::Text(i.to_string()))
                .with("title", FieldValue::Text(format!("Study {}", i)))
        })
        .collect()
    }

    fn spec() -> DerivedSpec {
        DerivedSpec {
            criterion: "c".to_string(),
            input_fields: vec!["title".to_string()],
            output: OutputKind::Bool,
            show_explanation: false,
            score_range: None,
        }
    }

    fn engine_with_data() -> (TableEngine, ColumnId) {
        let mut engine = TableEngine::new("pmid");
        engine.configure(
            "pmid",
            vec![
                ColumnDef::base("pmid", "PMID"),
                ColumnDef::base("title", "Title"),
            ],
        );
        engine.set_rows(rows(1..=20));
        let col = engine.register_derived_column("Relevant?", spec());
        engine.store_mut().insert(
            col.clone(),
            "1",
            DerivedCell::Judged {
                value: FieldValue::Text("Yes".to_string()),
                confidence: 0.9,
                explanation: "e".to_string(),
                text_value: None,
            },
        );
        engine.store_mut().set_phase(col.clone(), ColumnPhase::Ready);
        (engine, col)
    }

    #[test]
    fn test_new_dataset_purges_derived_state() {
        let (mut engine, col) = engine_with_data();
        engine.cycle_sort(&ColumnId::from("title")).unwrap();
        engine.set_text_filter("study");

        // Different leading rows: treated as a new dataset
        let reset = engine.set_rows(rows(100..=120));
        assert!(reset);
        assert!(engine.registry().derived_columns().next().is_none());
        assert_eq!(engine.store().cell_count(), 0);
        assert!(engine.sort().is_none());
        assert!(engine.filters().is_empty());
        assert_eq!(engine.column_phase(&col), None);
        // Base columns survive
        assert_eq!(engine.registry().len(), 2);
    }

    #[test]
    fn test_append_preserves_derived_state() {
        let (mut engine, col) = engine_with_data();

        // Same leading rows, more of them: an expansion
        let reset = engine.set_rows(rows(1..=500));
        assert!(!reset);
        assert_eq!(engine.row_count(), 500);
        assert!(engine.registry().get(&col).is_some());
        assert!(engine.cell_record(&col, "1").is_some());
        assert_eq!(engine.column_phase(&col), Some(ColumnPhase::Ready));
    }

    #[test]
    fn test_first_load_is_not_a_reset() {
        let mut engine = TableEngine::new("pmid");
        assert!(!engine.set_rows(rows(1..=5)));
    }

    #[test]
    fn test_register_sets_processing_phase_synchronously() {
        let mut engine = TableEngine::new("pmid");
        engine.set_rows(rows(1..=3));
        let col = engine.register_derived_column("X", spec());
        assert_eq!(engine.column_phase(&col), Some(ColumnPhase::Processing));
    }

    #[test]
    fn test_remove_derived_purges_values_and_filters() {
        let (mut engine, col) = engine_with_data();
        engine.set_tri_state_filter(&col, TriState::Yes).unwrap();

        assert!(engine.remove_derived_column(&col));
        assert!(engine.cell_record(&col, "1").is_none());
        assert!(engine.filters().is_empty());
        // Base columns are not removable
        assert!(!engine.remove_derived_column(&ColumnId::from("pmid")));
    }

    #[test]
    fn test_tri_state_rejected_on_non_boolean_columns() {
        let (mut engine, _) = engine_with_data();
        let err = engine
            .set_tri_state_filter(&ColumnId::from("title"), TriState::Yes)
            .unwrap_err();
        assert!(matches!(err, WorkbenchError::Validation(_)));

        let mut numeric = spec();
        numeric.output = OutputKind::Number;
        let num_col = engine.register_derived_column("Score", numeric);
        assert!(engine.set_tri_state_filter(&num_col, TriState::Yes).is_err());
    }

    #[test]
    fn test_cycle_sort_unknown_column() {
        let (mut engine, _) = engine_with_data();
        assert!(engine.cycle_sort(&ColumnId::from("missing")).is_err());
    }

    #[test]
    fn test_display_rows_apply_sort_and_filter() {
        let (mut engine, col) = engine_with_data();
        engine.store_mut().insert(
            col.clone(),
            "2",
            DerivedCell::Judged {
                value: FieldValue::Text("No".to_string()),
                confidence: 0.8,
                explanation: "e".to_string(),
                text_value: None,
            },
        );
        engine.set_tri_state_filter(&col, TriState::Yes).unwrap();

        let view = engine.display_rows();
        assert_eq!(view.len(), 1);
        assert_eq!(view[0].identity("pmid"), "1");
    }

    #[test]
    fn test_reset_clears_everything() {
        let (mut engine, _) = engine_with_data();
        engine.reset();
        assert_eq!(engine.row_count(), 0);
        assert!(engine.registry().is_empty());
        assert_eq!(engine.store().cell_count(), 0);
    }
}
