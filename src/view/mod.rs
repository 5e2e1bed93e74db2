//! View computation
//!
//! Pure, order-preserving pipeline from the raw dataset to the display
//! sequence: `rows -> sort -> filter -> display rows`. Nothing in here
//! mutates the dataset; the engine recomputes the view after every state
//! change. Page-size caps live with the caller, not here.

mod filter;
mod sort;

pub use filter::{passes_filters, passes_text_filter, passes_tri_state, FilterState, TriState};
pub use sort::{compare_rows, SortDirection, SortSpec};

use crate::model::Row;
use crate::registry::ColumnRegistry;
use crate::store::DerivedValueStore;

/// Compute the sorted, then filtered, display sequence.
pub fn compute_view<'a>(
    rows: &'a [Row],
    registry: &ColumnRegistry,
    store: &DerivedValueStore,
    key_field: &str,
    sort: Option<&SortSpec>,
    filters: &FilterState,
) -> Vec<&'a Row> {
    let mut view: Vec<&Row> = rows.iter().collect();

    if let Some(spec) = sort {
        if let Some(column) = registry.get(&spec.column) {
            view.sort_by(|a, b| compare_rows(a, b, column, store, key_field, spec.direction));
        }
    }

    view.retain(|row| passes_filters(row, registry, store, key_field, filters));
    view
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ColumnDef, FieldValue};

    fn rows() -> Vec<Row> {
        vec![
            Row::new()
                .with("pmid", FieldValue::Text("1".to_string()))
                .with("title", FieldValue::Text("beta blockers".to_string())),
            Row::new()
                .with("pmid", FieldValue::Text("2".to_string()))
                .with("title", FieldValue::Text("Alpha agonists".to_string())),
            Row::new().with("pmid", FieldValue::Text("3".to_string())),
        ]
    }

    fn registry() -> ColumnRegistry {
        let mut reg = ColumnRegistry::new();
        reg.set_base_columns(vec![
            ColumnDef::base("pmid", "PMID"),
            ColumnDef::base("title", "Title"),
        ]);
        reg
    }

    #[test]
    fn test_sort_then_filter() {
        let rows = rows();
        let reg = registry();
        let store = DerivedValueStore::new();
        let sort = SortSpec {
            column: "title".into(),
            direction: SortDirection::Asc,
        };
        let filters = FilterState {
            text: "a".to_string(),
            ..FilterState::default()
        };

        let view = compute_view(&rows, &reg, &store, "pmid", Some(&sort), &filters);
        let titles: Vec<String> = view
            .iter()
            .map(|r| r.identity("title"))
            .collect();
        // Case-insensitive ascending, missing title filtered out by text
        assert_eq!(titles, vec!["Alpha agonists", "beta blockers"]);
    }

    #[test]
    fn test_missing_sorts_last_in_both_directions() {
        let rows = rows();
        let reg = registry();
        let store = DerivedValueStore::new();
        let filters = FilterState::default();

        for direction in [SortDirection::Asc, SortDirection::Desc] {
            let sort = SortSpec {
                column: "title".into(),
                direction,
            };
            let view = compute_view(&rows, &reg, &store, "pmid", Some(&sort), &filters);
            assert_eq!(view.last().unwrap().identity("pmid"), "3");
        }
    }

    #[test]
    fn test_no_sort_preserves_ingestion_order() {
        let rows = rows();
        let reg = registry();
        let store = DerivedValueStore::new();
        let view = compute_view(&rows, &reg, &store, "pmid", None, &FilterState::default());
        let ids: Vec<String> = view.iter().map(|r| r.identity("pmid")).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
    }
}
