//! End-to-end workbench flows against the in-memory mocks.

use std::sync::Arc;

use pretty_assertions::assert_eq;

use studybench::lineage::{compare, LineageTracker};
use studybench::mock::{MockInferenceBackend, MockSearchSource};
use studybench::{
    ColumnDef, ColumnPhase, DerivedColumnRequest, FieldValue, PartitionKind, Row, SearchCriteria,
    TriState, Workbench,
};

fn literature_rows(ids: std::ops::RangeInclusive<usize>) -> Vec<Row> {
    ids.map(|i| {
        Row::new()
            .with("pmid", FieldValue::Text(i.to_string()))
            .with("title", FieldValue::Text(format!("Study {}", i)))
    })
    .collect()
}

/// Search returns a bounded page but the root snapshot covers the full
/// reported id set and total.
#[tokio::test]
async fn search_records_root_snapshot_with_full_id_set() {
    let source = MockSearchSource::literature(137).with_total(137);
    let mut bench = Workbench::new(Arc::new(source), Arc::new(MockInferenceBackend::new()));

    let root = bench
        .search(SearchCriteria::new("diabetes").with_limit(20))
        .await
        .unwrap();

    assert_eq!(bench.engine().row_count(), 20);
    let snapshot = bench.snapshot(root).unwrap();
    assert_eq!(snapshot.total_matched, 137);
    assert_eq!(snapshot.row_ids.len(), 137);
    assert_eq!(bench.version_of(root), Some(1));
}

/// A boolean derived column resolving 15 Yes / 5 No filters down to
/// exactly 15 rows under the tri-state "yes".
#[tokio::test]
async fn boolean_column_tri_state_filter() {
    let source = MockSearchSource::literature(20);
    let mut backend = MockInferenceBackend::new();
    for i in 1..=20 {
        backend = backend.judge(
            &i.to_string(),
            i <= 15,
            0.9,
            if i <= 15 { "on topic" } else { "off topic" },
        );
    }
    let mut bench = Workbench::new(Arc::new(source), Arc::new(backend));

    bench
        .search(SearchCriteria::new("diabetes").with_limit(20))
        .await
        .unwrap();
    let column = bench
        .add_derived_column(
            DerivedColumnRequest::new("T2D?", "Is this about type 2 diabetes?")
                .with_input_fields(&["title"]),
        )
        .await
        .unwrap();

    assert_eq!(bench.engine().column_phase(&column), Some(ColumnPhase::Ready));

    bench.set_tri_state_filter(&column, TriState::Yes).unwrap();
    assert_eq!(bench.engine().display_rows().len(), 15);

    bench.set_tri_state_filter(&column, TriState::No).unwrap();
    assert_eq!(bench.engine().display_rows().len(), 5);

    bench.set_tri_state_filter(&column, TriState::All).unwrap();
    assert_eq!(bench.engine().display_rows().len(), 20);
}

/// Under-fetched datasets expand lazily, once, when the first derived
/// column arrives; already-computed state survives the expansion.
#[tokio::test]
async fn enrichment_expands_underfetched_dataset() {
    let source = Arc::new(MockSearchSource::literature(60).with_total(137));
    let mut bench = Workbench::new(
        source.clone(),
        Arc::new(MockInferenceBackend::new().judge("1", true, 0.9, "match")),
    );

    bench
        .search(SearchCriteria::new("diabetes").with_limit(20))
        .await
        .unwrap();
    assert_eq!(bench.engine().row_count(), 20);
    assert_eq!(source.requested_limits(), vec![20]);

    let column = bench
        .add_derived_column(
            DerivedColumnRequest::new("Relevant?", "relevant?").with_input_fields(&["title"]),
        )
        .await
        .unwrap();

    // The corpus only holds 60 rows, but the expansion asked for the full
    // reported total and every loaded row got judged.
    assert_eq!(source.requested_limits(), vec![20, 137]);
    assert_eq!(bench.engine().row_count(), 60);
    assert!(bench.engine().cell_record(&column, "60").is_some());
    assert_eq!(bench.engine().column_phase(&column), Some(ColumnPhase::Ready));
}

/// A fresh search with different leading rows clears every piece of
/// derived state; repeating the same search keeps it.
#[tokio::test]
async fn new_search_resets_derived_state() {
    let source = MockSearchSource::literature(20)
        .with_corpus_for("oncology", literature_rows(500..=520));
    let mut backend = MockInferenceBackend::new();
    for i in 1..=20 {
        backend = backend.judge(&i.to_string(), true, 0.9, "yes");
    }
    let mut bench = Workbench::new(Arc::new(source), Arc::new(backend));

    bench
        .search(SearchCriteria::new("diabetes").with_limit(20))
        .await
        .unwrap();
    let column = bench
        .add_derived_column(DerivedColumnRequest::new("Keep?", "keep?").with_input_fields(&["title"]))
        .await
        .unwrap();
    bench.cycle_sort(&studybench::ColumnId::from("title")).unwrap();
    bench.set_text_filter("study");
    assert!(bench.engine().store().cell_count() > 0);

    bench
        .search(SearchCriteria::new("oncology").with_limit(20))
        .await
        .unwrap();

    assert!(bench.engine().registry().get(&column).is_none());
    assert_eq!(bench.engine().store().cell_count(), 0);
    assert!(bench.engine().sort().is_none());
    assert!(bench.engine().filters().is_empty());
    // Both searches remain distinct lineage entries
    assert_eq!(bench.lineage_entries().len(), 2);
}

/// Scenario C: 100-id vs 150-id snapshots sharing 80 ids partition into
/// 20 / 70 / 80.
#[test]
fn comparison_partitions_match_expected_sizes() {
    let mut tracker = LineageTracker::new();
    let a = tracker.record_search(
        literature_rows(1..=100),
        "pmid",
        100,
        vec![],
        &SearchCriteria::new("X"),
    );
    let b = tracker.record_search(
        literature_rows(21..=170),
        "pmid",
        150,
        vec![],
        &SearchCriteria::new("Y"),
    );

    let diff = compare(tracker.get(a).unwrap(), tracker.get(b).unwrap());
    assert_eq!(diff.only_a.len(), 20);
    assert_eq!(diff.only_b.len(), 70);
    assert_eq!(diff.both.len(), 80);
}

/// Freezing a comparison partition produces a compare-type node carrying
/// both parent ids, and its version shifts as newer snapshots arrive.
#[tokio::test]
async fn freeze_partition_and_lineage_descriptions() {
    let source = MockSearchSource::literature(20)
        .with_corpus_for("second", literature_rows(11..=30));
    let mut bench = Workbench::new(Arc::new(source), Arc::new(MockInferenceBackend::new()));

    let a = bench
        .search(SearchCriteria::new("diabetes").with_limit(20))
        .await
        .unwrap();
    let b = bench
        .search(SearchCriteria::new("second").with_limit(20))
        .await
        .unwrap();

    let frozen = bench
        .freeze_partition(a, b, PartitionKind::Both, Some("overlap".into()))
        .unwrap();

    let snapshot = bench.snapshot(frozen).unwrap();
    assert_eq!(snapshot.row_ids.len(), 10);
    assert_eq!(snapshot.total_matched, 10);
    assert_eq!(snapshot.provenance.parent_ids(), vec![a, b]);

    let entries = bench.lineage_entries();
    assert_eq!(entries.len(), 3);
    // Newest first, versions positional
    assert_eq!(entries[0].id, frozen);
    assert_eq!(entries[0].version, 3);
    assert!(entries[0].description.contains("#1"));
    assert!(entries[0].description.contains("#2"));
}

/// Deleting a parent degrades the child's description to "unknown parent"
/// and renumbers newer snapshots.
#[tokio::test]
async fn deletion_renumbers_and_dangles_gracefully() {
    let source = MockSearchSource::literature(20);
    let mut bench = Workbench::new(Arc::new(source), Arc::new(MockInferenceBackend::new()));

    let mut roots = Vec::new();
    for _ in 0..3 {
        roots.push(
            bench
                .search(SearchCriteria::new("diabetes").with_limit(20))
                .await
                .unwrap(),
        );
    }
    let child = bench
        .freeze_filtered_view("kept everything", None)
        .unwrap();
    assert_eq!(bench.version_of(child), Some(4));

    // Delete the child's parent (the newest root)
    bench.delete_snapshot(roots[2]).unwrap();

    assert_eq!(bench.version_of(child), Some(3));
    assert_eq!(bench.version_of(roots[0]), Some(1));
    let entry = bench
        .lineage_entries()
        .into_iter()
        .find(|e| e.id == child)
        .unwrap();
    assert!(entry.description.contains("unknown parent"));
}

/// Scenario D: CSV export with a derived column synthesizes confidence and
/// reasoning columns and quotes embedded commas.
#[tokio::test]
async fn csv_export_quotes_and_synthesizes_columns() {
    let rows = vec![
        Row::new()
            .with("pmid", FieldValue::Text("1".to_string()))
            .with("name", FieldValue::Text("Study one".to_string())),
        Row::new()
            .with("pmid", FieldValue::Text("2".to_string()))
            .with("name", FieldValue::Text("Study two".to_string())),
    ];
    let source = MockSearchSource::new("pmid", vec![ColumnDef::base("name", "Name")], rows);
    let backend = MockInferenceBackend::new()
        .judge("1", true, 0.92, "mentions insulin, metformin and diet")
        .judge("2", false, 0.85, "unrelated");
    let mut bench = Workbench::new(Arc::new(source), Arc::new(backend));

    bench
        .search(SearchCriteria::new("diabetes").with_limit(2))
        .await
        .unwrap();
    bench
        .add_derived_column(
            DerivedColumnRequest::new("MyColumn", "Is this about type 2 diabetes?")
                .with_input_fields(&["name"]),
        )
        .await
        .unwrap();

    let csv = bench.export_csv();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(
        lines[0],
        "Name,MyColumn,MyColumn (Confidence),MyColumn (Reasoning)"
    );
    assert_eq!(
        lines[1],
        "Study one,Yes,92%,\"mentions insulin, metformin and diet\""
    );
    assert_eq!(lines[2], "Study two,No,85%,unrelated");
}

/// The whole-session reset clears dataset, derived state, and lineage
/// atomically.
#[tokio::test]
async fn workbench_reset_clears_lineage() {
    let source = MockSearchSource::literature(10);
    let mut bench = Workbench::new(Arc::new(source), Arc::new(MockInferenceBackend::new()));

    bench
        .search(SearchCriteria::new("diabetes").with_limit(10))
        .await
        .unwrap();
    bench.freeze_filtered_view("all", None).unwrap();
    assert_eq!(bench.lineage_entries().len(), 2);

    bench.reset();
    assert!(bench.lineage_entries().is_empty());
    assert_eq!(bench.engine().row_count(), 0);
}
