//! Scripted workbench session against the in-memory mocks.
//!
//! Runs a search, enriches it with a boolean column, filters, freezes a
//! subset, and compares two snapshots, logging each step. Useful for
//! eyeballing the engine's behavior without network access.

use std::sync::Arc;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use studybench::mock::{MockInferenceBackend, MockSearchSource};
use studybench::{
    DerivedColumnRequest, PartitionKind, SearchCriteria, TriState, Workbench,
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let source = MockSearchSource::literature(60).with_total(137);
    let backend = MockInferenceBackend::new()
        .judge("1", true, 0.92, "directly on topic")
        .judge("2", true, 0.81, "related cohort")
        .judge("3", false, 0.88, "different condition");

    let mut bench = Workbench::new(Arc::new(source), Arc::new(backend));

    let first = bench
        .search(SearchCriteria::new("diabetes").with_limit(20))
        .await?;
    println!("search #1 loaded {} rows", bench.engine().row_count());

    let column = bench
        .add_derived_column(
            DerivedColumnRequest::new("T2D?", "Is this about type 2 diabetes?")
                .with_input_fields(&["title"]),
        )
        .await?;
    println!(
        "derived column {} phase: {:?}",
        column,
        bench.engine().column_phase(&column)
    );

    bench.set_tri_state_filter(&column, TriState::Yes)?;
    println!("filtered view: {} rows", bench.engine().display_rows().len());

    let subset = bench.freeze_filtered_view("kept Yes rows", Some("yes-subset".into()))?;

    let second = bench
        .search(SearchCriteria::new("diabetes").with_limit(20))
        .await?;
    println!(
        "repeat search recorded as version {:?}",
        bench.version_of(second)
    );

    let diff = bench.compare_snapshots(first, subset)?;
    println!(
        "compare: only_a={} only_b={} both={}",
        diff.only_a.len(),
        diff.only_b.len(),
        diff.both.len()
    );
    bench.freeze_partition(first, subset, PartitionKind::Both, None)?;

    for entry in bench.lineage_entries() {
        println!(
            "#{} {} - {} ({} ids)",
            entry.version, entry.label, entry.description, entry.row_count
        );
    }

    let csv = bench.export_csv();
    println!("csv export: {} lines", csv.lines().count());
    Ok(())
}
