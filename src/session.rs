//! Workbench session
//!
//! The caller-facing facade: wires a search source and an inference backend
//! to the table engine and the lineage tracker, and exposes every operation
//! the rendering layer needs. Single writer: all shared state lives here and
//! mutates only through these methods.
//!
//! Backend failures during enrichment do not surface as `Err`: they become
//! failure sentinels on the submitted rows plus a retained message, so the
//! column survives for inspection, deletion, or retry by re-adding.

use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use crate::engine::TableEngine;
use crate::enrich::{self, DerivedColumnRequest, InferenceBackend, InferenceRequest};
use crate::error::{Result, WorkbenchError};
use crate::lineage::{compare, LineageTracker, Partition, Provenance, Snapshot, SnapshotDiff};
use crate::model::ColumnId;
use crate::search::{SearchCriteria, SearchSource};
use crate::store::ColumnPhase;

/// Default bound on how many rows a lazy enrichment expansion may request.
const DEFAULT_EXPANSION_CAP: usize = 500;

/// Which side of a comparison to freeze.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionKind {
    OnlyA,
    OnlyB,
    Both,
}

/// One lineage entry as the rendering layer consumes it.
#[derive(Debug, Clone)]
pub struct LineageEntry {
    pub id: Uuid,
    /// Positional version, newest = highest. Shifts under deletion.
    pub version: usize,
    pub label: String,
    pub description: String,
    pub row_count: usize,
    pub total_matched: usize,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

pub struct Workbench {
    engine: TableEngine,
    lineage: LineageTracker,
    source: Arc<dyn SearchSource>,
    backend: Arc<dyn InferenceBackend>,
    expansion_cap: usize,
    /// Criteria of the active search, for lazy expansion.
    last_criteria: Option<SearchCriteria>,
    last_total: usize,
    /// Root snapshot the active dataset descends from.
    current_root: Option<Uuid>,
    last_error: Option<String>,
}

impl Workbench {
    pub fn new(source: Arc<dyn SearchSource>, backend: Arc<dyn InferenceBackend>) -> Self {
        let mut engine = TableEngine::new(source.key_field());
        engine.configure(source.key_field(), source.base_columns());
        Self {
            engine,
            lineage: LineageTracker::new(),
            source,
            backend,
            expansion_cap: DEFAULT_EXPANSION_CAP,
            last_criteria: None,
            last_total: 0,
            current_root: None,
            last_error: None,
        }
    }

    pub fn with_expansion_cap(mut self, cap: usize) -> Self {
        self.expansion_cap = cap;
        self
    }

    // -------------------------------------------------------------------
    // Search
    // -------------------------------------------------------------------

    /// Run a search, install its rows as the active dataset, and record a
    /// root snapshot. A dataset with different leading rows clears all
    /// derived state; repeating the same search preserves it.
    pub async fn search(&mut self, criteria: SearchCriteria) -> Result<Uuid> {
        if criteria.query.trim().is_empty() {
            return Err(WorkbenchError::Validation(
                "search query must not be empty".to_string(),
            ));
        }

        let page = match self.source.search(&criteria).await {
            Ok(page) => page,
            Err(err) => {
                let message = format!("{:#}", err);
                self.last_error = Some(message.clone());
                return Err(WorkbenchError::Search(message));
            }
        };

        info!(
            query = %criteria.query,
            rows = page.rows.len(),
            total = page.total_matched,
            "search complete"
        );
        let total_matched = page.total_matched;
        self.engine.set_rows(page.rows.clone());

        let snapshot_id = self.lineage.record_search(
            page.rows,
            self.source.key_field(),
            total_matched,
            page.all_ids,
            &criteria,
        );

        self.last_criteria = Some(criteria);
        self.last_total = total_matched;
        self.current_root = Some(snapshot_id);
        self.last_error = None;
        Ok(snapshot_id)
    }

    // -------------------------------------------------------------------
    // Enrichment
    // -------------------------------------------------------------------

    /// Add a derived column and run its enrichment batch.
    ///
    /// The column id is allocated and its processing phase set before the
    /// first await. If the dataset was under-fetched, the full candidate
    /// set (up to the expansion cap) is fetched first. The batch call's
    /// failure is absorbed: every submitted row gets a failure sentinel and
    /// the column stays registered.
    pub async fn add_derived_column(
        &mut self,
        request: DerivedColumnRequest,
    ) -> Result<ColumnId> {
        if request.label.trim().is_empty() {
            return Err(WorkbenchError::Validation(
                "column label must not be empty".to_string(),
            ));
        }
        if request.criterion.trim().is_empty() {
            return Err(WorkbenchError::Validation(
                "criterion must not be empty".to_string(),
            ));
        }

        let (label, spec) = request.into_spec();
        let column = self.engine.register_derived_column(label, spec.clone());

        self.expand_if_needed().await;

        let items = enrich::build_items(self.engine.rows(), &spec.input_fields, self.engine.key_field());
        let submitted_ids: Vec<String> = items.iter().map(|item| item.id.clone()).collect();
        let request = InferenceRequest {
            items,
            input_fields: spec.input_fields.clone(),
            criterion: spec.criterion.clone(),
            output: spec.output,
            score_range: spec.score_range,
        };

        match self.backend.infer(&request).await {
            Ok(judgments) => {
                let stored = enrich::ingest_judgments(
                    self.engine.store_mut(),
                    &column,
                    spec.output,
                    &submitted_ids,
                    &judgments,
                );
                self.engine
                    .store_mut()
                    .set_phase(column.clone(), ColumnPhase::Ready);
                info!(column = %column, stored, "enrichment batch complete");
            }
            Err(err) => {
                let message = format!("{:#}", err);
                warn!(column = %column, error = %message, "enrichment batch failed");
                self.engine
                    .store_mut()
                    .fail_batch(&column, submitted_ids.iter().map(String::as_str));
                self.engine
                    .store_mut()
                    .set_phase(column.clone(), ColumnPhase::Failed);
                self.last_error = Some(message);
            }
        }

        Ok(column)
    }

    /// Fetch the wider candidate set when the initial search under-fetched.
    /// Requested lazily, only when a derived column is added. Expansion
    /// failure is non-fatal: enrichment proceeds over the loaded rows.
    async fn expand_if_needed(&mut self) {
        let target = self.last_total.min(self.expansion_cap);
        if self.engine.row_count() >= target {
            return;
        }
        let Some(criteria) = self.last_criteria.clone() else {
            return;
        };

        info!(
            loaded = self.engine.row_count(),
            target, "expanding dataset before enrichment"
        );
        match self.source.search(&criteria.with_limit(target)).await {
            Ok(page) => {
                self.engine.set_rows(page.rows);
            }
            Err(err) => {
                warn!(error = %format!("{:#}", err), "expansion failed, enriching loaded rows");
            }
        }
    }

    // -------------------------------------------------------------------
    // Columns, sort, filters (engine passthroughs)
    // -------------------------------------------------------------------

    pub fn remove_derived_column(&mut self, column: &ColumnId) -> bool {
        self.engine.remove_derived_column(column)
    }

    pub fn set_visibility(&mut self, column: &ColumnId, visible: bool) -> Result<()> {
        self.engine.set_visibility(column, visible)
    }

    pub fn toggle_explanation(&mut self, column: &ColumnId) -> Result<()> {
        self.engine.toggle_explanation(column)
    }

    pub fn cycle_sort(&mut self, column: &ColumnId) -> Result<()> {
        self.engine.cycle_sort(column)
    }

    pub fn set_text_filter(&mut self, text: impl Into<String>) {
        self.engine.set_text_filter(text);
    }

    pub fn set_tri_state_filter(
        &mut self,
        column: &ColumnId,
        state: crate::view::TriState,
    ) -> Result<()> {
        self.engine.set_tri_state_filter(column, state)
    }

    pub fn engine(&self) -> &TableEngine {
        &self.engine
    }

    pub fn export_csv(&self) -> String {
        self.engine.to_csv()
    }

    // -------------------------------------------------------------------
    // Lineage
    // -------------------------------------------------------------------

    /// Freeze the current display sequence as a filter-type child of the
    /// active search snapshot.
    pub fn freeze_filtered_view(
        &mut self,
        description: impl Into<String>,
        label: Option<String>,
    ) -> Result<Uuid> {
        let parent = self.current_root.ok_or_else(|| {
            WorkbenchError::Validation("no active search to derive from".to_string())
        })?;
        let rows: Vec<_> = self.engine.display_rows().into_iter().cloned().collect();
        if rows.is_empty() {
            return Err(WorkbenchError::Validation(
                "refusing to freeze an empty view".to_string(),
            ));
        }
        let key_field = self.engine.key_field().to_string();
        let row_ids = rows.iter().map(|row| row.identity(&key_field)).collect();
        Ok(self.lineage.record_derived(
            rows,
            row_ids,
            &key_field,
            Provenance::Filter {
                description: description.into(),
                parent,
            },
            label,
        ))
    }

    /// Partition two snapshots' identity sets.
    pub fn compare_snapshots(&self, a: Uuid, b: Uuid) -> Result<SnapshotDiff> {
        let snap_a = self
            .lineage
            .get(a)
            .ok_or(WorkbenchError::UnknownSnapshot(a))?;
        let snap_b = self
            .lineage
            .get(b)
            .ok_or(WorkbenchError::UnknownSnapshot(b))?;
        Ok(compare(snap_a, snap_b))
    }

    /// Freeze one comparison partition as a compare-type node carrying both
    /// parent ids.
    pub fn freeze_partition(
        &mut self,
        a: Uuid,
        b: Uuid,
        kind: PartitionKind,
        label: Option<String>,
    ) -> Result<Uuid> {
        let diff = self.compare_snapshots(a, b)?;
        let (partition, description) = describe_partition(&self.lineage, a, b, kind, diff);
        if partition.ids.is_empty() {
            return Err(WorkbenchError::Validation(
                "partition is empty, nothing to freeze".to_string(),
            ));
        }
        let key_field = self.engine.key_field().to_string();
        Ok(self.lineage.record_derived(
            partition.rows,
            partition.ids,
            &key_field,
            Provenance::Compare {
                description,
                parents: [a, b],
            },
            label,
        ))
    }

    /// Lineage entries newest first, with positional versions and rendered
    /// provenance descriptions.
    pub fn lineage_entries(&self) -> Vec<LineageEntry> {
        self.lineage
            .snapshots()
            .iter()
            .map(|snapshot| LineageEntry {
                id: snapshot.id,
                version: self.lineage.version_of(snapshot.id).unwrap_or(0),
                label: snapshot.display_label(),
                description: self.lineage.describe_provenance(snapshot),
                row_count: snapshot.row_ids.len(),
                total_matched: snapshot.total_matched,
                created_at: snapshot.created_at,
            })
            .collect()
    }

    pub fn snapshot(&self, id: Uuid) -> Option<&Snapshot> {
        self.lineage.get(id)
    }

    pub fn version_of(&self, id: Uuid) -> Option<usize> {
        self.lineage.version_of(id)
    }

    pub fn relabel_snapshot(&mut self, id: Uuid, label: impl Into<String>) -> Result<()> {
        self.lineage.relabel(id, label)
    }

    pub fn delete_snapshot(&mut self, id: Uuid) -> Result<()> {
        self.lineage.delete(id)
    }

    // -------------------------------------------------------------------
    // Session state
    // -------------------------------------------------------------------

    /// Most recent retained error message, if any.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Full workbench reset: dataset, derived state, and the entire lineage
    /// list, cleared atomically.
    pub fn reset(&mut self) {
        self.engine.reset();
        self.engine
            .configure(self.source.key_field(), self.source.base_columns());
        self.lineage.clear();
        self.last_criteria = None;
        self.last_total = 0;
        self.current_root = None;
        self.last_error = None;
    }
}

fn describe_partition(
    lineage: &LineageTracker,
    a: Uuid,
    b: Uuid,
    kind: PartitionKind,
    diff: SnapshotDiff,
) -> (Partition, String) {
    let name = |id: Uuid| {
        lineage
            .get(id)
            .map(|s| s.display_label())
            .unwrap_or_else(|| "unknown parent".to_string())
    };
    match kind {
        PartitionKind::OnlyA => (diff.only_a, format!("Only in {}", name(a))),
        PartitionKind::OnlyB => (diff.only_b, format!("Only in {}", name(b))),
        PartitionKind::Both => (diff.both, format!("In both {} and {}", name(a), name(b))),
    }
}
