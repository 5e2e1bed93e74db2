//! Lineage tracker
//!
//! Append-only list of snapshots, newest first. Version numbers are purely
//! positional (`len - index`, newest = highest) and recomputed on every
//! query, never stored: deleting a snapshot renumbers the ones recorded
//! after it. Deleting a parent does not cascade; surviving children keep
//! their parent ids and display "unknown parent".

use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use super::snapshot::{Provenance, Snapshot};
use crate::error::{Result, WorkbenchError};
use crate::model::Row;
use crate::search::SearchCriteria;

#[derive(Debug, Clone, Default)]
pub struct LineageTracker {
    /// Newest first.
    snapshots: Vec<Snapshot>,
}

impl LineageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a search result set as a new root node.
    ///
    /// Always appends, even when the criteria match a previous search:
    /// repeat searches are distinct history entries.
    pub fn record_search(
        &mut self,
        rows: Vec<Row>,
        key_field: &str,
        total_matched: usize,
        all_ids: Vec<String>,
        criteria: &SearchCriteria,
    ) -> Uuid {
        let row_ids = if all_ids.is_empty() {
            rows.iter().map(|row| row.identity(key_field)).collect()
        } else {
            all_ids
        };
        let snapshot = Snapshot {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            label: None,
            provenance: Provenance::Search {
                query: criteria.query.clone(),
                date_range: criteria.date_range,
                date_kind: criteria.date_kind,
            },
            rows,
            row_ids,
            total_matched,
            key_field: key_field.to_string(),
        };
        let id = snapshot.id;
        debug!(snapshot = %id, query = %criteria.query, "recorded search snapshot");
        self.snapshots.insert(0, snapshot);
        id
    }

    /// Record a derived subset (filter or comparison partition).
    ///
    /// The node's total is its own size, not the ancestor's.
    pub fn record_derived(
        &mut self,
        rows: Vec<Row>,
        row_ids: Vec<String>,
        key_field: &str,
        provenance: Provenance,
        label: Option<String>,
    ) -> Uuid {
        let snapshot = Snapshot {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            label,
            total_matched: rows.len(),
            provenance,
            rows,
            row_ids,
            key_field: key_field.to_string(),
        };
        let id = snapshot.id;
        debug!(snapshot = %id, "recorded derived snapshot");
        self.snapshots.insert(0, snapshot);
        id
    }

    pub fn relabel(&mut self, id: Uuid, label: impl Into<String>) -> Result<()> {
        let snapshot = self
            .snapshots
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or(WorkbenchError::UnknownSnapshot(id))?;
        snapshot.label = Some(label.into());
        Ok(())
    }

    /// Remove a node. Surviving children keep their parent ids; lineage
    /// display degrades to "unknown parent" rather than erroring.
    pub fn delete(&mut self, id: Uuid) -> Result<()> {
        let before = self.snapshots.len();
        self.snapshots.retain(|s| s.id != id);
        if self.snapshots.len() == before {
            return Err(WorkbenchError::UnknownSnapshot(id));
        }
        debug!(snapshot = %id, "deleted snapshot");
        Ok(())
    }

    /// Positional version: newest = highest. Recomputed on every call
    /// because deletion shifts positions.
    pub fn version_of(&self, id: Uuid) -> Option<usize> {
        self.snapshots
            .iter()
            .position(|s| s.id == id)
            .map(|index| self.snapshots.len() - index)
    }

    pub fn get(&self, id: Uuid) -> Option<&Snapshot> {
        self.snapshots.iter().find(|s| s.id == id)
    }

    /// Snapshots newest first.
    pub fn snapshots(&self) -> &[Snapshot] {
        &self.snapshots
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Drop the entire lineage atomically (workbench reset).
    pub fn clear(&mut self) {
        self.snapshots.clear();
    }

    /// Human-readable provenance, resolving parent references at render
    /// time so version numbers reflect the current list.
    pub fn describe_provenance(&self, snapshot: &Snapshot) -> String {
        match &snapshot.provenance {
            Provenance::Search {
                query, date_range, ..
            } => {
                let mut text = format!("Search: \"{}\"", query);
                if date_range.is_some() {
                    text.push_str(" (date filtered)");
                }
                text
            }
            Provenance::Filter {
                description,
                parent,
            } => format!("{} (from {})", description, self.parent_ref(*parent)),
            Provenance::Compare {
                description,
                parents,
            } => format!(
                "{} ({} vs {})",
                description,
                self.parent_ref(parents[0]),
                self.parent_ref(parents[1])
            ),
        }
    }

    fn parent_ref(&self, id: Uuid) -> String {
        match self.version_of(id) {
            Some(version) => format!("#{}", version),
            None => "unknown parent".to_string(),
        }
    }
}
