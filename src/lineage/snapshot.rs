//! Snapshot types
//!
//! An immutable, timestamped, labeled record of a row set with a typed
//! provenance link to its origin. Snapshots never change after creation;
//! relabeling replaces the label only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::Row;
use crate::search::{DateKind, DateRange};

/// How a snapshot was produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Provenance {
    /// Root node: a search against the provider. No parent.
    Search {
        query: String,
        date_range: Option<DateRange>,
        date_kind: DateKind,
    },
    /// A filtered subset of one parent snapshot.
    Filter { description: String, parent: Uuid },
    /// A set-comparison partition between two parent snapshots.
    Compare {
        description: String,
        parents: [Uuid; 2],
    },
}

impl Provenance {
    pub fn is_root(&self) -> bool {
        matches!(self, Provenance::Search { .. })
    }

    /// Parent ids, oldest-declared first. Empty for roots.
    pub fn parent_ids(&self) -> Vec<Uuid> {
        match self {
            Provenance::Search { .. } => Vec::new(),
            Provenance::Filter { parent, .. } => vec![*parent],
            Provenance::Compare { parents, .. } => parents.to_vec(),
        }
    }
}

/// A frozen row set in the lineage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub label: Option<String>,
    pub provenance: Provenance,
    /// Fully-populated rows available when the snapshot was taken.
    pub rows: Vec<Row>,
    /// Identities covered by this snapshot; may exceed `rows` when the
    /// source reported more matching ids than it returned rows for.
    pub row_ids: Vec<String>,
    /// Total matches the source reported (for roots) or the frozen set's
    /// own size (for derived nodes).
    pub total_matched: usize,
    /// Field that resolves a row's identity in this snapshot's domain.
    pub key_field: String,
}

impl Snapshot {
    /// Resolve an identity back to its row, if a populated row exists.
    pub fn row_by_id(&self, row_id: &str) -> Option<&Row> {
        self.rows
            .iter()
            .find(|row| row.identity(&self.key_field) == row_id)
    }

    /// Label when set, otherwise a short description of the provenance.
    pub fn display_label(&self) -> String {
        if let Some(label) = &self.label {
            return label.clone();
        }
        match &self.provenance {
            Provenance::Search { query, .. } => format!("Search: \"{}\"", query),
            Provenance::Filter { description, .. } => description.clone(),
            Provenance::Compare { description, .. } => description.clone(),
        }
    }
}
