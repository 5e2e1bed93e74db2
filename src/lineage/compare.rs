//! Set comparison
//!
//! Partition two snapshots' identity sets into only-A, only-B, and both,
//! resolving ids back to row objects through each snapshot's own row store.
//! Identity-based, not full-row equality: the same entity re-fetched with
//! richer fields still lands in `both`.

use std::collections::HashSet;

use super::snapshot::Snapshot;
use crate::model::Row;

/// One side of a comparison result.
#[derive(Debug, Clone, Default)]
pub struct Partition {
    /// Identities in this partition, in first-snapshot order.
    pub ids: Vec<String>,
    /// Rows resolved for those identities; ids without a populated row in
    /// either snapshot are counted in `ids` but have no row here.
    pub rows: Vec<Row>,
}

impl Partition {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Full comparison result between two snapshots.
#[derive(Debug, Clone, Default)]
pub struct SnapshotDiff {
    pub only_a: Partition,
    pub only_b: Partition,
    pub both: Partition,
}

/// Compare two snapshots by identity-set membership.
pub fn compare(a: &Snapshot, b: &Snapshot) -> SnapshotDiff {
    let ids_a: HashSet<&str> = a.row_ids.iter().map(String::as_str).collect();
    let ids_b: HashSet<&str> = b.row_ids.iter().map(String::as_str).collect();

    let mut diff = SnapshotDiff::default();

    for id in &a.row_ids {
        if ids_b.contains(id.as_str()) {
            push(&mut diff.both, id, a.row_by_id(id).or_else(|| b.row_by_id(id)));
        } else {
            push(&mut diff.only_a, id, a.row_by_id(id));
        }
    }
    for id in &b.row_ids {
        if !ids_a.contains(id.as_str()) {
            push(&mut diff.only_b, id, b.row_by_id(id));
        }
    }

    diff
}

fn push(partition: &mut Partition, id: &str, row: Option<&Row>) {
    partition.ids.push(id.to_string());
    if let Some(row) = row {
        partition.rows.push(row.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lineage::snapshot::Provenance;
    use crate::model::FieldValue;
    use crate::search::DateKind;
    use chrono::Utc;
    use uuid::Uuid;

    fn snapshot(ids: &[&str], populated: &[&str]) -> Snapshot {
        Snapshot {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            label: None,
            provenance: Provenance::Search {
                query: "q".to_string(),
                date_range: None,
                date_kind: DateKind::Published,
            },
            rows: populated
                .iter()
                .map(|id| Row::new().with("pmid", FieldValue::Text(id.to_string())))
                .collect(),
            row_ids: ids.iter().map(|id| id.to_string()).collect(),
            total_matched: ids.len(),
            key_field: "pmid".to_string(),
        }
    }

    #[test]
    fn test_partitions() {
        let a = snapshot(&["1", "2", "3"], &["1", "2", "3"]);
        let b = snapshot(&["2", "3", "4"], &["2", "3", "4"]);

        let diff = compare(&a, &b);
        assert_eq!(diff.only_a.ids, vec!["1"]);
        assert_eq!(diff.only_b.ids, vec!["4"]);
        assert_eq!(diff.both.ids, vec!["2", "3"]);
        assert_eq!(diff.both.rows.len(), 2);
    }

    #[test]
    fn test_partitions_cover_union_and_are_disjoint() {
        let a = snapshot(&["1", "2", "3", "5"], &[]);
        let b = snapshot(&["2", "4"], &[]);

        let diff = compare(&a, &b);
        let mut union: Vec<&str> = diff
            .only_a
            .ids
            .iter()
            .chain(&diff.only_b.ids)
            .chain(&diff.both.ids)
            .map(String::as_str)
            .collect();
        union.sort_unstable();
        assert_eq!(union, vec!["1", "2", "3", "4", "5"]);

        let set_a: HashSet<&String> = diff.only_a.ids.iter().collect();
        let set_b: HashSet<&String> = diff.only_b.ids.iter().collect();
        let set_both: HashSet<&String> = diff.both.ids.iter().collect();
        assert!(set_a.is_disjoint(&set_b));
        assert!(set_a.is_disjoint(&set_both));
        assert!(set_b.is_disjoint(&set_both));
    }

    #[test]
    fn test_both_falls_back_to_other_store() {
        // "2" is shared but only b holds its populated row
        let a = snapshot(&["1", "2"], &["1"]);
        let b = snapshot(&["2"], &["2"]);

        let diff = compare(&a, &b);
        assert_eq!(diff.both.ids, vec!["2"]);
        assert_eq!(diff.both.rows.len(), 1);
        assert_eq!(diff.both.rows[0].identity("pmid"), "2");
    }

    #[test]
    fn test_unpopulated_ids_still_counted() {
        let a = snapshot(&["1", "2"], &["1"]);
        let b = snapshot(&[], &[]);

        let diff = compare(&a, &b);
        assert_eq!(diff.only_a.len(), 2);
        assert_eq!(diff.only_a.rows.len(), 1);
        assert!(diff.only_b.is_empty());
    }
}
