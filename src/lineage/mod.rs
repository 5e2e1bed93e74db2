//! Snapshot lineage: provenance-tracked dataset history and set comparison.

mod compare;
mod snapshot;
mod tracker;

pub use compare::{compare, Partition, SnapshotDiff};
pub use snapshot::{Provenance, Snapshot};
pub use tracker::LineageTracker;
