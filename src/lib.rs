//! studybench
//!
//! Interactive workbench engine for exploring literature/trial search
//! results as tables: AI-derived columns populated asynchronously by an
//! inference backend, sorted/filtered views computed without mutating the
//! dataset, and a provenance-tracked lineage of derived snapshots with
//! set comparison between any two of them.
//!
//! Everything is ephemeral, in-memory, and single-writer: one
//! [`session::Workbench`] per session owns all shared state.
//!
//! # Architecture
//!
//! - [`model`] - rows, field values, column definitions
//! - [`registry`] / [`store`] / [`resolve`] - columns, derived cells, and
//!   per-cell value resolution
//! - [`view`] - the pure sort/filter pipeline
//! - [`enrich`] - the batch inference pipeline and backends
//! - [`search`] - pluggable search sources
//! - [`lineage`] - snapshot history, provenance, set comparison
//! - [`engine`] / [`session`] - the table engine and the caller facade

pub mod engine;
pub mod enrich;
pub mod error;
pub mod export;
pub mod lineage;
pub mod mock;
pub mod model;
pub mod registry;
pub mod resolve;
pub mod search;
pub mod session;
pub mod store;
pub mod view;

pub use engine::TableEngine;
pub use enrich::{AnthropicJudge, DerivedColumnRequest, InferenceBackend};
pub use error::{Result, WorkbenchError};
pub use lineage::{LineageTracker, Provenance, Snapshot, SnapshotDiff};
pub use model::{ColumnDef, ColumnId, FieldValue, OutputKind, Row};
pub use search::{ClinicalTrialsSource, PubMedSource, SearchCriteria, SearchSource};
pub use session::{LineageEntry, PartitionKind, Workbench};
pub use store::ColumnPhase;
pub use view::{SortDirection, TriState};
