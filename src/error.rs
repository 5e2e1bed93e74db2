//! Error types for the workbench engine
//!
//! Typed errors using thiserror. Backend failures during enrichment are
//! deliberately NOT represented here: they are converted into per-cell
//! failure sentinels and a retained session message, so the rendering
//! path stays uniform. See `session::Workbench`.

use thiserror::Error;
use uuid::Uuid;

use crate::model::ColumnId;

/// Main error type for the workbench engine
#[derive(Error, Debug)]
pub enum WorkbenchError {
    /// Input rejected before any external call; no state was mutated.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The search provider failed; no partial snapshot is recorded.
    #[error("Search failed: {0}")]
    Search(String),

    #[error("Unknown column '{0}'")]
    UnknownColumn(ColumnId),

    #[error("Unknown snapshot {0}")]
    UnknownSnapshot(Uuid),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, WorkbenchError>;
