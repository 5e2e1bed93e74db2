//! Core data model: rows, field values, and column definitions.

mod column;
mod row;

pub use column::{ColumnDef, ColumnId, ColumnKind, DerivedSpec, OutputKind, ScoreRange};
pub use row::{FieldValue, Row};
