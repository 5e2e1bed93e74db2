//! Column definitions
//!
//! Base columns read a row field directly; derived columns are populated
//! asynchronously by the inference backend, scoped by a natural-language
//! criterion. Column ids are unique and stable for the session.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable column identifier.
///
/// Base ids are caller-supplied (conventionally the accessor); derived ids
/// are generated and never collide within a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnId(String);

impl ColumnId {
    /// Generate a fresh id for a derived column.
    pub fn generate() -> Self {
        ColumnId(format!("derived-{}", Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ColumnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ColumnId {
    fn from(s: &str) -> Self {
        ColumnId(s.to_string())
    }
}

impl From<String> for ColumnId {
    fn from(s: String) -> Self {
        ColumnId(s)
    }
}

/// Whether a column reads a row field or holds inferred values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnKind {
    Base,
    Derived,
}

/// Output type a derived column asks the inference backend for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    /// Yes/No judgment against the criterion.
    Bool,
    /// Numeric score, optionally bounded by a [`ScoreRange`].
    Number,
    /// Free-text extraction.
    Text,
}

/// Inclusive bounds for numeric judgments.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreRange {
    pub min: f64,
    pub max: f64,
}

/// Specification of a derived column's inference task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedSpec {
    /// Natural-language criterion, e.g. "Is this about type 2 diabetes?"
    pub criterion: String,
    /// Row fields fed to the backend as the judgment payload.
    pub input_fields: Vec<String>,
    pub output: OutputKind,
    /// Whether the rendering layer should show explanation/confidence.
    pub show_explanation: bool,
    pub score_range: Option<ScoreRange>,
}

/// One column of the workbench table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub id: ColumnId,
    pub label: String,
    /// Row field read for base columns; unused for derived columns.
    pub accessor: String,
    pub kind: ColumnKind,
    pub visible: bool,
    pub derived: Option<DerivedSpec>,
}

impl ColumnDef {
    /// A base column whose id doubles as its accessor.
    pub fn base(accessor: impl Into<String>, label: impl Into<String>) -> Self {
        let accessor = accessor.into();
        Self {
            id: ColumnId::from(accessor.clone()),
            label: label.into(),
            accessor,
            kind: ColumnKind::Base,
            visible: true,
            derived: None,
        }
    }

    /// A derived column with a freshly generated id.
    pub fn derived(label: impl Into<String>, spec: DerivedSpec) -> Self {
        Self {
            id: ColumnId::generate(),
            label: label.into(),
            accessor: String::new(),
            kind: ColumnKind::Derived,
            visible: true,
            derived: Some(spec),
        }
    }

    pub fn is_derived(&self) -> bool {
        self.kind == ColumnKind::Derived
    }

    /// Whether sorting on this column compares numerically.
    pub fn is_numeric(&self) -> bool {
        match (&self.kind, &self.derived) {
            (ColumnKind::Derived, Some(spec)) => spec.output == OutputKind::Number,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bool_spec() -> DerivedSpec {
        DerivedSpec {
            criterion: "Is this a randomized trial?".to_string(),
            input_fields: vec!["title".to_string(), "abstract".to_string()],
            output: OutputKind::Bool,
            show_explanation: false,
            score_range: None,
        }
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let a = ColumnId::generate();
        let b = ColumnId::generate();
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("derived-"));
    }

    #[test]
    fn test_base_column_id_is_accessor() {
        let col = ColumnDef::base("title", "Title");
        assert_eq!(col.id, ColumnId::from("title"));
        assert_eq!(col.accessor, "title");
        assert!(col.visible);
        assert!(!col.is_derived());
    }

    #[test]
    fn test_derived_column_carries_spec() {
        let col = ColumnDef::derived("RCT?", bool_spec());
        assert!(col.is_derived());
        assert!(!col.is_numeric());
        assert_eq!(col.derived.as_ref().unwrap().output, OutputKind::Bool);
    }

    #[test]
    fn test_numeric_detection() {
        let mut spec = bool_spec();
        spec.output = OutputKind::Number;
        spec.score_range = Some(ScoreRange { min: 0.0, max: 10.0 });
        let col = ColumnDef::derived("Relevance", spec);
        assert!(col.is_numeric());
    }
}
