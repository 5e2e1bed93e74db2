//! Row model
//!
//! Rows are free-form records keyed by arbitrary accessor strings, with a
//! closed value type validated once at ingestion. A row's identity is the
//! display string of a configured key field and never changes, even when
//! the same underlying entity is re-fetched with richer fields.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A single row field value.
///
/// JSON coming back from search providers is coerced into this closed set
/// at ingestion so the rest of the engine never touches raw `serde_json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    /// Multi-valued fields (authors, conditions, MeSH terms).
    List(Vec<String>),
}

impl FieldValue {
    /// Coerce an arbitrary JSON value into the closed field set.
    ///
    /// Arrays become lists of display strings; objects have no tabular
    /// rendering and collapse to `Null`.
    pub fn from_json(value: &serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null | Value::Object(_) => FieldValue::Null,
            Value::Bool(b) => FieldValue::Bool(*b),
            Value::Number(n) => n.as_f64().map(FieldValue::Number).unwrap_or(FieldValue::Null),
            Value::String(s) => FieldValue::Text(s.clone()),
            Value::Array(items) => FieldValue::List(
                items
                    .iter()
                    .map(|item| match item {
                        Value::String(s) => s.clone(),
                        other => FieldValue::from_json(other).display(),
                    })
                    .collect(),
            ),
        }
    }

    /// Display string for filtering, sorting and export.
    ///
    /// Lists join comma-separated, which is lossy for sorting purposes;
    /// sorting operates on the joined string, not list semantics.
    pub fn display(&self) -> String {
        match self {
            FieldValue::Null => String::new(),
            FieldValue::Bool(b) => b.to_string(),
            FieldValue::Number(n) => format_number(*n),
            FieldValue::Text(s) => s.clone(),
            FieldValue::List(items) => items.join(", "),
        }
    }

    /// Numeric view of the value, if it has one.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }
}

/// Render a float without a trailing `.0` when it is integral.
fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// One unit of tabular data (an article, a trial).
///
/// Immutable once ingested: mutation happens by replacing the dataset,
/// never by editing rows in place.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Row {
    fields: BTreeMap<String, FieldValue>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style field setter, used heavily by tests and mocks.
    pub fn with(mut self, name: impl Into<String>, value: FieldValue) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    /// Ingest a JSON object as a row. Non-object input yields an empty row.
    pub fn from_json(value: &serde_json::Value) -> Self {
        let mut fields = BTreeMap::new();
        if let serde_json::Value::Object(map) = value {
            for (name, raw) in map {
                fields.insert(name.clone(), FieldValue::from_json(raw));
            }
        }
        Self { fields }
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    /// Resolve the row's stable identity from the configured key field.
    ///
    /// Never fails: a missing or null key field resolves to the empty
    /// string. Two rows are the same entity iff their identities are equal,
    /// regardless of any other field differences.
    pub fn identity(&self, key_field: &str) -> String {
        match self.fields.get(key_field) {
            None | Some(FieldValue::Null) => String::new(),
            Some(value) => value.display(),
        }
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_identity_from_key_field() {
        let row = Row::new().with("pmid", FieldValue::Text("12345".to_string()));
        assert_eq!(row.identity("pmid"), "12345");
    }

    #[test]
    fn test_identity_missing_or_null_is_empty() {
        let row = Row::new().with("pmid", FieldValue::Null);
        assert_eq!(row.identity("pmid"), "");
        assert_eq!(row.identity("nct_id"), "");
    }

    #[test]
    fn test_identity_stable_across_field_differences() {
        let sparse = Row::new().with("pmid", FieldValue::Number(42.0));
        let rich = Row::new()
            .with("pmid", FieldValue::Number(42.0))
            .with("title", FieldValue::Text("Expanded record".to_string()));
        assert_eq!(sparse.identity("pmid"), rich.identity("pmid"));
        assert_eq!(sparse.identity("pmid"), "42");
    }

    #[test]
    fn test_from_json_coercion() {
        let row = Row::from_json(&json!({
            "pmid": 123,
            "title": "Metformin outcomes",
            "authors": ["Ahn J", "Rivera M", 7],
            "published": null,
            "meta": {"nested": true},
            "active": false
        }));

        assert_eq!(row.get("pmid"), Some(&FieldValue::Number(123.0)));
        assert_eq!(
            row.get("authors"),
            Some(&FieldValue::List(vec![
                "Ahn J".to_string(),
                "Rivera M".to_string(),
                "7".to_string()
            ]))
        );
        assert_eq!(row.get("published"), Some(&FieldValue::Null));
        // Objects have no tabular rendering
        assert_eq!(row.get("meta"), Some(&FieldValue::Null));
        assert_eq!(row.get("active"), Some(&FieldValue::Bool(false)));
    }

    #[test]
    fn test_display_forms() {
        assert_eq!(FieldValue::Null.display(), "");
        assert_eq!(FieldValue::Bool(true).display(), "true");
        assert_eq!(FieldValue::Number(3.0).display(), "3");
        assert_eq!(FieldValue::Number(2.5).display(), "2.5");
        assert_eq!(
            FieldValue::List(vec!["a".to_string(), "b".to_string()]).display(),
            "a, b"
        );
    }
}
