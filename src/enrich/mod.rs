//! Derived column enrichment
//!
//! The async pipeline that populates derived columns: project rows to
//! judgment payloads, submit one batch to the inference backend, map the
//! returned judgments to display values. The orchestration itself (column
//! registration, optional dataset expansion, phase transitions) lives in
//! `session::Workbench`; this module holds the pipeline's pure pieces.

mod anthropic;
mod backend;

pub use anthropic::AnthropicJudge;
pub use backend::{InferenceBackend, InferenceItem, InferenceRequest, RowJudgment};

use std::collections::HashSet;

use serde_json::json;
use tracing::debug;

use crate::model::{ColumnId, DerivedSpec, FieldValue, OutputKind, Row};
use crate::store::{DerivedCell, DerivedValueStore};

/// Caller-facing request to add a derived column.
#[derive(Debug, Clone)]
pub struct DerivedColumnRequest {
    pub label: String,
    pub criterion: String,
    pub input_fields: Vec<String>,
    pub output: OutputKind,
    pub score_range: Option<crate::model::ScoreRange>,
}

impl DerivedColumnRequest {
    pub fn new(label: impl Into<String>, criterion: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            criterion: criterion.into(),
            input_fields: Vec::new(),
            output: OutputKind::Bool,
            score_range: None,
        }
    }

    pub fn with_input_fields(mut self, fields: &[&str]) -> Self {
        self.input_fields = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn with_output(mut self, output: OutputKind) -> Self {
        self.output = output;
        self
    }

    pub fn with_score_range(mut self, min: f64, max: f64) -> Self {
        self.score_range = Some(crate::model::ScoreRange { min, max });
        self
    }

    pub fn into_spec(self) -> (String, DerivedSpec) {
        (
            self.label,
            DerivedSpec {
                criterion: self.criterion,
                input_fields: self.input_fields,
                output: self.output,
                show_explanation: false,
                score_range: self.score_range,
            },
        )
    }
}

/// Project rows to batch payload items, keeping only the requested fields.
///
/// Rows whose identity resolves empty are skipped: the backend could not
/// address them in its response.
pub fn build_items(rows: &[Row], input_fields: &[String], key_field: &str) -> Vec<InferenceItem> {
    rows.iter()
        .filter_map(|row| {
            let id = row.identity(key_field);
            if id.is_empty() {
                return None;
            }
            let mut payload = serde_json::Map::new();
            for field in input_fields {
                let value = row
                    .get(field)
                    .map(|v| serde_json::to_value(v).unwrap_or(serde_json::Value::Null))
                    .unwrap_or(serde_json::Value::Null);
                payload.insert(field.clone(), value);
            }
            Some(InferenceItem {
                id,
                payload: json!(payload),
            })
        })
        .collect()
}

/// Map one judgment to the cell value shown in the table.
pub fn display_value(judgment: &RowJudgment, output: OutputKind) -> FieldValue {
    match output {
        OutputKind::Bool => {
            FieldValue::Text(if judgment.passed { "Yes" } else { "No" }.to_string())
        }
        OutputKind::Number => judgment
            .value
            .as_ref()
            .and_then(FieldValue::as_number)
            .map(FieldValue::Number)
            .unwrap_or(FieldValue::Null),
        OutputKind::Text => {
            let text = judgment
                .text_value
                .clone()
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| judgment.explanation.clone());
            FieldValue::Text(text)
        }
    }
}

/// Store a batch's judgments.
///
/// Only rows that were part of the submitted batch are ever written; a
/// judgment for an unknown id is dropped. Confidence and explanation are
/// retained independent of the display value.
pub fn ingest_judgments(
    store: &mut DerivedValueStore,
    column: &ColumnId,
    output: OutputKind,
    submitted_ids: &[String],
    judgments: &[RowJudgment],
) -> usize {
    let submitted: HashSet<&str> = submitted_ids.iter().map(String::as_str).collect();
    let mut stored = 0;
    for judgment in judgments {
        if !submitted.contains(judgment.id.as_str()) {
            debug!(column = %column, id = %judgment.id, "dropping judgment for unsubmitted row");
            continue;
        }
        store.insert(
            column.clone(),
            judgment.id.clone(),
            DerivedCell::Judged {
                value: display_value(judgment, output),
                confidence: judgment.confidence.clamp(0.0, 1.0),
                explanation: judgment.explanation.clone(),
                text_value: judgment.text_value.clone(),
            },
        );
        stored += 1;
    }
    stored
}
