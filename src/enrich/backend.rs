//! Inference backend trait
//!
//! Unified interface for AI judgment providers. One batch call per derived
//! column run; no streaming or partial results within a call.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::model::{FieldValue, OutputKind, ScoreRange};

/// One row's payload for a batch judgment call: the row identity plus the
/// requested input fields projected to JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceItem {
    pub id: String,
    pub payload: serde_json::Value,
}

/// A batch judgment request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceRequest {
    pub items: Vec<InferenceItem>,
    /// Field names included in each item's payload.
    pub input_fields: Vec<String>,
    /// Natural-language criterion the rows are judged against.
    pub criterion: String,
    pub output: OutputKind,
    /// Bounds for numeric judgments, when relevant.
    pub score_range: Option<ScoreRange>,
}

/// One row's judgment from the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowJudgment {
    pub id: String,
    /// Whether the row satisfies the criterion (boolean/number routing).
    pub passed: bool,
    /// Typed value for numeric outputs (the score).
    pub value: Option<FieldValue>,
    /// Confidence in [0, 1].
    pub confidence: f64,
    pub explanation: String,
    /// Extracted text for text outputs.
    pub text_value: Option<String>,
}

/// Unified inference backend interface.
#[async_trait]
pub trait InferenceBackend: Send + Sync {
    /// Judge every item in one batch call.
    async fn infer(&self, request: &InferenceRequest) -> Result<Vec<RowJudgment>>;

    /// Backend name for logging.
    fn backend_name(&self) -> &str;
}
