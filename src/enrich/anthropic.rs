//! Anthropic judge
//!
//! Inference backend implementation for the Anthropic Claude API. Builds a
//! single batch judgment prompt from the row payloads and the criterion,
//! demands a JSON array back, and repairs markdown-fenced output before
//! parsing.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use tracing::debug;

use super::backend::{InferenceBackend, InferenceRequest, RowJudgment};
use crate::model::{FieldValue, OutputKind};

/// Default Anthropic model
const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

const API_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";

/// Anthropic Claude judgment backend
#[derive(Clone)]
pub struct AnthropicJudge {
    api_key: String,
    client: reqwest::Client,
    model: String,
}

impl AnthropicJudge {
    /// Create a new judge with the given API key
    pub fn new(api_key: String) -> Self {
        let model = std::env::var("ANTHROPIC_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        Self {
            api_key,
            client: reqwest::Client::new(),
            model,
        }
    }

    /// Create with a specific model
    pub fn with_model(api_key: String, model: &str) -> Self {
        Self {
            api_key,
            client: reqwest::Client::new(),
            model: model.to_string(),
        }
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("ANTHROPIC_API_KEY")
            .map_err(|_| anyhow!("ANTHROPIC_API_KEY environment variable not set"))?;
        Ok(Self::new(api_key))
    }

    async fn call_api(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let response = self
            .client
            .post(API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .json(&serde_json::json!({
                "model": &self.model,
                "max_tokens": 8192,
                "system": system_prompt,
                "messages": [{"role": "user", "content": user_prompt}]
            }))
            .send()
            .await
            .context("Anthropic request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Anthropic API error {}: {}", status, body));
        }

        #[derive(Deserialize)]
        struct ContentBlock {
            text: Option<String>,
        }
        #[derive(Deserialize)]
        struct ApiResponse {
            content: Vec<ContentBlock>,
        }

        let api_response: ApiResponse = response.json().await?;
        api_response
            .content
            .first()
            .and_then(|c| c.text.clone())
            .ok_or_else(|| anyhow!("Empty response from Anthropic"))
    }
}

#[async_trait]
impl InferenceBackend for AnthropicJudge {
    async fn infer(&self, request: &InferenceRequest) -> Result<Vec<RowJudgment>> {
        let system_prompt = build_system_prompt(request);
        let user_prompt = build_user_prompt(request)?;

        debug!(
            model = %self.model,
            items = request.items.len(),
            "submitting judgment batch"
        );
        let content = self.call_api(&system_prompt, &user_prompt).await?;
        let raw = parse_json_array_with_repair(&content)?;
        Ok(raw.into_iter().map(RawJudgment::into_judgment).collect())
    }

    fn backend_name(&self) -> &str {
        "Anthropic"
    }
}

fn build_system_prompt(request: &InferenceRequest) -> String {
    let task = match request.output {
        OutputKind::Bool => {
            "For each record decide whether it satisfies the criterion. \
             Set \"passed\" to true or false."
        }
        OutputKind::Number => {
            "For each record produce a numeric score for the criterion in \
             the \"value\" field, and set \"passed\" to whether the record \
             satisfies the criterion at all."
        }
        OutputKind::Text => {
            "For each record extract the text the criterion asks for into \
             the \"text_value\" field. Leave it empty when nothing applies."
        }
    };
    let range = match request.score_range {
        Some(r) => format!(" Scores must lie within [{}, {}].", r.min, r.max),
        None => String::new(),
    };
    format!(
        "You are a careful literature screening assistant. You receive a JSON \
         array of records and a criterion.\n{}{}\nRespond with a JSON array only, \
         one object per record: {{\"id\", \"passed\", \"value\", \"confidence\", \
         \"explanation\", \"text_value\"}}. \"confidence\" is a number between 0 \
         and 1. No markdown code blocks, no prose outside the JSON.",
        task, range
    )
}

fn build_user_prompt(request: &InferenceRequest) -> Result<String> {
    let records = serde_json::to_string_pretty(
        &request
            .items
            .iter()
            .map(|item| {
                serde_json::json!({
                    "id": item.id,
                    "fields": item.payload,
                })
            })
            .collect::<Vec<_>>(),
    )?;
    Ok(format!(
        "Criterion: {}\n\nRecords:\n{}",
        request.criterion, records
    ))
}

/// Judgment as the model returns it, before validation.
#[derive(Debug, Deserialize)]
struct RawJudgment {
    id: serde_json::Value,
    #[serde(default)]
    passed: bool,
    #[serde(default)]
    value: Option<serde_json::Value>,
    #[serde(default)]
    confidence: f64,
    #[serde(default)]
    explanation: String,
    #[serde(default)]
    text_value: Option<String>,
}

impl RawJudgment {
    fn into_judgment(self) -> RowJudgment {
        // Models sometimes echo numeric ids as numbers
        let id = match &self.id {
            serde_json::Value::String(s) => s.clone(),
            other => FieldValue::from_json(other).display(),
        };
        RowJudgment {
            id,
            passed: self.passed,
            value: self.value.as_ref().map(FieldValue::from_json),
            confidence: self.confidence.clamp(0.0, 1.0),
            explanation: self.explanation,
            text_value: self.text_value.filter(|t| !t.is_empty()),
        }
    }
}

/// Parse a JSON array with repair attempts for common LLM issues.
fn parse_json_array_with_repair(content: &str) -> Result<Vec<RawJudgment>> {
    // Try direct parse first
    if let Ok(v) = serde_json::from_str(content) {
        return Ok(v);
    }

    // Try extracting JSON from a markdown code block
    let json_block_re = Regex::new(r"```(?:json)?\s*([\s\S]*?)\s*```").unwrap();
    if let Some(caps) = json_block_re.captures(content) {
        if let Ok(v) = serde_json::from_str(&caps[1]) {
            debug!("extracted JSON from markdown code block");
            return Ok(v);
        }
    }

    // Try the outermost bracketed slice
    if let (Some(start), Some(end)) = (content.find('['), content.rfind(']')) {
        if start < end {
            if let Ok(v) = serde_json::from_str(&content[start..=end]) {
                debug!("extracted JSON from bracketed slice");
                return Ok(v);
            }
        }
    }

    Err(anyhow!(
        "Could not parse judgment array from response: {}",
        content.chars().take(200).collect::<String>()
    ))
}
