//! In-memory mock collaborators
//!
//! Deterministic search source and inference backend used by tests and the
//! demo binary. The mock source serves slices of a fixed corpus and records
//! the limit of every request, which lets tests observe the lazy expansion
//! the enrichment pipeline performs.

use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::enrich::{InferenceBackend, InferenceRequest, RowJudgment};
use crate::model::{ColumnDef, FieldValue, Row};
use crate::search::{SearchCriteria, SearchPage, SearchSource, ALL_IDS_CAP};

/// Search source backed by a fixed row corpus.
pub struct MockSearchSource {
    corpus: Vec<Row>,
    key_field: &'static str,
    columns: Vec<ColumnDef>,
    /// Total reported to callers; defaults to the corpus size.
    total_matched: usize,
    /// Per-query corpora overriding the default, for multi-search tests.
    keyed_corpora: HashMap<String, Vec<Row>>,
    requested_limits: Mutex<Vec<usize>>,
}

impl MockSearchSource {
    pub fn new(key_field: &'static str, columns: Vec<ColumnDef>, corpus: Vec<Row>) -> Self {
        let total_matched = corpus.len();
        Self {
            corpus,
            key_field,
            columns,
            total_matched,
            keyed_corpora: HashMap::new(),
            requested_limits: Mutex::new(Vec::new()),
        }
    }

    /// Report a total larger than the corpus (an under-fetched search).
    pub fn with_total(mut self, total: usize) -> Self {
        self.total_matched = total;
        self
    }

    /// Serve a dedicated corpus for one query string.
    pub fn with_corpus_for(mut self, query: &str, corpus: Vec<Row>) -> Self {
        self.keyed_corpora.insert(query.to_string(), corpus);
        self
    }

    /// A ready-made literature corpus of `n` rows identified by `pmid`.
    pub fn literature(n: usize) -> Self {
        let corpus = (1..=n)
            .map(|i| {
                Row::new()
                    .with("pmid", FieldValue::Text(i.to_string()))
                    .with("title", FieldValue::Text(format!("Study {}", i)))
                    .with("year", FieldValue::Number(2000.0 + (i % 25) as f64))
            })
            .collect();
        let columns = vec![
            ColumnDef::base("pmid", "PMID"),
            ColumnDef::base("title", "Title"),
            ColumnDef::base("year", "Year"),
        ];
        Self::new("pmid", columns, corpus)
    }

    /// Limits of every search served so far, in order.
    pub fn requested_limits(&self) -> Vec<usize> {
        self.requested_limits.lock().unwrap().clone()
    }
}

#[async_trait]
impl SearchSource for MockSearchSource {
    fn source_id(&self) -> &'static str {
        "mock"
    }

    fn source_name(&self) -> &'static str {
        "In-memory corpus"
    }

    fn key_field(&self) -> &'static str {
        self.key_field
    }

    fn base_columns(&self) -> Vec<ColumnDef> {
        self.columns.clone()
    }

    async fn search(&self, criteria: &SearchCriteria) -> Result<SearchPage> {
        self.requested_limits.lock().unwrap().push(criteria.limit);

        let (corpus, total_matched) = match self.keyed_corpora.get(&criteria.query) {
            Some(corpus) => (corpus, corpus.len()),
            None => (&self.corpus, self.total_matched),
        };

        let rows: Vec<Row> = corpus.iter().take(criteria.limit).cloned().collect();
        let all_ids: Vec<String> = corpus
            .iter()
            .take(ALL_IDS_CAP)
            .map(|row| row.identity(self.key_field))
            .collect();

        Ok(SearchPage {
            rows,
            total_matched,
            all_ids,
        })
    }
}

/// A search source that always fails, for error-path tests.
pub struct FailingSearchSource;

#[async_trait]
impl SearchSource for FailingSearchSource {
    fn source_id(&self) -> &'static str {
        "mock-failing"
    }

    fn source_name(&self) -> &'static str {
        "Failing source"
    }

    fn key_field(&self) -> &'static str {
        "pmid"
    }

    fn base_columns(&self) -> Vec<ColumnDef> {
        vec![ColumnDef::base("pmid", "PMID")]
    }

    async fn search(&self, _criteria: &SearchCriteria) -> Result<SearchPage> {
        Err(anyhow!("connection refused"))
    }
}

/// Inference backend with scripted judgments.
#[derive(Default)]
pub struct MockInferenceBackend {
    judgments: HashMap<String, RowJudgment>,
    fail_with: Option<String>,
}

impl MockInferenceBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a boolean judgment for one row id.
    pub fn judge(mut self, id: &str, passed: bool, confidence: f64, explanation: &str) -> Self {
        self.judgments.insert(
            id.to_string(),
            RowJudgment {
                id: id.to_string(),
                passed,
                value: None,
                confidence,
                explanation: explanation.to_string(),
                text_value: None,
            },
        );
        self
    }

    /// Script a numeric score for one row id.
    pub fn score(mut self, id: &str, score: f64, confidence: f64) -> Self {
        self.judgments.insert(
            id.to_string(),
            RowJudgment {
                id: id.to_string(),
                passed: true,
                value: Some(FieldValue::Number(score)),
                confidence,
                explanation: format!("scored {}", score),
                text_value: None,
            },
        );
        self
    }

    /// Script an extracted text value for one row id.
    pub fn extract(mut self, id: &str, text: &str, confidence: f64) -> Self {
        self.judgments.insert(
            id.to_string(),
            RowJudgment {
                id: id.to_string(),
                passed: true,
                value: None,
                confidence,
                explanation: "extracted".to_string(),
                text_value: Some(text.to_string()),
            },
        );
        self
    }

    /// Make every batch call fail.
    pub fn failing(message: &str) -> Self {
        Self {
            judgments: HashMap::new(),
            fail_with: Some(message.to_string()),
        }
    }
}

#[async_trait]
impl InferenceBackend for MockInferenceBackend {
    async fn infer(&self, request: &InferenceRequest) -> Result<Vec<RowJudgment>> {
        if let Some(message) = &self.fail_with {
            return Err(anyhow!("{}", message));
        }
        Ok(request
            .items
            .iter()
            .map(|item| {
                self.judgments.get(&item.id).cloned().unwrap_or(RowJudgment {
                    id: item.id.clone(),
                    passed: false,
                    value: None,
                    confidence: 0.5,
                    explanation: "no scripted judgment".to_string(),
                    text_value: None,
                })
            })
            .collect())
    }

    fn backend_name(&self) -> &str {
        "Mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_source_slices_corpus() {
        let source = MockSearchSource::literature(50).with_total(137);
        let page = source.search(&SearchCriteria::new("x").with_limit(20)).await.unwrap();

        assert_eq!(page.rows.len(), 20);
        assert_eq!(page.total_matched, 137);
        assert_eq!(page.all_ids.len(), 50);
        assert_eq!(source.requested_limits(), vec![20]);
    }

    #[tokio::test]
    async fn test_mock_backend_scripted_and_default() {
        let backend = MockInferenceBackend::new().judge("1", true, 0.9, "match");
        let request = InferenceRequest {
            items: crate::enrich::build_items(
                &MockSearchSource::literature(2)
                    .search(&SearchCriteria::new("x").with_limit(2))
                    .await
                    .unwrap()
                    .rows,
                &[],
                "pmid",
            ),
            input_fields: vec![],
            criterion: "c".to_string(),
            output: crate::model::OutputKind::Bool,
            score_range: None,
        };

        let judgments = backend.infer(&request).await.unwrap();
        assert_eq!(judgments.len(), 2);
        assert!(judgments[0].passed);
        assert!(!judgments[1].passed);
    }
}
