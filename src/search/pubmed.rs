//! PubMed source
//!
//! Rate-limited client for the NCBI E-utilities API: `esearch` for the
//! total count and matching PMIDs, `esummary` for the row payloads.
//!
//! # Important
//!
//! NCBI asks for a descriptive User-Agent and allows 3 requests per second
//! without an API key.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tokio::time::sleep;
use tracing::debug;
use url::Url;

use super::{DateKind, SearchCriteria, SearchPage, SearchSource, ALL_IDS_CAP};
use crate::model::{ColumnDef, FieldValue, Row};

const EUTILS_BASE_DEFAULT: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";
const RATE_LIMIT_DELAY_MS: u64 = 334; // 3 req/sec

/// PubMed E-utilities search source
pub struct PubMedSource {
    http: Client,
    base: String,
    last_request: Mutex<Instant>,
}

impl PubMedSource {
    /// Create a new source
    pub fn new() -> Result<Self> {
        let user_agent = std::env::var("STUDYBENCH_USER_AGENT")
            .unwrap_or_else(|_| "studybench/0.1 (research workbench)".to_string());
        let base =
            std::env::var("NCBI_EUTILS_BASE").unwrap_or_else(|_| EUTILS_BASE_DEFAULT.to_string());

        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(user_agent)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http,
            base,
            last_request: Mutex::new(Instant::now()),
        })
    }

    /// Enforce rate limiting
    async fn rate_limit(&self) {
        let elapsed = {
            let last = self.last_request.lock().unwrap();
            last.elapsed()
        };

        if elapsed < Duration::from_millis(RATE_LIMIT_DELAY_MS) {
            sleep(Duration::from_millis(RATE_LIMIT_DELAY_MS) - elapsed).await;
        }

        let mut last = self.last_request.lock().unwrap();
        *last = Instant::now();
    }

    /// esearch: matching PMIDs plus the total count
    async fn esearch(&self, criteria: &SearchCriteria) -> Result<EsearchResult> {
        self.rate_limit().await;

        let mut url = Url::parse(&format!("{}/esearch.fcgi", self.base))
            .context("Invalid E-utilities base URL")?;
        url.query_pairs_mut()
            .append_pair("db", "pubmed")
            .append_pair("term", &criteria.query)
            .append_pair("retmode", "json")
            .append_pair("retmax", &ALL_IDS_CAP.to_string());

        if let Some(range) = &criteria.date_range {
            url.query_pairs_mut()
                .append_pair("datetype", datetype_param(criteria.date_kind));
            if let Some(start) = range.start {
                url.query_pairs_mut()
                    .append_pair("mindate", &start.format("%Y/%m/%d").to_string());
            }
            if let Some(end) = range.end {
                url.query_pairs_mut()
                    .append_pair("maxdate", &end.format("%Y/%m/%d").to_string());
            }
        }

        let response = self
            .http
            .get(url)
            .send()
            .await
            .context("PubMed esearch request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!(
                "PubMed esearch error {}: {}",
                status,
                body.chars().take(200).collect::<String>()
            ));
        }

        let parsed: EsearchResponse = response
            .json()
            .await
            .context("Failed to parse esearch response")?;
        Ok(parsed.esearchresult)
    }

    /// esummary: row payloads for a batch of PMIDs
    async fn esummary(&self, pmids: &[String]) -> Result<Vec<Row>> {
        if pmids.is_empty() {
            return Ok(Vec::new());
        }
        self.rate_limit().await;

        let mut url = Url::parse(&format!("{}/esummary.fcgi", self.base))
            .context("Invalid E-utilities base URL")?;
        url.query_pairs_mut()
            .append_pair("db", "pubmed")
            .append_pair("id", &pmids.join(","))
            .append_pair("retmode", "json");

        let response = self
            .http
            .get(url)
            .send()
            .await
            .context("PubMed esummary request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!(
                "PubMed esummary error {}: {}",
                status,
                body.chars().take(200).collect::<String>()
            ));
        }

        // esummary keys records by uid, so this stays dynamic JSON
        let body: serde_json::Value = response
            .json()
            .await
            .context("Failed to parse esummary response")?;
        let result = body
            .get("result")
            .ok_or_else(|| anyhow!("esummary response missing 'result'"))?;

        let mut rows = Vec::with_capacity(pmids.len());
        for pmid in pmids {
            if let Some(record) = result.get(pmid) {
                rows.push(summary_to_row(pmid, record));
            }
        }
        Ok(rows)
    }
}

#[async_trait]
impl SearchSource for PubMedSource {
    fn source_id(&self) -> &'static str {
        "pubmed"
    }

    fn source_name(&self) -> &'static str {
        "PubMed - NCBI E-utilities"
    }

    fn key_field(&self) -> &'static str {
        "pmid"
    }

    fn base_columns(&self) -> Vec<ColumnDef> {
        vec![
            ColumnDef::base("pmid", "PMID"),
            ColumnDef::base("title", "Title"),
            ColumnDef::base("authors", "Authors"),
            ColumnDef::base("journal", "Journal"),
            ColumnDef::base("pubdate", "Published"),
        ]
    }

    async fn search(&self, criteria: &SearchCriteria) -> Result<SearchPage> {
        let found = self.esearch(criteria).await?;
        let total_matched: usize = found.count.parse().unwrap_or(found.idlist.len());

        let page_ids: Vec<String> = found.idlist.iter().take(criteria.limit).cloned().collect();
        let rows = self.esummary(&page_ids).await?;

        debug!(
            query = %criteria.query,
            total = total_matched,
            rows = rows.len(),
            "pubmed search complete"
        );
        Ok(SearchPage {
            rows,
            total_matched,
            all_ids: found.idlist,
        })
    }
}

fn datetype_param(kind: DateKind) -> &'static str {
    match kind {
        DateKind::Published => "pdat",
        DateKind::Updated => "mdat",
        DateKind::Completed => "edat",
    }
}

fn summary_to_row(pmid: &str, record: &serde_json::Value) -> Row {
    let text = |field: &str| -> FieldValue {
        record
            .get(field)
            .and_then(|v| v.as_str())
            .map(|s| FieldValue::Text(s.to_string()))
            .unwrap_or(FieldValue::Null)
    };

    let authors = record
        .get("authors")
        .and_then(|v| v.as_array())
        .map(|list| {
            FieldValue::List(
                list.iter()
                    .filter_map(|a| a.get("name").and_then(|n| n.as_str()))
                    .map(|n| n.to_string())
                    .collect(),
            )
        })
        .unwrap_or(FieldValue::Null);

    Row::new()
        .with("pmid", FieldValue::Text(pmid.to_string()))
        .with("title", text("title"))
        .with("authors", authors)
        .with("journal", text("fulljournalname"))
        .with("pubdate", text("pubdate"))
}

#[derive(Debug, Deserialize)]
struct EsearchResponse {
    esearchresult: EsearchResult,
}

#[derive(Debug, Deserialize)]
struct EsearchResult {
    /// Total match count; NCBI returns it as a string.
    count: String,
    #[serde(default)]
    idlist: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_datetype_param() {
        assert_eq!(datetype_param(DateKind::Published), "pdat");
        assert_eq!(datetype_param(DateKind::Updated), "mdat");
        assert_eq!(datetype_param(DateKind::Completed), "edat");
    }

    #[test]
    fn test_summary_to_row() {
        let record = json!({
            "title": "Metformin and cardiovascular outcomes",
            "fulljournalname": "The Lancet",
            "pubdate": "2024 Mar",
            "authors": [{"name": "Okafor C"}, {"name": "Lindqvist A"}]
        });
        let row = summary_to_row("38012345", &record);

        assert_eq!(row.identity("pmid"), "38012345");
        assert_eq!(
            row.get("authors"),
            Some(&FieldValue::List(vec![
                "Okafor C".to_string(),
                "Lindqvist A".to_string()
            ]))
        );
        assert_eq!(
            row.get("journal"),
            Some(&FieldValue::Text("The Lancet".to_string()))
        );
    }

    #[test]
    fn test_summary_to_row_handles_missing_fields() {
        let row = summary_to_row("1", &json!({}));
        assert_eq!(row.get("title"), Some(&FieldValue::Null));
        assert_eq!(row.identity("pmid"), "1");
    }

    #[test]
    fn test_esearch_response_shape() {
        let parsed: EsearchResponse = serde_json::from_value(json!({
            "esearchresult": {"count": "137", "idlist": ["1", "2"]}
        }))
        .unwrap();
        assert_eq!(parsed.esearchresult.count, "137");
        assert_eq!(parsed.esearchresult.idlist.len(), 2);
    }
}
