//! ClinicalTrials.gov source
//!
//! Client for the ClinicalTrials.gov v2 study API. One request fetches the
//! full row page with the total count; a second id-only request widens the
//! identifier set for later comparison.

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

const CTGOV_BASE_DEFAULT: &str = "https://clinicaltrials.gov/api/v2";
const RATE_LIMIT_DELAY_MS: u64 = 200;

/// ClinicalTrials.gov v2 search source
pub struct ClinicalTrialsSource {
    http: Client,
    base: String,
    last_request: Mutex<Instant>,
}

impl ClinicalTrialsSource {
    /// Create a new source
    pub fn new() -> Result<Self> {
        let user_agent = std::env::var("STUDYBENCH_USER_AGENT")
            .unwrap_or_else(|_| "studybench/0.1 (research workbench)".to_string());
        let base =
            std::env::var("CTGOV_API_BASE").unwrap_or_else(|_| CTGOV_BASE_DEFAULT.to_string());

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

    async fn studies(&self, criteria: &SearchCriteria, page_size: usize, ids_only: bool) -> Result<StudiesResponse> {
        self.rate_limit().await;

        let mut url =
            Url::parse(&format!("{}/studies", self.base)).context("Invalid ClinicalTrials base URL")?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("query.term", &build_term(criteria))
                .append_pair("pageSize", &page_size.to_string())
                .append_pair("countTotal", "true");
            if ids_only {
                pairs.append_pair("fields", "NCTId");
            }
        }

        let response = self
            .http
            .get(url)
            .send()
            .await
            .context("ClinicalTrials request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!(
                "ClinicalTrials API error {}: {}",
                status,
                body.chars().take(200).collect::<String>()
            ));
        }

        response
            .json()
            .await
            .context("Failed to parse ClinicalTrials response")
    }
}

#[async_trait]
impl SearchSource for ClinicalTrialsSource {
    fn source_id(&self) -> &'static str {
        "ctgov"
    }

    fn source_name(&self) -> &'static str {
        "ClinicalTrials.gov v2"
    }

    fn key_field(&self) -> &'static str {
        "nct_id"
    }

    fn base_columns(&self) -> Vec<ColumnDef> {
        vec![
            ColumnDef::base("nct_id", "NCT ID"),
            ColumnDef::base("title", "Title"),
            ColumnDef::base("status", "Status"),
            ColumnDef::base("conditions", "Conditions"),
            ColumnDef::base("start_date", "Start"),
            ColumnDef::base("completion_date", "Completion"),
        ]
    }

    async fn search(&self, criteria: &SearchCriteria) -> Result<SearchPage> {
        let page = self.studies(criteria, criteria.limit, false).await?;
        let rows: Vec<Row> = page.studies.iter().map(study_to_row).collect();
        let total_matched = page.total_count.unwrap_or(rows.len());

        // Widen the id set beyond the row page for set comparison
        let ids = self.studies(criteria, ALL_IDS_CAP, true).await?;
        let all_ids: Vec<String> = ids
            .studies
            .iter()
            .filter_map(|s| s.protocol_section.identification_module.nct_id.clone())
            .collect();

        debug!(
            query = %criteria.query,
            total = total_matched,
            rows = rows.len(),
            "clinicaltrials search complete"
        );
        Ok(SearchPage {
            rows,
            total_matched,
            all_ids,
        })
    }
}

/// Combine the free-text query with a date-area filter when present.
fn build_term(criteria: &SearchCriteria) -> String {
    let Some(range) = &criteria.date_range else {
        return criteria.query.clone();
    };
    let area = match criteria.date_kind {
        DateKind::Published | DateKind::Updated => "LastUpdatePostDate",
        DateKind::Completed => "CompletionDate",
    };
    let start = range
        .start
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "MIN".to_string());
    let end = range
        .end
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "MAX".to_string());
    format!(
        "{} AND AREA[{}]RANGE[{},{}]",
        criteria.query, area, start, end
    )
}

fn study_to_row(study: &Study) -> Row {
    let ident = &study.protocol_section.identification_module;
    let status = &study.protocol_section.status_module;
    let conditions = study
        .protocol_section
        .conditions_module
        .as_ref()
        .map(|m| FieldValue::List(m.conditions.clone()))
        .unwrap_or(FieldValue::Null);

    let text = |value: &Option<String>| -> FieldValue {
        value
            .as_ref()
            .map(|s| FieldValue::Text(s.clone()))
            .unwrap_or(FieldValue::Null)
    };

    Row::new()
        .with("nct_id", text(&ident.nct_id))
        .with("title", text(&ident.brief_title))
        .with("status", text(&status.overall_status))
        .with("conditions", conditions)
        .with(
            "start_date",
            text(&status.start_date_struct.as_ref().and_then(|d| d.date.clone())),
        )
        .with(
            "completion_date",
            text(
                &status
                    .completion_date_struct
                    .as_ref()
                    .and_then(|d| d.date.clone()),
            ),
        )
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StudiesResponse {
    #[serde(default)]
    studies: Vec<Study>,
    total_count: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Study {
    protocol_section: ProtocolSection,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProtocolSection {
    identification_module: IdentificationModule,
    #[serde(default)]
    status_module: StatusModule,
    conditions_module: Option<ConditionsModule>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IdentificationModule {
    nct_id: Option<String>,
    brief_title: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusModule {
    overall_status: Option<String>,
    start_date_struct: Option<DateStruct>,
    completion_date_struct: Option<DateStruct>,
}

#[derive(Debug, Deserialize)]
struct DateStruct {
    date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ConditionsModule {
    #[serde(default)]
    conditions: Vec<String>,
}
