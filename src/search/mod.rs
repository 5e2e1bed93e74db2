//! Search providers
//!
//! The core abstraction for pluggable study search sources. A source
//! returns a bounded page of fully-populated rows plus the complete set of
//! matching identifiers up to [`ALL_IDS_CAP`], so later set comparison can
//! cover matches whose full row data was never fetched.

mod ctgov;
mod pubmed;

pub use ctgov::ClinicalTrialsSource;
pub use pubmed::PubMedSource;

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::model::{ColumnDef, Row};

/// Upper bound on how many matching identifiers a source reports.
pub const ALL_IDS_CAP: usize = 1000;

/// Default number of fully-populated rows per search.
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Which date a range filter applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateKind {
    #[default]
    Published,
    Updated,
    Completed,
}

impl std::fmt::Display for DateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Published => write!(f, "published"),
            Self::Updated => write!(f, "updated"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

/// Inclusive date range filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

/// Search criteria for a source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchCriteria {
    /// Free-text query.
    pub query: String,
    pub date_range: Option<DateRange>,
    pub date_kind: DateKind,
    /// Maximum number of fully-populated rows to return.
    pub limit: usize,
}

impl SearchCriteria {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            date_range: None,
            date_kind: DateKind::default(),
            limit: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_date_range(mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        self.date_range = Some(DateRange { start, end });
        self
    }

    pub fn with_date_kind(mut self, kind: DateKind) -> Self {
        self.date_kind = kind;
        self
    }
}

/// One page of search results.
#[derive(Debug, Clone, Default)]
pub struct SearchPage {
    /// Fully-populated rows, at most `criteria.limit` of them.
    pub rows: Vec<Row>,
    /// Total number of matches the source reports.
    pub total_matched: usize,
    /// Matching identifiers up to [`ALL_IDS_CAP`], in source order.
    pub all_ids: Vec<String>,
}

/// Trait for pluggable study search sources.
///
/// # Implementation notes
///
/// - Implement rate limiting inside `search`
/// - Return an empty page rather than an error for "no matches"
/// - Rows must carry the field named by `key_field` so identity resolution
///   works downstream
#[async_trait]
pub trait SearchSource: Send + Sync {
    /// Unique identifier for this source (e.g. "pubmed")
    fn source_id(&self) -> &'static str;

    /// Human-readable name (e.g. "PubMed - NCBI E-utilities")
    fn source_name(&self) -> &'static str;

    /// Row field that carries the stable identity for this domain.
    fn key_field(&self) -> &'static str;

    /// Base column set for rendering this source's rows.
    fn base_columns(&self) -> Vec<ColumnDef>;

    /// Run one search.
    async fn search(&self, criteria: &SearchCriteria) -> Result<SearchPage>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_criteria_builder() {
        let criteria = SearchCriteria::new("diabetes")
            .with_limit(50)
            .with_date_kind(DateKind::Completed)
            .with_date_range(NaiveDate::from_ymd_opt(2020, 1, 1), None);

        assert_eq!(criteria.query, "diabetes");
        assert_eq!(criteria.limit, 50);
        assert_eq!(criteria.date_kind, DateKind::Completed);
        assert!(criteria.date_range.unwrap().start.is_some());
        assert!(criteria.date_range.unwrap().end.is_none());
    }

    #[test]
    fn test_date_kind_display() {
        assert_eq!(DateKind::Published.to_string(), "published");
        assert_eq!(DateKind::Updated.to_string(), "updated");
        assert_eq!(DateKind::Completed.to_string(), "completed");
    }
}
