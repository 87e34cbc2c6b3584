use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::availability::AvailabilityReport;
use crate::cache::CacheError;
use crate::provider::RawResult;
use crate::query::{Query, QueryError};
use crate::ranking::{RankStats, RankedResult};
use crate::scraper::{ProviderReport, ScrapeError};

/// Errors from building or running the aggregation pipeline.
#[derive(Debug, Error)]
pub enum AggregateError {
    #[error("Invalid query: {0}")]
    InvalidQuery(#[from] QueryError),

    #[error("No providers enabled")]
    NoProviders,

    #[error("Provider setup failed: {0}")]
    ProviderSetup(String),

    #[error("Availability service setup failed: {0}")]
    ServiceSetup(String),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),
}

impl AggregateError {
    /// Label for the aggregation duration metric.
    pub fn metric_label(&self) -> &'static str {
        match self {
            AggregateError::InvalidQuery(_) => "invalid_query",
            AggregateError::NoProviders => "no_providers",
            _ => "error",
        }
    }
}

impl From<ScrapeError> for AggregateError {
    fn from(err: ScrapeError) -> Self {
        match err {
            ScrapeError::InvalidQuery(e) => AggregateError::InvalidQuery(e),
            ScrapeError::NoProviders => AggregateError::NoProviders,
        }
    }
}

/// Output of one aggregation request.
///
/// `raw_results` and `availability` are kept so the list can be re-ranked
/// with different filters without scraping again.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregationResult {
    /// Correlates this result with the request's log lines.
    pub request_id: String,
    pub query: Query,
    pub ranked: Vec<RankedResult>,
    pub raw_results: Vec<RawResult>,
    pub availability: AvailabilityReport,
    pub reports: Vec<ProviderReport>,
    pub stats: RankStats,
    /// True when the scrape deadline cut providers off.
    pub deadline_hit: bool,
    pub duration_ms: u64,
}
