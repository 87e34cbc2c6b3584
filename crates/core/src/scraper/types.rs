use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::CacheConfig;
use crate::provider::RawResult;
use crate::query::{MediaKind, Query, QueryError};

/// Errors that abort a scrape before any provider is called.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ScrapeError {
    #[error("Invalid query: {0}")]
    InvalidQuery(#[from] QueryError),

    #[error("No providers enabled")]
    NoProviders,
}

/// What happened to one provider during a scrape.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProviderStatus {
    /// Fresh result cache rows were used; no network call.
    CacheHit,
    /// The provider answered in time.
    Fetched,
    /// The provider returned an error.
    Failed,
    /// The per-provider timeout fired.
    TimedOut,
    /// The overall deadline fired before the provider finished (or started).
    Abandoned,
}

impl ProviderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderStatus::CacheHit => "cache_hit",
            ProviderStatus::Fetched => "fetched",
            ProviderStatus::Failed => "failed",
            ProviderStatus::TimedOut => "timed_out",
            ProviderStatus::Abandoned => "abandoned",
        }
    }

    /// Whether the provider contributed results.
    pub fn is_success(&self) -> bool {
        matches!(self, ProviderStatus::CacheHit | ProviderStatus::Fetched)
    }
}

/// Per-provider entry of a scrape outcome.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProviderReport {
    pub provider: String,
    pub status: ProviderStatus,
    /// Number of results contributed.
    pub results: usize,
    /// Time spent on the network call (0 for cache hits and abandoned calls).
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Everything a scrape collected before its deadline.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ScrapeOutcome {
    /// Results of all successful providers, in provider order.
    pub results: Vec<RawResult>,
    /// One report per provider, in provider order.
    pub reports: Vec<ProviderReport>,
    pub duration_ms: u64,
    /// True when the overall deadline cut the scrape short.
    pub deadline_hit: bool,
}

impl ScrapeOutcome {
    pub fn count(&self, status: ProviderStatus) -> usize {
        self.reports.iter().filter(|r| r.status == status).count()
    }
}

/// How long scraped rows stay fresh, by media kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtlPolicy {
    pub movie: Duration,
    pub episode: Duration,
}

impl TtlPolicy {
    pub fn for_query(&self, query: &Query) -> Duration {
        match query.kind {
            MediaKind::Movie => self.movie,
            MediaKind::Episode => self.episode,
        }
    }
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self::from(&CacheConfig::default())
    }
}

impl From<&CacheConfig> for TtlPolicy {
    fn from(config: &CacheConfig) -> Self {
        Self {
            movie: Duration::from_secs(config.movie_ttl_hours.saturating_mul(3600)),
            episode: Duration::from_secs(config.episode_ttl_hours.saturating_mul(3600)),
        }
    }
}
