//! Types shared by every provider adapter.

use async_trait::async_trait;
use std::time::Duration;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::query::Query;

/// How a candidate would be played.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Content-addressed torrent (has an info hash).
    Torrent,
    /// Plain direct link.
    Direct,
    /// File in a cloud-storage library.
    Cloud,
    /// Link already resolved through a debrid service.
    DebridResolved,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Torrent => "torrent",
            SourceKind::Direct => "direct",
            SourceKind::Cloud => "cloud",
            SourceKind::DebridResolved => "debrid_resolved",
        }
    }
}

/// One candidate returned by a provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RawResult {
    /// Name of the provider that returned this candidate.
    pub provider: String,
    /// Free-text release name.
    pub release_name: String,
    /// Info hash (lowercase hex) for torrent-based candidates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info_hash: Option<String>,
    /// Opaque URL for direct/cloud/debrid candidates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Reported size in bytes (0 when unknown).
    #[serde(default)]
    pub size_bytes: u64,
    /// Reported seeder/peer count.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seeders: Option<u32>,
    /// Source kind tag.
    pub kind: SourceKind,
    /// File index inside a multi-file torrent, when the provider knows it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_index: Option<u32>,
    /// Provider grouping hint for consecutive-episode playback.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binge_group: Option<String>,
}

impl RawResult {
    /// Torrent candidate with the given hash.
    pub fn torrent(
        provider: impl Into<String>,
        release_name: impl Into<String>,
        info_hash: impl Into<String>,
    ) -> Self {
        Self {
            provider: provider.into(),
            release_name: release_name.into(),
            info_hash: Some(info_hash.into().to_lowercase()),
            url: None,
            size_bytes: 0,
            seeders: None,
            kind: SourceKind::Torrent,
            file_index: None,
            binge_group: None,
        }
    }

    /// URL-addressed candidate of the given kind.
    pub fn link(
        provider: impl Into<String>,
        release_name: impl Into<String>,
        url: impl Into<String>,
        kind: SourceKind,
    ) -> Self {
        Self {
            provider: provider.into(),
            release_name: release_name.into(),
            info_hash: None,
            url: Some(url.into()),
            size_bytes: 0,
            seeders: None,
            kind,
            file_index: None,
            binge_group: None,
        }
    }

    pub fn with_size(mut self, size_bytes: u64) -> Self {
        self.size_bytes = size_bytes;
        self
    }

    pub fn with_seeders(mut self, seeders: u32) -> Self {
        self.seeders = Some(seeders);
        self
    }

    /// Lowercased, non-empty info hash.
    pub fn normalized_hash(&self) -> Option<String> {
        self.info_hash
            .as_deref()
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .map(str::to_lowercase)
    }
}

/// Errors a provider call can produce. All of them are soft failures.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("Provider request timed out")]
    Timeout,

    #[error("Provider connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Provider API error: {0}")]
    ApiError(String),

    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),

    #[error("Provider cannot serve this query: {0}")]
    Unsupported(String),
}

/// A pluggable source of candidates, invoked uniformly by the scraper.
///
/// Implementations must return promptly when the caller's timeout fires;
/// the scraper drops the future, so no work may be detached from it.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Provider name for logging, caching and reports.
    fn name(&self) -> &str;

    /// Call timeout overriding the scraper's per-provider default.
    fn timeout(&self) -> Option<Duration> {
        None
    }

    /// Fetch candidates for a query.
    async fn fetch(&self, query: &Query) -> Result<Vec<RawResult>, ProviderError>;
}
