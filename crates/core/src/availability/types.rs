use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One service's answer for one hash.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AvailabilityAnswer {
    /// Lowercase info hash.
    pub info_hash: String,
    /// Name of the answering service.
    pub service: String,
    /// Whether the service already holds playable content for the hash.
    pub cached: bool,
    /// After this instant the answer must be treated as absent.
    pub expires_at: DateTime<Utc>,
}

impl AvailabilityAnswer {
    pub fn is_fresh(&self) -> bool {
        self.is_fresh_at(Utc::now())
    }

    pub fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

/// Merged availability of one hash across all checked services.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AvailabilityStatus {
    /// At least one service has it cached.
    Cached,
    /// Every checked service answered and none has it cached.
    Uncached,
    /// Some service could not answer (failure, timeout, unsupported hash).
    Unknown,
}

impl AvailabilityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AvailabilityStatus::Cached => "cached",
            AvailabilityStatus::Uncached => "uncached",
            AvailabilityStatus::Unknown => "unknown",
        }
    }
}

/// Result of one availability check.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AvailabilityReport {
    /// Services that took part in the check, in configuration order.
    pub services: Vec<String>,
    /// Answers per lowercase hash, cache hits and fresh answers alike.
    pub answers: HashMap<String, Vec<AvailabilityAnswer>>,
    /// Services that failed (wholly or for some batch) or ran past the deadline.
    pub failed_services: Vec<String>,
    /// Answers served from the availability cache.
    pub cache_hits: usize,
    /// Answers fetched from services during this check.
    pub fetched: usize,
}

impl AvailabilityReport {
    /// Merged status of a hash.
    pub fn status_for(&self, info_hash: &str) -> AvailabilityStatus {
        let hash = info_hash.to_lowercase();
        let answers = self.answers.get(&hash).map(Vec::as_slice).unwrap_or(&[]);

        if answers.iter().any(|a| a.cached) {
            return AvailabilityStatus::Cached;
        }

        let all_answered = !self.services.is_empty()
            && self
                .services
                .iter()
                .all(|service| answers.iter().any(|a| &a.service == service));

        if all_answered {
            AvailabilityStatus::Uncached
        } else {
            AvailabilityStatus::Unknown
        }
    }

    /// First service (in configuration order) that has the hash cached.
    pub fn cached_by(&self, info_hash: &str) -> Option<&str> {
        let answers = self.answers.get(&info_hash.to_lowercase())?;
        self.services
            .iter()
            .find(|service| answers.iter().any(|a| a.cached && &a.service == *service))
            .map(String::as_str)
    }

    pub(crate) fn push(&mut self, answer: AvailabilityAnswer) {
        let entry = self.answers.entry(answer.info_hash.clone()).or_default();
        entry.retain(|a| a.service != answer.service);
        entry.push(answer);
    }
}

/// Errors from an external availability service.
#[derive(Debug, Clone, Error)]
pub enum AvailabilityError {
    #[error("Request timed out")]
    Timeout,

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

/// External service that reports whether hashes are cached on its side.
#[async_trait]
pub trait AvailabilityService: Send + Sync {
    /// Service name, stored with every answer.
    fn name(&self) -> &str;

    /// Maximum hashes per `check_batch` call. The caller enforces it.
    fn batch_limit(&self) -> usize;

    /// Whether batches must be sent one after another.
    fn ordered(&self) -> bool {
        true
    }

    /// How long an answer from this service stays trustworthy.
    fn answer_ttl(&self) -> Duration;

    /// Check one batch. Hashes the service could not check are left out of the map.
    async fn check_batch(&self, hashes: &[String]) -> Result<HashMap<String, bool>, AvailabilityError>;
}
