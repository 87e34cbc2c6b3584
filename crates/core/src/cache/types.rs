use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::provider::RawResult;

/// Errors that can occur during cache operations.
///
/// Callers in the pipeline downgrade every variant to a cache miss.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<rusqlite::Error> for CacheError {
    fn from(err: rusqlite::Error) -> Self {
        CacheError::Database(err.to_string())
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::Serialization(err.to_string())
    }
}

/// Rows stored for one (provider, query key) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultLookup {
    pub rows: Vec<RawResult>,
    pub expires_at: DateTime<Utc>,
    /// False once `expires_at` has passed. Stale rows must not be used.
    pub fresh: bool,
}

/// Row counts reported by the cache maintenance endpoints.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PurgeStats {
    pub result_rows: usize,
    pub availability_rows: usize,
}

/// Expiry for a row written at `now` with the given TTL, saturating on overflow.
pub(crate) fn expiry_after(now: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|ttl| now.checked_add_signed(ttl))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
