//! Result cache and availability cache.
//!
//! Both caches enforce freshness when rows are read: an expired row behaves
//! exactly like a missing one. Rows go away through TTL expiry, `purge_expired`
//! or an explicit `clear`.

mod memory;
mod sqlite;
mod types;

pub use memory::MemoryCache;
pub use sqlite::SqliteCache;
pub use types::*;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::availability::AvailabilityAnswer;
use crate::config::{CacheBackend, CacheConfig};
use crate::provider::RawResult;
use crate::query::QueryKey;

/// Previously scraped provider results, keyed by provider and query key.
pub trait ResultCache: Send + Sync {
    /// Rows stored for this provider and query, fresh or not.
    fn get(&self, provider: &str, key: &QueryKey) -> Result<Option<ResultLookup>, CacheError>;

    /// Store rows for this provider and query, replacing any previous rows.
    fn put(
        &self,
        provider: &str,
        key: &QueryKey,
        rows: &[RawResult],
        ttl: Duration,
    ) -> Result<(), CacheError>;

    /// Delete expired rows. Returns how many were removed.
    fn purge_expired(&self) -> Result<usize, CacheError>;

    /// Delete everything.
    fn clear(&self) -> Result<(), CacheError>;
}

/// Per-service "is this hash cached" answers.
pub trait AvailabilityCache: Send + Sync {
    /// Unexpired answers of `service` for the given hashes.
    fn get_many(
        &self,
        hashes: &[String],
        service: &str,
    ) -> Result<HashMap<String, AvailabilityAnswer>, CacheError>;

    /// Store answers, replacing older answers for the same hash and service.
    fn put_many(&self, answers: &[AvailabilityAnswer]) -> Result<(), CacheError>;

    /// Delete expired answers. Returns how many were removed.
    fn purge_expired(&self) -> Result<usize, CacheError>;

    /// Delete everything.
    fn clear(&self) -> Result<(), CacheError>;
}

/// Both caches, backed by the same store.
#[derive(Clone)]
pub struct CacheHandles {
    pub results: Arc<dyn ResultCache>,
    pub availability: Arc<dyn AvailabilityCache>,
}

impl CacheHandles {
    /// Build both caches on one shared backend instance.
    pub fn shared<C>(cache: Arc<C>) -> Self
    where
        C: ResultCache + AvailabilityCache + 'static,
    {
        Self {
            results: cache.clone(),
            availability: cache,
        }
    }

    /// Delete expired rows from both caches.
    pub fn purge_expired(&self) -> Result<PurgeStats, CacheError> {
        Ok(PurgeStats {
            result_rows: self.results.purge_expired()?,
            availability_rows: self.availability.purge_expired()?,
        })
    }

    /// Empty both caches.
    pub fn clear(&self) -> Result<(), CacheError> {
        self.results.clear()?;
        self.availability.clear()
    }
}

/// Open the cache backend selected in the config.
pub fn open_caches(config: &CacheConfig) -> Result<CacheHandles, CacheError> {
    match config.backend {
        CacheBackend::Sqlite => Ok(CacheHandles::shared(Arc::new(SqliteCache::new(
            &config.path,
        )?))),
        CacheBackend::Memory => Ok(CacheHandles::shared(Arc::new(MemoryCache::new(
            config.memory_max_entries,
        )))),
    }
}
