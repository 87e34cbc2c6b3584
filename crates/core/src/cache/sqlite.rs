//! SQLite-backed cache implementation.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::types::expiry_after;
use super::{AvailabilityCache, CacheError, ResultCache, ResultLookup};
use crate::availability::AvailabilityAnswer;
use crate::provider::RawResult;
use crate::query::QueryKey;

/// SQLite-backed result and availability cache.
///
/// Expiry times are stored as unix milliseconds so freshness checks and
/// purges are plain integer comparisons.
pub struct SqliteCache {
    conn: Mutex<Connection>,
}

impl SqliteCache {
    /// Open (or create) a cache database at `path`.
    pub fn new(path: &Path) -> Result<Self, CacheError> {
        let conn = Connection::open(path)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite cache (useful for testing).
    pub fn in_memory() -> Result<Self, CacheError> {
        let conn = Connection::open_in_memory()?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), CacheError> {
        conn.execute_batch(
            r#"
            -- Scraped provider results (one row per provider and query key)
            CREATE TABLE IF NOT EXISTS result_cache (
                provider TEXT NOT NULL,
                query_key TEXT NOT NULL,
                rows TEXT NOT NULL,
                stored_at TEXT NOT NULL,
                expires_at INTEGER NOT NULL,
                PRIMARY KEY (provider, query_key)
            );

            CREATE INDEX IF NOT EXISTS idx_result_cache_expires ON result_cache(expires_at);

            -- Debrid availability answers (one row per hash and service)
            CREATE TABLE IF NOT EXISTS availability_cache (
                info_hash TEXT NOT NULL,
                service TEXT NOT NULL,
                cached INTEGER NOT NULL,
                expires_at INTEGER NOT NULL,
                PRIMARY KEY (info_hash, service)
            );

            CREATE INDEX IF NOT EXISTS idx_availability_cache_expires ON availability_cache(expires_at);
            "#,
        )?;

        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, CacheError> {
        self.conn
            .lock()
            .map_err(|_| CacheError::Database("cache connection lock poisoned".to_string()))
    }
}

fn from_millis(millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).unwrap_or(DateTime::<Utc>::MAX_UTC)
}

impl ResultCache for SqliteCache {
    fn get(&self, provider: &str, key: &QueryKey) -> Result<Option<ResultLookup>, CacheError> {
        let conn = self.lock()?;
        let row: Option<(String, i64)> = conn
            .query_row(
                "SELECT rows, expires_at FROM result_cache WHERE provider = ? AND query_key = ?",
                params![provider, key.as_str()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((rows_json, expires_millis)) = row else {
            return Ok(None);
        };

        let rows: Vec<RawResult> = serde_json::from_str(&rows_json)?;
        let expires_at = from_millis(expires_millis);
        Ok(Some(ResultLookup {
            rows,
            expires_at,
            fresh: expires_at > Utc::now(),
        }))
    }

    fn put(
        &self,
        provider: &str,
        key: &QueryKey,
        rows: &[RawResult],
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let rows_json = serde_json::to_string(rows)?;
        let now = Utc::now();
        let expires_at = expiry_after(now, ttl);

        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO result_cache (provider, query_key, rows, stored_at, expires_at)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(provider, query_key) DO UPDATE SET
                rows = excluded.rows,
                stored_at = excluded.stored_at,
                expires_at = excluded.expires_at",
            params![
                provider,
                key.as_str(),
                rows_json,
                now.to_rfc3339(),
                expires_at.timestamp_millis()
            ],
        )?;
        Ok(())
    }

    fn purge_expired(&self) -> Result<usize, CacheError> {
        let conn = self.lock()?;
        let removed = conn.execute(
            "DELETE FROM result_cache WHERE expires_at <= ?",
            params![Utc::now().timestamp_millis()],
        )?;
        Ok(removed)
    }

    fn clear(&self) -> Result<(), CacheError> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM result_cache", [])?;
        Ok(())
    }
}

impl AvailabilityCache for SqliteCache {
    fn get_many(
        &self,
        hashes: &[String],
        service: &str,
    ) -> Result<HashMap<String, AvailabilityAnswer>, CacheError> {
        let conn = self.lock()?;
        let now_millis = Utc::now().timestamp_millis();
        let mut stmt = conn.prepare_cached(
            "SELECT cached, expires_at FROM availability_cache
             WHERE info_hash = ? AND service = ? AND expires_at > ?",
        )?;

        let mut answers = HashMap::new();
        for hash in hashes {
            let hash = hash.to_lowercase();
            let row: Option<(bool, i64)> = stmt
                .query_row(params![&hash, service, now_millis], |row| {
                    Ok((row.get(0)?, row.get(1)?))
                })
                .optional()?;

            if let Some((cached, expires_millis)) = row {
                answers.insert(
                    hash.clone(),
                    AvailabilityAnswer {
                        info_hash: hash,
                        service: service.to_string(),
                        cached,
                        expires_at: from_millis(expires_millis),
                    },
                );
            }
        }
        Ok(answers)
    }

    fn put_many(&self, answers: &[AvailabilityAnswer]) -> Result<(), CacheError> {
        if answers.is_empty() {
            return Ok(());
        }

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO availability_cache (info_hash, service, cached, expires_at)
                 VALUES (?, ?, ?, ?)
                 ON CONFLICT(info_hash, service) DO UPDATE SET
                    cached = excluded.cached,
                    expires_at = excluded.expires_at",
            )?;
            for answer in answers {
                stmt.execute(params![
                    answer.info_hash.to_lowercase(),
                    answer.service,
                    answer.cached,
                    answer.expires_at.timestamp_millis()
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn purge_expired(&self) -> Result<usize, CacheError> {
        let conn = self.lock()?;
        let removed = conn.execute(
            "DELETE FROM availability_cache WHERE expires_at <= ?",
            params![Utc::now().timestamp_millis()],
        )?;
        Ok(removed)
    }

    fn clear(&self) -> Result<(), CacheError> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM availability_cache", [])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn answer(hash: &str, service: &str, cached: bool, ttl_secs: i64) -> AvailabilityAnswer {
        AvailabilityAnswer {
            info_hash: hash.to_string(),
            service: service.to_string(),
            cached,
            expires_at: Utc::now() + chrono::Duration::seconds(ttl_secs),
        }
    }

    fn key() -> QueryKey {
        QueryKey::from("movie:603:1999")
    }

    #[test]
    fn test_result_put_and_get_fresh() {
        let cache = SqliteCache::in_memory().unwrap();
        let rows = vec![RawResult::torrent("p", "Alpha.2020.1080p", "AAAA")];
        cache
            .put("p", &key(), &rows, Duration::from_secs(3600))
            .unwrap();

        let lookup = ResultCache::get(&cache, "p", &key()).unwrap().unwrap();
        assert!(lookup.fresh);
        assert_eq!(lookup.rows, rows);
        assert_eq!(lookup.rows[0].info_hash.as_deref(), Some("aaaa"));
    }

    #[test]
    fn test_result_get_missing() {
        let cache = SqliteCache::in_memory().unwrap();
        assert!(ResultCache::get(&cache, "p", &key()).unwrap().is_none());
    }

    #[test]
    fn test_result_keys_are_per_provider() {
        let cache = SqliteCache::in_memory().unwrap();
        cache
            .put("a", &key(), &[], Duration::from_secs(3600))
            .unwrap();
        assert!(ResultCache::get(&cache, "b", &key()).unwrap().is_none());
    }

    #[test]
    fn test_result_expired_is_stale() {
        let cache = SqliteCache::in_memory().unwrap();
        cache.put("p", &key(), &[], Duration::ZERO).unwrap();

        let lookup = ResultCache::get(&cache, "p", &key()).unwrap().unwrap();
        assert!(!lookup.fresh);
    }

    #[test]
    fn test_result_put_replaces_rows() {
        let cache = SqliteCache::in_memory().unwrap();
        cache
            .put(
                "p",
                &key(),
                &[RawResult::torrent("p", "old", "aa")],
                Duration::from_secs(60),
            )
            .unwrap();
        cache
            .put(
                "p",
                &key(),
                &[RawResult::torrent("p", "new", "bb")],
                Duration::from_secs(60),
            )
            .unwrap();

        let lookup = ResultCache::get(&cache, "p", &key()).unwrap().unwrap();
        assert_eq!(lookup.rows.len(), 1);
        assert_eq!(lookup.rows[0].release_name, "new");
    }

    #[test]
    fn test_result_purge_expired() {
        let cache = SqliteCache::in_memory().unwrap();
        cache.put("old", &key(), &[], Duration::ZERO).unwrap();
        cache
            .put("new", &key(), &[], Duration::from_secs(3600))
            .unwrap();

        assert_eq!(ResultCache::purge_expired(&cache).unwrap(), 1);
        assert!(ResultCache::get(&cache, "old", &key()).unwrap().is_none());
        assert!(ResultCache::get(&cache, "new", &key()).unwrap().is_some());
    }

    #[test]
    fn test_availability_only_unexpired_returned() {
        let cache = SqliteCache::in_memory().unwrap();
        cache
            .put_many(&[
                answer("h1", "debrid", true, 3600),
                answer("h2", "debrid", false, -10),
            ])
            .unwrap();

        let hashes = vec!["h1".to_string(), "h2".to_string(), "h3".to_string()];
        let answers = cache.get_many(&hashes, "debrid").unwrap();
        assert_eq!(answers.len(), 1);
        assert!(answers["h1"].cached);
    }

    #[test]
    fn test_availability_scoped_by_service() {
        let cache = SqliteCache::in_memory().unwrap();
        cache
            .put_many(&[answer("h1", "one", true, 3600)])
            .unwrap();

        let hashes = vec!["h1".to_string()];
        assert!(cache.get_many(&hashes, "two").unwrap().is_empty());
        assert_eq!(cache.get_many(&hashes, "one").unwrap().len(), 1);
    }

    #[test]
    fn test_availability_hash_case_insensitive() {
        let cache = SqliteCache::in_memory().unwrap();
        cache
            .put_many(&[answer("ABCDEF", "debrid", true, 3600)])
            .unwrap();

        let answers = cache.get_many(&["abcdef".to_string()], "debrid").unwrap();
        assert!(answers.contains_key("abcdef"));
    }

    #[test]
    fn test_availability_overwrite_and_purge() {
        let cache = SqliteCache::in_memory().unwrap();
        cache
            .put_many(&[answer("h1", "debrid", false, 3600)])
            .unwrap();
        cache
            .put_many(&[answer("h1", "debrid", true, 3600)])
            .unwrap();
        let answers = cache.get_many(&["h1".to_string()], "debrid").unwrap();
        assert!(answers["h1"].cached);

        cache
            .put_many(&[answer("h2", "debrid", true, -1)])
            .unwrap();
        assert_eq!(AvailabilityCache::purge_expired(&cache).unwrap(), 1);
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.db");
        {
            let cache = SqliteCache::new(&path).unwrap();
            cache
                .put("p", &key(), &[], Duration::from_secs(3600))
                .unwrap();
            cache
                .put_many(&[answer("h1", "debrid", true, 3600)])
                .unwrap();
        }

        let cache = SqliteCache::new(&path).unwrap();
        assert!(ResultCache::get(&cache, "p", &key()).unwrap().unwrap().fresh);
        assert_eq!(cache.get_many(&["h1".to_string()], "debrid").unwrap().len(), 1);
    }

    #[test]
    fn test_clear_only_touches_one_table() {
        let cache = SqliteCache::in_memory().unwrap();
        cache
            .put("p", &key(), &[], Duration::from_secs(3600))
            .unwrap();
        cache
            .put_many(&[answer("h1", "debrid", true, 3600)])
            .unwrap();

        ResultCache::clear(&cache).unwrap();
        assert!(ResultCache::get(&cache, "p", &key()).unwrap().is_none());
        assert_eq!(cache.get_many(&["h1".to_string()], "debrid").unwrap().len(), 1);
    }
}
