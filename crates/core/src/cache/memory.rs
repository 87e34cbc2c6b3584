//! In-process TTL cache with bounded size.

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};

use super::types::expiry_after;
use super::{AvailabilityCache, CacheError, ResultCache, ResultLookup};
use crate::availability::AvailabilityAnswer;
use crate::provider::RawResult;
use crate::query::QueryKey;

struct Entry<V> {
    value: V,
    expires_at: DateTime<Utc>,
    seq: u64,
}

/// Bounded map that evicts expired entries first, then the oldest insert.
struct BoundedMap<K, V> {
    entries: HashMap<K, Entry<V>>,
    /// Insertion order, keyed by `Entry::seq`.
    order: BTreeMap<u64, K>,
    max_entries: usize,
    next_seq: u64,
}

impl<K: Hash + Eq + Clone, V> BoundedMap<K, V> {
    fn new(max_entries: usize) -> Self {
        Self {
            entries: HashMap::new(),
            order: BTreeMap::new(),
            max_entries: max_entries.max(1),
            next_seq: 0,
        }
    }

    fn insert(&mut self, key: K, value: V, expires_at: DateTime<Utc>) {
        if !self.entries.contains_key(&key) && self.entries.len() >= self.max_entries {
            self.purge_expired(Utc::now());
            if self.entries.len() >= self.max_entries {
                if let Some((_, oldest)) = self.order.pop_first() {
                    self.entries.remove(&oldest);
                }
            }
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        self.order.insert(seq, key.clone());
        let previous = self.entries.insert(
            key,
            Entry {
                value,
                expires_at,
                seq,
            },
        );
        if let Some(previous) = previous {
            self.order.remove(&previous.seq);
        }
    }

    fn purge_expired(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        let order = &mut self.order;
        self.entries.retain(|_, entry| {
            let live = entry.expires_at > now;
            if !live {
                order.remove(&entry.seq);
            }
            live
        });
        before - self.entries.len()
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }
}

/// In-memory result and availability cache.
///
/// Each of the two maps holds at most `max_entries` rows.
pub struct MemoryCache {
    results: Mutex<BoundedMap<(String, QueryKey), Vec<RawResult>>>,
    availability: Mutex<BoundedMap<(String, String), bool>>,
}

impl MemoryCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            results: Mutex::new(BoundedMap::new(max_entries)),
            availability: Mutex::new(BoundedMap::new(max_entries)),
        }
    }

    /// Number of stored result rows, expired ones included.
    pub fn result_len(&self) -> usize {
        self.results.lock().map(|m| m.entries.len()).unwrap_or(0)
    }

    /// Number of stored availability answers, expired ones included.
    pub fn availability_len(&self) -> usize {
        self.availability.lock().map(|m| m.entries.len()).unwrap_or(0)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, CacheError> {
    mutex
        .lock()
        .map_err(|_| CacheError::Database("memory cache lock poisoned".to_string()))
}

impl ResultCache for MemoryCache {
    fn get(&self, provider: &str, key: &QueryKey) -> Result<Option<ResultLookup>, CacheError> {
        let map = lock(&self.results)?;
        Ok(map
            .entries
            .get(&(provider.to_string(), key.clone()))
            .map(|entry| ResultLookup {
                rows: entry.value.clone(),
                expires_at: entry.expires_at,
                fresh: entry.expires_at > Utc::now(),
            }))
    }

    fn put(
        &self,
        provider: &str,
        key: &QueryKey,
        rows: &[RawResult],
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let expires_at = expiry_after(Utc::now(), ttl);
        lock(&self.results)?.insert((provider.to_string(), key.clone()), rows.to_vec(), expires_at);
        Ok(())
    }

    fn purge_expired(&self) -> Result<usize, CacheError> {
        Ok(lock(&self.results)?.purge_expired(Utc::now()))
    }

    fn clear(&self) -> Result<(), CacheError> {
        lock(&self.results)?.clear();
        Ok(())
    }
}

impl AvailabilityCache for MemoryCache {
    fn get_many(
        &self,
        hashes: &[String],
        service: &str,
    ) -> Result<HashMap<String, AvailabilityAnswer>, CacheError> {
        let map = lock(&self.availability)?;
        let now = Utc::now();
        let mut answers = HashMap::new();
        for hash in hashes {
            let hash = hash.to_lowercase();
            if let Some(entry) = map.entries.get(&(service.to_string(), hash.clone())) {
                if entry.expires_at > now {
                    answers.insert(
                        hash.clone(),
                        AvailabilityAnswer {
                            info_hash: hash,
                            service: service.to_string(),
                            cached: entry.value,
                            expires_at: entry.expires_at,
                        },
                    );
                }
            }
        }
        Ok(answers)
    }

    fn put_many(&self, answers: &[AvailabilityAnswer]) -> Result<(), CacheError> {
        let mut map = lock(&self.availability)?;
        for answer in answers {
            map.insert(
                (answer.service.clone(), answer.info_hash.to_lowercase()),
                answer.cached,
                answer.expires_at,
            );
        }
        Ok(())
    }

    fn purge_expired(&self) -> Result<usize, CacheError> {
        Ok(lock(&self.availability)?.purge_expired(Utc::now()))
    }

    fn clear(&self) -> Result<(), CacheError> {
        lock(&self.availability)?.clear();
        Ok(())
    }
}
