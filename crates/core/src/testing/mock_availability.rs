//! Mock availability service for testing.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::availability::{AvailabilityError, AvailabilityService};

/// Mock implementation of the AvailabilityService trait.
///
/// Answers every hash it receives: hashes in the cached set are cached, the
/// rest are not. Batches are recorded for assertions.
pub struct MockAvailabilityService {
    name: String,
    cached: HashSet<String>,
    batch_limit: usize,
    ordered: bool,
    answer_ttl: Duration,
    delay: Option<Duration>,
    fail: bool,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    batches: Mutex<Vec<Vec<String>>>,
}

impl MockAvailabilityService {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            cached: HashSet::new(),
            batch_limit: 100,
            ordered: true,
            answer_ttl: Duration::from_secs(3600),
            delay: None,
            fail: false,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
            batches: Mutex::new(Vec::new()),
        }
    }

    /// Hashes this service reports as cached.
    pub fn with_cached<I, S>(mut self, hashes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.cached
            .extend(hashes.into_iter().map(|h| h.as_ref().to_lowercase()));
        self
    }

    pub fn with_batch_limit(mut self, batch_limit: usize) -> Self {
        self.batch_limit = batch_limit;
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.answer_ttl = ttl;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Allow batches to run concurrently.
    pub fn unordered(mut self) -> Self {
        self.ordered = false;
        self
    }

    /// Fail every batch.
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Number of check_batch calls made.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Most check_batch calls seen running at the same time.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    /// Batches received, in call order.
    pub fn recorded_batches(&self) -> Vec<Vec<String>> {
        self.batches.lock().map(|b| b.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl AvailabilityService for MockAvailabilityService {
    fn name(&self) -> &str {
        &self.name
    }

    fn batch_limit(&self) -> usize {
        self.batch_limit
    }

    fn ordered(&self) -> bool {
        self.ordered
    }

    fn answer_ttl(&self) -> Duration {
        self.answer_ttl
    }

    async fn check_batch(
        &self,
        hashes: &[String],
    ) -> Result<HashMap<String, bool>, AvailabilityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut batches) = self.batches.lock() {
            batches.push(hashes.to_vec());
        }

        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(running, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.fail {
            return Err(AvailabilityError::ApiError("mock failure".to_string()));
        }

        Ok(hashes
            .iter()
            .map(|h| (h.clone(), self.cached.contains(&h.to_lowercase())))
            .collect())
    }
}
