//! Mock provider adapter for testing.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::provider::{ProviderAdapter, ProviderError, RawResult};
use crate::query::Query;

/// Mock implementation of the ProviderAdapter trait.
///
/// Provides controllable behavior for testing:
/// - Return configurable results
/// - Simulate failures and slow responses
/// - Count and record calls for assertions
///
/// # Example
///
/// ```rust,ignore
/// use sourcerer_core::testing::{MockProvider, fixtures};
///
/// let provider = MockProvider::new("alpha-indexer")
///     .with_results(vec![fixtures::torrent("alpha-indexer", "Alpha.2020.1080p", 1, 50)])
///     .with_delay(Duration::from_millis(50));
///
/// let results = provider.fetch(&fixtures::alpha_query()).await?;
/// assert_eq!(provider.call_count(), 1);
/// ```
pub struct MockProvider {
    name: String,
    results: Mutex<Vec<RawResult>>,
    delay: Option<Duration>,
    error: Option<ProviderError>,
    calls: AtomicUsize,
    queries: Mutex<Vec<Query>>,
}

impl std::fmt::Debug for MockProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockProvider")
            .field("name", &self.name)
            .field("delay", &self.delay)
            .field("error", &self.error)
            .field("calls", &self.call_count())
            .finish()
    }
}

impl MockProvider {
    /// Create a new mock provider that returns nothing.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            results: Mutex::new(Vec::new()),
            delay: None,
            error: None,
            calls: AtomicUsize::new(0),
            queries: Mutex::new(Vec::new()),
        }
    }

    /// Results returned by every call.
    pub fn with_results(self, results: Vec<RawResult>) -> Self {
        self.set_results(results);
        self
    }

    /// Sleep this long before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fail every call with the given error.
    pub fn with_error(mut self, error: ProviderError) -> Self {
        self.error = Some(error);
        self
    }

    /// Fail every call with a connection error.
    pub fn failing(self) -> Self {
        self.with_error(ProviderError::ConnectionFailed("mock failure".to_string()))
    }

    /// Replace the configured results.
    pub fn set_results(&self, results: Vec<RawResult>) {
        if let Ok(mut guard) = self.results.lock() {
            *guard = results;
        }
    }

    /// Number of fetch calls made (including failed ones).
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Queries received, in call order.
    pub fn recorded_queries(&self) -> Vec<Query> {
        self.queries.lock().map(|q| q.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ProviderAdapter for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, query: &Query) -> Result<Vec<RawResult>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut queries) = self.queries.lock() {
            queries.push(query.clone());
        }

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(err) = &self.error {
            return Err(err.clone());
        }

        Ok(self.results.lock().map(|r| r.clone()).unwrap_or_default())
    }
}
