//! Scraper deadline and concurrency integration tests.
//!
//! These tests verify the scraper orchestrator against slow and failing
//! providers:
//! - The overall deadline returns partial results on time
//! - Slow calls are dropped, not awaited
//! - The worker ceiling bounds in-flight provider calls

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use sourcerer_core::{
    cache::{MemoryCache, ResultCache},
    provider::{ProviderAdapter, ProviderError, RawResult},
    query::{Query, QueryKey},
    scraper::{ProviderStatus, ScraperOrchestrator, TtlPolicy},
    testing::{fixtures, MockProvider},
};

const ALPHA: &str = "Alpha.2020.1080p.WEB.x264-GRP";

fn orchestrator(cache: Arc<MemoryCache>, max_concurrency: usize) -> ScraperOrchestrator {
    ScraperOrchestrator::new(cache, max_concurrency, TtlPolicy::default())
}

/// Provider that tracks how many of its calls overlap.
struct GaugedProvider {
    name: String,
    in_flight: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

#[async_trait]
impl ProviderAdapter for GaugedProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, _query: &Query) -> Result<Vec<RawResult>, ProviderError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(Vec::new())
    }
}

#[tokio::test]
async fn test_deadline_returns_partial_results() {
    let cache = Arc::new(MemoryCache::new(100));
    let fast = Arc::new(MockProvider::new("fast").with_results(vec![fixtures::torrent("fast", ALPHA, 1, 10)]));
    let slow = Arc::new(
        MockProvider::new("slow")
            .with_results(vec![fixtures::torrent("slow", ALPHA, 2, 10)])
            .with_delay(Duration::from_secs(5)),
    );
    let providers: Vec<Arc<dyn ProviderAdapter>> = vec![slow, fast];

    let started = Instant::now();
    let outcome = orchestrator(Arc::clone(&cache), 4)
        .scrape(
            &fixtures::alpha_query(),
            &providers,
            Duration::from_secs(10),
            Duration::from_millis(200),
        )
        .await
        .unwrap();

    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(outcome.deadline_hit);
    assert_eq!(outcome.results.len(), 1);
    assert_eq!(outcome.results[0].provider, "fast");
    assert_eq!(outcome.reports[0].status, ProviderStatus::Abandoned);
    assert_eq!(outcome.reports[1].status, ProviderStatus::Fetched);

    // The abandoned provider left nothing in the cache.
    let slow_key = QueryKey::for_query(&fixtures::alpha_query());
    assert!(cache.get("slow", &slow_key).unwrap().is_none());
    assert!(cache.get("fast", &slow_key).unwrap().is_some());
}

#[tokio::test]
async fn test_per_provider_timeout_does_not_block_others() {
    let cache = Arc::new(MemoryCache::new(100));
    let stuck = Arc::new(MockProvider::new("stuck").with_delay(Duration::from_secs(5)));
    let ok = Arc::new(MockProvider::new("ok").with_results(vec![fixtures::torrent("ok", ALPHA, 1, 10)]));
    let broken = Arc::new(MockProvider::new("broken").failing());
    let providers: Vec<Arc<dyn ProviderAdapter>> = vec![stuck, ok, broken];

    let outcome = orchestrator(cache, 4)
        .scrape(
            &fixtures::alpha_query(),
            &providers,
            Duration::from_millis(50),
            Duration::from_secs(5),
        )
        .await
        .unwrap();

    assert!(!outcome.deadline_hit);
    assert_eq!(outcome.count(ProviderStatus::TimedOut), 1);
    assert_eq!(outcome.count(ProviderStatus::Failed), 1);
    assert_eq!(outcome.count(ProviderStatus::Fetched), 1);
    assert_eq!(outcome.results.len(), 1);
}

#[tokio::test]
async fn test_worker_ceiling_bounds_in_flight_calls() {
    let cache = Arc::new(MemoryCache::new(100));
    let in_flight = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let providers: Vec<Arc<dyn ProviderAdapter>> = (0..10)
        .map(|i| {
            Arc::new(GaugedProvider {
                name: format!("p{}", i),
                in_flight: Arc::clone(&in_flight),
                peak: Arc::clone(&peak),
            }) as Arc<dyn ProviderAdapter>
        })
        .collect();

    let outcome = orchestrator(cache, 3)
        .scrape(
            &fixtures::alpha_query(),
            &providers,
            Duration::from_secs(1),
            Duration::from_secs(5),
        )
        .await
        .unwrap();

    assert_eq!(outcome.count(ProviderStatus::Fetched), 10);
    assert!(peak.load(Ordering::SeqCst) <= 3);
    assert!(peak.load(Ordering::SeqCst) >= 1);
}

#[tokio::test]
async fn test_episode_queries_cache_separately() {
    let cache = Arc::new(MemoryCache::new(100));
    let provider = Arc::new(MockProvider::new("p1"));
    let providers: Vec<Arc<dyn ProviderAdapter>> = vec![provider.clone()];
    let scraper = orchestrator(Arc::clone(&cache), 2);

    for episode in [1, 2, 1] {
        scraper
            .scrape(
                &fixtures::episode_query("Show", 1, episode),
                &providers,
                Duration::from_secs(1),
                Duration::from_secs(5),
            )
            .await
            .unwrap();
    }

    assert_eq!(provider.call_count(), 2);
    assert!(cache
        .get("p1", &QueryKey::from("episode:2002:s01e02"))
        .unwrap()
        .is_some());
}
