use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::{ProviderReport, ProviderStatus, ScrapeError, ScrapeOutcome, TtlPolicy};
use crate::cache::ResultCache;
use crate::metrics;
use crate::provider::{ProviderAdapter, ProviderError, RawResult};
use crate::query::{Query, QueryKey};

/// Result of one provider call, sent from a worker to the collector.
struct WorkerMessage {
    index: usize,
    outcome: FetchOutcome,
    elapsed: Duration,
}

enum FetchOutcome {
    Fetched(Vec<RawResult>),
    Failed(ProviderError),
    TimedOut,
}

/// Fans a query out to providers.
///
/// Fresh result cache rows short-circuit the network call. Cache misses are
/// served by at most `max_concurrency` workers pulling from a shared queue;
/// every finished call is sent over a channel to a single collector, which
/// is the only place results are accumulated.
pub struct ScraperOrchestrator {
    cache: Arc<dyn ResultCache>,
    max_concurrency: usize,
    ttl: TtlPolicy,
}

impl ScraperOrchestrator {
    pub fn new(cache: Arc<dyn ResultCache>, max_concurrency: usize, ttl: TtlPolicy) -> Self {
        Self {
            cache,
            max_concurrency: max_concurrency.max(1),
            ttl,
        }
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Collect results for `query` from every provider.
    ///
    /// Provider failures and timeouts contribute zero results. When
    /// `overall_deadline` elapses, outstanding calls are aborted and whatever
    /// already completed is returned.
    pub async fn scrape(
        &self,
        query: &Query,
        providers: &[Arc<dyn ProviderAdapter>],
        per_provider_timeout: Duration,
        overall_deadline: Duration,
    ) -> Result<ScrapeOutcome, ScrapeError> {
        query.validate()?;
        if providers.is_empty() {
            return Err(ScrapeError::NoProviders);
        }

        let started = Instant::now();
        let deadline = started + overall_deadline;
        let key = query.key();

        let mut slots: Vec<Option<(Vec<RawResult>, ProviderReport)>> = vec![None; providers.len()];
        let mut misses = VecDeque::new();

        for (index, provider) in providers.iter().enumerate() {
            match self.lookup_fresh(provider.name(), &key) {
                Some(rows) => {
                    debug!(provider = %provider.name(), results = rows.len(), "Result cache hit");
                    let report = ProviderReport {
                        provider: provider.name().to_string(),
                        status: ProviderStatus::CacheHit,
                        results: rows.len(),
                        duration_ms: 0,
                        error: None,
                    };
                    slots[index] = Some((rows, report));
                }
                None => misses.push_back(index),
            }
        }

        let mut deadline_hit = false;
        if !misses.is_empty() {
            let expected = misses.len();
            let workers = self.max_concurrency.min(expected);
            let queue = Arc::new(Mutex::new(misses));
            let providers_shared: Arc<Vec<Arc<dyn ProviderAdapter>>> = Arc::new(providers.to_vec());
            let query_shared = Arc::new(query.clone());
            let ttl = self.ttl.for_query(query);
            let (tx, mut rx) = mpsc::channel::<WorkerMessage>(expected);
            let mut pool = JoinSet::new();

            debug!(providers = expected, workers, "Dispatching provider calls");

            for _ in 0..workers {
                let queue = Arc::clone(&queue);
                let providers = Arc::clone(&providers_shared);
                let query = Arc::clone(&query_shared);
                let cache = Arc::clone(&self.cache);
                let key = key.clone();
                let tx = tx.clone();
                pool.spawn(async move {
                    loop {
                        let next = queue.lock().ok().and_then(|mut q| q.pop_front());
                        let Some(index) = next else { break };
                        let provider = &providers[index];
                        let message = call_provider(
                            index,
                            provider.as_ref(),
                            &query,
                            provider.timeout().unwrap_or(per_provider_timeout),
                        )
                        .await;

                        if let FetchOutcome::Fetched(rows) = &message.outcome {
                            if let Err(e) = cache.put(provider.name(), &key, rows, ttl) {
                                warn!(provider = %provider.name(), error = %e, "Failed to write result cache");
                            }
                        }

                        if tx.send(message).await.is_err() {
                            break;
                        }
                    }
                });
            }
            drop(tx);

            let mut received = 0;
            let sleep = tokio::time::sleep_until(deadline);
            tokio::pin!(sleep);

            while received < expected {
                tokio::select! {
                    biased;
                    message = rx.recv() => match message {
                        Some(message) => {
                            received += 1;
                            record_message(providers, &mut slots, message);
                        }
                        None => break,
                    },
                    _ = &mut sleep => {
                        deadline_hit = true;
                        break;
                    }
                }
            }

            if deadline_hit {
                pool.abort_all();
                // Calls that finished right at the deadline are kept.
                while let Ok(message) = rx.try_recv() {
                    record_message(providers, &mut slots, message);
                }
                metrics::SCRAPE_DEADLINE_EXPIRED.inc();
                warn!(
                    deadline_ms = overall_deadline.as_millis() as u64,
                    pending = expected - received,
                    "Scrape deadline reached, abandoning outstanding providers"
                );
            }
        }

        let mut results = Vec::new();
        let mut reports = Vec::with_capacity(providers.len());
        for (provider, slot) in providers.iter().zip(slots) {
            let (rows, report) = slot.unwrap_or_else(|| {
                (
                    Vec::new(),
                    ProviderReport {
                        provider: provider.name().to_string(),
                        status: ProviderStatus::Abandoned,
                        results: 0,
                        duration_ms: 0,
                        error: None,
                    },
                )
            });
            metrics::PROVIDER_REQUESTS
                .with_label_values(&[report.provider.as_str(), report.status.as_str()])
                .inc();
            results.extend(rows);
            reports.push(report);
        }

        let outcome = ScrapeOutcome {
            results,
            reports,
            duration_ms: started.elapsed().as_millis() as u64,
            deadline_hit,
        };

        info!(
            providers = providers.len(),
            cache_hits = outcome.count(ProviderStatus::CacheHit),
            fetched = outcome.count(ProviderStatus::Fetched),
            failed = outcome.count(ProviderStatus::Failed) + outcome.count(ProviderStatus::TimedOut),
            abandoned = outcome.count(ProviderStatus::Abandoned),
            results = outcome.results.len(),
            duration_ms = outcome.duration_ms,
            "Scrape complete"
        );

        Ok(outcome)
    }

    /// Fresh cached rows, or None. Cache errors count as a miss.
    fn lookup_fresh(&self, provider: &str, key: &QueryKey) -> Option<Vec<RawResult>> {
        match self.cache.get(provider, key) {
            Ok(Some(lookup)) if lookup.fresh => {
                metrics::RESULT_CACHE_LOOKUPS.with_label_values(&["fresh"]).inc();
                Some(lookup.rows)
            }
            Ok(Some(_)) => {
                metrics::RESULT_CACHE_LOOKUPS.with_label_values(&["stale"]).inc();
                None
            }
            Ok(None) => {
                metrics::RESULT_CACHE_LOOKUPS.with_label_values(&["miss"]).inc();
                None
            }
            Err(e) => {
                metrics::RESULT_CACHE_LOOKUPS.with_label_values(&["error"]).inc();
                warn!(provider = %provider, error = %e, "Result cache read failed, treating as miss");
                None
            }
        }
    }
}

async fn call_provider(
    index: usize,
    provider: &dyn ProviderAdapter,
    query: &Query,
    timeout: Duration,
) -> WorkerMessage {
    let started = Instant::now();
    let outcome = match tokio::time::timeout(timeout, provider.fetch(query)).await {
        Ok(Ok(rows)) => FetchOutcome::Fetched(rows),
        Ok(Err(ProviderError::Timeout)) | Err(_) => FetchOutcome::TimedOut,
        Ok(Err(e)) => FetchOutcome::Failed(e),
    };
    let elapsed = started.elapsed();
    metrics::PROVIDER_DURATION
        .with_label_values(&[provider.name()])
        .observe(elapsed.as_secs_f64());

    WorkerMessage {
        index,
        outcome,
        elapsed,
    }
}

fn record_message(
    providers: &[Arc<dyn ProviderAdapter>],
    slots: &mut [Option<(Vec<RawResult>, ProviderReport)>],
    message: WorkerMessage,
) {
    let name = providers[message.index].name().to_string();
    let duration_ms = message.elapsed.as_millis() as u64;

    let (rows, status, error) = match message.outcome {
        FetchOutcome::Fetched(rows) => {
            debug!(provider = %name, results = rows.len(), duration_ms, "Provider answered");
            (rows, ProviderStatus::Fetched, None)
        }
        FetchOutcome::Failed(e) => {
            warn!(provider = %name, error = %e, duration_ms, "Provider failed");
            (Vec::new(), ProviderStatus::Failed, Some(e.to_string()))
        }
        FetchOutcome::TimedOut => {
            warn!(provider = %name, duration_ms, "Provider timed out");
            (
                Vec::new(),
                ProviderStatus::TimedOut,
                Some(ProviderError::Timeout.to_string()),
            )
        }
    };

    let results = rows.len();
    slots[message.index] = Some((
        rows,
        ProviderReport {
            provider: name,
            status,
            results,
            duration_ms,
            error,
        },
    ));
}
