//! Batched, cache-backed availability checks.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::{AvailabilityAnswer, AvailabilityReport, AvailabilityService};
use crate::cache::{expiry_after, AvailabilityCache};
use crate::metrics;

/// What one service contributed to a check.
struct ServiceOutcome {
    service: String,
    answers: Vec<AvailabilityAnswer>,
    cache_hits: usize,
    fetched: usize,
    failed: bool,
}

/// Checks hashes against availability services, cache first.
///
/// `max_concurrency` bounds both the services checked at once and the
/// batches in flight per unordered service.
pub struct AvailabilityChecker {
    cache: Arc<dyn AvailabilityCache>,
    max_concurrency: usize,
    deadline: Duration,
}

impl AvailabilityChecker {
    pub fn new(cache: Arc<dyn AvailabilityCache>, max_concurrency: usize, deadline: Duration) -> Self {
        Self {
            cache,
            max_concurrency: max_concurrency.max(1),
            deadline,
        }
    }

    /// Check `hashes` against every service.
    ///
    /// Never fails: a service that errors or runs past the deadline is listed
    /// in `failed_services` and its unanswered hashes stay unknown.
    pub async fn check(
        &self,
        hashes: &[String],
        services: &[Arc<dyn AvailabilityService>],
    ) -> AvailabilityReport {
        let hashes = normalize_hashes(hashes);
        let mut report = AvailabilityReport {
            services: services.iter().map(|s| s.name().to_string()).collect(),
            ..Default::default()
        };

        if hashes.is_empty() || services.is_empty() {
            return report;
        }

        let deadline = Instant::now() + self.deadline;
        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let hashes = Arc::new(hashes);
        let batch_concurrency = self.max_concurrency;
        let mut tasks = JoinSet::new();

        for service in services {
            let service = Arc::clone(service);
            let cache = Arc::clone(&self.cache);
            let semaphore = Arc::clone(&semaphore);
            let hashes = Arc::clone(&hashes);
            tasks.spawn(async move {
                // The semaphore is never closed.
                let _permit = semaphore.acquire_owned().await.ok();
                check_service(cache.as_ref(), service.as_ref(), &hashes, batch_concurrency).await
            });
        }

        let mut finished: HashSet<String> = HashSet::new();
        loop {
            match tokio::time::timeout_at(deadline, tasks.join_next()).await {
                Ok(Some(Ok(outcome))) => {
                    finished.insert(outcome.service.clone());
                    merge_outcome(&mut report, outcome);
                }
                Ok(Some(Err(e))) => {
                    warn!(error = %e, "Availability task panicked");
                }
                Ok(None) => break,
                Err(_) => {
                    tasks.abort_all();
                    warn!(
                        deadline_ms = self.deadline.as_millis() as u64,
                        "Availability check deadline reached, abandoning remaining services"
                    );
                    break;
                }
            }
        }

        // Services that never reported back (deadline or panic) count as failed.
        for name in report.services.clone() {
            if !finished.contains(&name) && !report.failed_services.contains(&name) {
                metrics::AVAILABILITY_LOOKUPS
                    .with_label_values(&[name.as_str(), "failed"])
                    .inc();
                report.failed_services.push(name);
            }
        }

        info!(
            hashes = hashes.len(),
            services = report.services.len(),
            cache_hits = report.cache_hits,
            fetched = report.fetched,
            failed = report.failed_services.len(),
            "Availability check complete"
        );

        report
    }
}

fn merge_outcome(report: &mut AvailabilityReport, outcome: ServiceOutcome) {
    report.cache_hits += outcome.cache_hits;
    report.fetched += outcome.fetched;
    if outcome.failed {
        report.failed_services.push(outcome.service);
    }
    for answer in outcome.answers {
        report.push(answer);
    }
}

/// Lowercase, drop blanks, dedupe preserving first occurrence.
fn normalize_hashes(hashes: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    hashes
        .iter()
        .map(|h| h.trim().to_lowercase())
        .filter(|h| !h.is_empty())
        .filter(|h| seen.insert(h.clone()))
        .collect()
}

async fn check_service(
    cache: &dyn AvailabilityCache,
    service: &dyn AvailabilityService,
    hashes: &[String],
    batch_concurrency: usize,
) -> ServiceOutcome {
    let name = service.name().to_string();

    let cached = match cache.get_many(hashes, &name) {
        Ok(cached) => cached,
        Err(e) => {
            warn!(service = %name, error = %e, "Availability cache read failed, treating as miss");
            HashMap::new()
        }
    };

    let remaining: Vec<String> = hashes
        .iter()
        .filter(|h| !cached.contains_key(*h))
        .cloned()
        .collect();

    let cache_hits = cached.len();
    if cache_hits > 0 {
        metrics::AVAILABILITY_LOOKUPS
            .with_label_values(&[name.as_str(), "cache_hit"])
            .inc_by(cache_hits as u64);
    }

    let mut answers: Vec<AvailabilityAnswer> = cached.into_values().collect();
    let mut failed = false;
    let mut fetched = 0;

    if !remaining.is_empty() {
        let width = if service.ordered() {
            1
        } else {
            batch_concurrency.max(1)
        };
        debug!(
            service = %name,
            hashes = remaining.len(),
            batch_limit = service.batch_limit(),
            width,
            "Checking availability"
        );

        let batches: Vec<_> = remaining
            .chunks(service.batch_limit().max(1))
            .map(move |batch| async move { (batch, service.check_batch(batch).await) })
            .collect();
        let mut results = stream::iter(batches).buffered(width);

        // Cache each batch as it lands; a deadline abort keeps finished ones.
        while let Some((batch, result)) = results.next().await {
            match result {
                Ok(found) => {
                    let expires_at = expiry_after(Utc::now(), service.answer_ttl());
                    let fresh: Vec<AvailabilityAnswer> = batch
                        .iter()
                        .filter_map(|hash| {
                            found.get(hash).map(|&is_cached| AvailabilityAnswer {
                                info_hash: hash.clone(),
                                service: name.clone(),
                                cached: is_cached,
                                expires_at,
                            })
                        })
                        .collect();
                    if fresh.is_empty() {
                        continue;
                    }
                    metrics::AVAILABILITY_LOOKUPS
                        .with_label_values(&[name.as_str(), "fetched"])
                        .inc_by(fresh.len() as u64);
                    if let Err(e) = cache.put_many(&fresh) {
                        warn!(service = %name, error = %e, "Failed to write availability cache");
                    }
                    fetched += fresh.len();
                    answers.extend(fresh);
                }
                Err(e) => {
                    warn!(service = %name, batch = batch.len(), error = %e, "Availability batch failed");
                    failed = true;
                }
            }
        }
    }

    if failed {
        metrics::AVAILABILITY_LOOKUPS
            .with_label_values(&[name.as_str(), "failed"])
            .inc();
    }

    ServiceOutcome {
        service: name,
        answers,
        cache_hits,
        fetched,
        failed,
    }
}
