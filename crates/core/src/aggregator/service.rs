//! Query to ranked list, end to end.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use crate::availability::{
    AvailabilityChecker, AvailabilityReport, AvailabilityService, HttpAvailabilityService,
};
use crate::cache::{open_caches, CacheHandles};
use crate::config::{Config, ProviderKind, ScraperConfig};
use crate::matcher::ReleaseMatcher;
use crate::metrics::{AGGREGATION_DURATION, RANKED_RESULTS};
use crate::provider::{ProviderAdapter, RawResult, StremioProvider};
use crate::query::Query;
use crate::ranking::{RankEngine, Ranking, UserFilters};
use crate::scraper::{ScraperOrchestrator, TtlPolicy};

use super::types::{AggregateError, AggregationResult};

/// Wires the scraper, availability checker and rank engine together.
pub struct SourceAggregator {
    providers: Vec<Arc<dyn ProviderAdapter>>,
    services: Vec<Arc<dyn AvailabilityService>>,
    scraper: ScraperOrchestrator,
    checker: AvailabilityChecker,
    engine: RankEngine,
    caches: CacheHandles,
    scraper_config: ScraperConfig,
    default_filters: UserFilters,
}

impl SourceAggregator {
    /// Build everything from configuration: cache backend, enabled providers
    /// and enabled availability services.
    pub fn from_config(config: &Config) -> Result<Self, AggregateError> {
        let caches = open_caches(&config.cache)?;
        let providers = build_providers(config)?;
        let services = build_services(config)?;
        Ok(Self::new(config, caches, providers, services))
    }

    /// Build with explicit collaborators. Pipeline settings still come from `config`.
    pub fn new(
        config: &Config,
        caches: CacheHandles,
        providers: Vec<Arc<dyn ProviderAdapter>>,
        services: Vec<Arc<dyn AvailabilityService>>,
    ) -> Self {
        let scraper = ScraperOrchestrator::new(
            Arc::clone(&caches.results),
            config.scraper.max_concurrency,
            TtlPolicy::from(&config.cache),
        );
        let checker = AvailabilityChecker::new(
            Arc::clone(&caches.availability),
            config.availability.max_concurrency,
            config.availability.deadline(),
        );

        Self {
            providers,
            services,
            scraper,
            checker,
            engine: RankEngine::new(ReleaseMatcher::new(config.matcher.clone())),
            caches,
            scraper_config: config.scraper.clone(),
            default_filters: config.filters.clone(),
        }
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    pub fn service_names(&self) -> Vec<&str> {
        self.services.iter().map(|s| s.name()).collect()
    }

    pub fn caches(&self) -> &CacheHandles {
        &self.caches
    }

    /// Filters applied when a request brings none.
    pub fn default_filters(&self) -> &UserFilters {
        &self.default_filters
    }

    /// Scrape, check availability and rank.
    ///
    /// Only an invalid query or an empty provider list fail; everything else
    /// degrades to fewer results.
    pub async fn aggregate(
        &self,
        query: &Query,
        filters: &UserFilters,
    ) -> Result<AggregationResult, AggregateError> {
        let request_id = Uuid::new_v4().to_string();
        let span = info_span!("aggregate", request_id = %request_id, kind = query.kind.as_str());
        let started = Instant::now();

        let outcome = self
            .run(request_id, query, filters, started)
            .instrument(span)
            .await;

        let label = match &outcome {
            Ok(_) => "ok",
            Err(e) => e.metric_label(),
        };
        AGGREGATION_DURATION
            .with_label_values(&[label])
            .observe(started.elapsed().as_secs_f64());

        outcome
    }

    async fn run(
        &self,
        request_id: String,
        query: &Query,
        filters: &UserFilters,
        started: Instant,
    ) -> Result<AggregationResult, AggregateError> {
        let scrape = self
            .scraper
            .scrape(
                query,
                &self.providers,
                self.scraper_config.provider_timeout(),
                self.scraper_config.overall_deadline(),
            )
            .await?;

        let hashes = self.matched_hashes(query, &scrape.results);
        let availability = self.checker.check(&hashes, &self.services).await;

        let ranking = self
            .engine
            .rank_detailed(&scrape.results, query, &availability, filters);
        RANKED_RESULTS
            .with_label_values(&[])
            .observe(ranking.results.len() as f64);

        let duration_ms = started.elapsed().as_millis() as u64;
        info!(
            raw = scrape.results.len(),
            ranked = ranking.results.len(),
            hashes = hashes.len(),
            deadline_hit = scrape.deadline_hit,
            duration_ms,
            "Aggregation complete"
        );

        Ok(AggregationResult {
            request_id,
            query: query.clone(),
            ranked: ranking.results,
            raw_results: scrape.results,
            availability,
            reports: scrape.reports,
            stats: ranking.stats,
            deadline_hit: scrape.deadline_hit,
            duration_ms,
        })
    }

    /// Re-run filtering and ranking on a previous result's frozen inputs.
    pub fn rerank(&self, previous: &AggregationResult, filters: &UserFilters) -> Ranking {
        self.engine.rank_detailed(
            &previous.raw_results,
            &previous.query,
            &previous.availability,
            filters,
        )
    }

    /// Rank a caller-supplied raw set. No provider or service is contacted.
    pub fn rank_frozen(
        &self,
        query: &Query,
        raw: &[RawResult],
        availability: &AvailabilityReport,
        filters: &UserFilters,
    ) -> Result<Ranking, AggregateError> {
        query.validate()?;
        Ok(self.engine.rank_detailed(raw, query, availability, filters))
    }

    /// Hashes of results that match the query, in first-seen order.
    fn matched_hashes(&self, query: &Query, results: &[RawResult]) -> Vec<String> {
        let mut hashes: Vec<String> = Vec::new();
        for result in results {
            let Some(hash) = result.normalized_hash() else {
                continue;
            };
            if hashes.contains(&hash) {
                continue;
            }
            if self.engine.matcher().matches(query, &result.release_name).matched {
                hashes.push(hash);
            }
        }
        hashes
    }
}

fn build_providers(config: &Config) -> Result<Vec<Arc<dyn ProviderAdapter>>, AggregateError> {
    let mut providers: Vec<Arc<dyn ProviderAdapter>> = Vec::new();
    for provider in config.providers.iter().filter(|p| p.enabled) {
        let timeout = provider
            .timeout_secs
            .map(Duration::from_secs)
            .unwrap_or_else(|| config.scraper.provider_timeout());

        match provider.kind {
            ProviderKind::Stremio => {
                let mut adapter = StremioProvider::new(&provider.name, &provider.url, timeout)
                    .map_err(|e| {
                        AggregateError::ProviderSetup(format!("{}: {}", provider.name, e))
                    })?;
                if provider.timeout_secs.is_some() {
                    adapter = adapter.with_call_timeout(timeout);
                }
                providers.push(Arc::new(adapter));
            }
        }
    }
    Ok(providers)
}

fn build_services(config: &Config) -> Result<Vec<Arc<dyn AvailabilityService>>, AggregateError> {
    let timeout = config.availability.deadline();
    config
        .availability
        .services
        .iter()
        .filter(|s| s.enabled)
        .map(|s| {
            HttpAvailabilityService::new(s, timeout)
                .map(|service| Arc::new(service) as Arc<dyn AvailabilityService>)
                .map_err(|e| AggregateError::ServiceSetup(format!("{}: {}", s.name, e)))
        })
        .collect()
}
