//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Scraper (provider calls, result cache, deadline expirations)
//! - Availability checks
//! - Ranking and end-to-end aggregation

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Scraper Metrics
// =============================================================================

/// Provider calls by outcome.
pub static PROVIDER_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "sourcerer_provider_requests_total",
            "Total provider lookups by outcome",
        ),
        &["provider", "result"], // "cache_hit", "fetched", "failed", "timed_out", "abandoned"
    )
    .unwrap()
});

/// Provider call duration in seconds (network calls only).
pub static PROVIDER_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "sourcerer_provider_duration_seconds",
            "Duration of provider fetch calls",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        &["provider"],
    )
    .unwrap()
});

/// Result cache lookups by outcome.
pub static RESULT_CACHE_LOOKUPS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "sourcerer_result_cache_lookups_total",
            "Total result cache lookups",
        ),
        &["outcome"], // "fresh", "stale", "miss", "error"
    )
    .unwrap()
});

/// Scrapes cut short by the overall deadline.
pub static SCRAPE_DEADLINE_EXPIRED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "sourcerer_scrape_deadline_expired_total",
        "Scrapes that hit the overall deadline",
    )
    .unwrap()
});

// =============================================================================
// Availability Metrics
// =============================================================================

/// Availability answers by service and outcome.
pub static AVAILABILITY_LOOKUPS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "sourcerer_availability_lookups_total",
            "Total availability answers by origin",
        ),
        &["service", "outcome"], // "cache_hit", "fetched", "failed"
    )
    .unwrap()
});

// =============================================================================
// Ranking / Aggregation Metrics
// =============================================================================

/// Ranked results returned per aggregation.
pub static RANKED_RESULTS: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "sourcerer_ranked_results",
            "Number of ranked results returned per aggregation",
        )
        .buckets(vec![0.0, 1.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0]),
        &[],
    )
    .unwrap()
});

/// End-to-end aggregation duration in seconds.
pub static AGGREGATION_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "sourcerer_aggregation_duration_seconds",
            "Duration of query to ranked list aggregation",
        )
        .buckets(vec![0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 20.0, 30.0]),
        &["result"], // "ok", "invalid_query", "no_providers"
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Scraper
        Box::new(PROVIDER_REQUESTS.clone()),
        Box::new(PROVIDER_DURATION.clone()),
        Box::new(RESULT_CACHE_LOOKUPS.clone()),
        Box::new(SCRAPE_DEADLINE_EXPIRED.clone()),
        // Availability
        Box::new(AVAILABILITY_LOOKUPS.clone()),
        // Aggregation
        Box::new(RANKED_RESULTS.clone()),
        Box::new(AGGREGATION_DURATION.clone()),
    ]
}
