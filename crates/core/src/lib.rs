pub mod aggregator;
pub mod availability;
pub mod cache;
pub mod config;
pub mod matcher;
pub mod metrics;
pub mod provider;
pub mod query;
pub mod ranking;
pub mod scraper;
pub mod testing;

pub use aggregator::{AggregateError, AggregationResult, SourceAggregator};
pub use availability::{
    AvailabilityChecker, AvailabilityReport, AvailabilityService, AvailabilityStatus,
    HttpAvailabilityService,
};
pub use cache::{open_caches, CacheError, CacheHandles, MemoryCache, SqliteCache};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, SanitizedConfig,
};
pub use matcher::{extract_attributes, MatchOutcome, Quality, ReleaseAttributes, ReleaseMatcher};
pub use provider::{ProviderAdapter, ProviderError, RawResult, SourceKind, StremioProvider};
pub use query::{MediaKind, Query, QueryError, QueryKey};
pub use ranking::{PackPolicy, RankEngine, RankedResult, Ranking, UserFilters};
pub use scraper::{ProviderReport, ProviderStatus, ScrapeError, ScrapeOutcome, ScraperOrchestrator};
