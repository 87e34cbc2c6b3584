use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::time::Duration;

use crate::ranking::UserFilters;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub scraper: ScraperConfig,
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
    #[serde(default)]
    pub availability: AvailabilityConfig,
    #[serde(default)]
    pub matcher: MatcherConfig,
    /// Filters applied when a request carries none.
    #[serde(default)]
    pub filters: UserFilters,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    8080
}

/// Cache storage backend
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CacheBackend {
    #[default]
    Sqlite,
    Memory,
}

/// Result/availability cache configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub backend: CacheBackend,
    /// SQLite database path (sqlite backend)
    #[serde(default = "default_cache_path")]
    pub path: PathBuf,
    /// Row ceiling per cache (memory backend)
    #[serde(default = "default_memory_max_entries")]
    pub memory_max_entries: usize,
    /// How long scraped movie results stay fresh
    #[serde(default = "default_movie_ttl_hours")]
    pub movie_ttl_hours: u64,
    /// How long scraped episode results stay fresh
    #[serde(default = "default_episode_ttl_hours")]
    pub episode_ttl_hours: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::default(),
            path: default_cache_path(),
            memory_max_entries: default_memory_max_entries(),
            movie_ttl_hours: default_movie_ttl_hours(),
            episode_ttl_hours: default_episode_ttl_hours(),
        }
    }
}

fn default_cache_path() -> PathBuf {
    PathBuf::from("sourcerer.db")
}

fn default_memory_max_entries() -> usize {
    10_000
}

fn default_movie_ttl_hours() -> u64 {
    48
}

fn default_episode_ttl_hours() -> u64 {
    24
}

/// Scraper orchestrator configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScraperConfig {
    /// Worker ceiling, independent of the provider count
    #[serde(default = "default_scraper_concurrency")]
    pub max_concurrency: usize,
    /// Per-provider call timeout
    #[serde(default = "default_provider_timeout")]
    pub provider_timeout_secs: u64,
    /// Deadline for the whole fan-out
    #[serde(default = "default_overall_deadline")]
    pub overall_deadline_secs: u64,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_scraper_concurrency(),
            provider_timeout_secs: default_provider_timeout(),
            overall_deadline_secs: default_overall_deadline(),
        }
    }
}

impl ScraperConfig {
    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider_timeout_secs)
    }

    pub fn overall_deadline(&self) -> Duration {
        Duration::from_secs(self.overall_deadline_secs)
    }
}

fn default_scraper_concurrency() -> usize {
    8
}

fn default_provider_timeout() -> u64 {
    10
}

fn default_overall_deadline() -> u64 {
    20
}

/// Provider adapter kinds
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    #[default]
    Stremio,
}

/// One configured provider
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderConfig {
    /// Unique provider name (used in reports and cache keys)
    pub name: String,
    #[serde(default)]
    pub kind: ProviderKind,
    /// Base URL (for Stremio addons, with or without `/manifest.json`)
    pub url: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Overrides `scraper.provider_timeout_secs` for this provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

fn default_true() -> bool {
    true
}

/// Availability checker configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AvailabilityConfig {
    /// Ceiling on services checked at once
    #[serde(default = "default_availability_concurrency")]
    pub max_concurrency: usize,
    /// Deadline for the whole check
    #[serde(default = "default_availability_deadline")]
    pub deadline_secs: u64,
    #[serde(default)]
    pub services: Vec<AvailabilityServiceConfig>,
}

impl Default for AvailabilityConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_availability_concurrency(),
            deadline_secs: default_availability_deadline(),
            services: Vec::new(),
        }
    }
}

impl AvailabilityConfig {
    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.deadline_secs)
    }
}

fn default_availability_concurrency() -> usize {
    4
}

fn default_availability_deadline() -> u64 {
    15
}

/// One external availability (debrid cache) service
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AvailabilityServiceConfig {
    /// Unique service name (stored with every answer)
    pub name: String,
    /// Batch endpoint URL
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Maximum hashes per request
    #[serde(default = "default_batch_limit")]
    pub batch_limit: usize,
    /// How long an answer stays trustworthy
    #[serde(default = "default_answer_ttl_hours")]
    pub ttl_hours: u64,
    /// Whether the service needs its batches sent one after another
    #[serde(default = "default_true")]
    pub ordered: bool,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_batch_limit() -> usize {
    100
}

fn default_answer_ttl_hours() -> u64 {
    24
}

/// Release matcher configuration
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct MatcherConfig {
    /// Minimum similarity for a fuzzy title match, in (0, 1]
    #[serde(default = "default_fuzzy_threshold")]
    pub fuzzy_threshold: f64,
    /// Accepted distance between the stated and requested year
    #[serde(default = "default_year_tolerance")]
    pub year_tolerance: u16,
    /// Accept absolute-numbered episode releases ("Show - 105")
    #[serde(default)]
    pub allow_absolute_numbering: bool,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            fuzzy_threshold: default_fuzzy_threshold(),
            year_tolerance: default_year_tolerance(),
            allow_absolute_numbering: false,
        }
    }
}

fn default_fuzzy_threshold() -> f64 {
    0.85
}

fn default_year_tolerance() -> u16 {
    1
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub cache: CacheConfig,
    pub scraper: ScraperConfig,
    pub providers: Vec<SanitizedProviderConfig>,
    pub availability: SanitizedAvailabilityConfig,
    pub matcher: MatcherConfig,
    pub filters: UserFilters,
}

/// Provider config without its URL (addon URLs often embed credentials)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedProviderConfig {
    pub name: String,
    pub kind: ProviderKind,
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedAvailabilityConfig {
    pub max_concurrency: usize,
    pub deadline_secs: u64,
    pub services: Vec<SanitizedServiceConfig>,
}

/// Service config (API key hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedServiceConfig {
    pub name: String,
    pub url: String,
    pub api_key_configured: bool,
    pub batch_limit: usize,
    pub ttl_hours: u64,
    pub ordered: bool,
    pub enabled: bool,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            cache: config.cache.clone(),
            scraper: config.scraper.clone(),
            providers: config
                .providers
                .iter()
                .map(|p| SanitizedProviderConfig {
                    name: p.name.clone(),
                    kind: p.kind,
                    enabled: p.enabled,
                    timeout_secs: p.timeout_secs,
                })
                .collect(),
            availability: SanitizedAvailabilityConfig {
                max_concurrency: config.availability.max_concurrency,
                deadline_secs: config.availability.deadline_secs,
                services: config
                    .availability
                    .services
                    .iter()
                    .map(|s| SanitizedServiceConfig {
                        name: s.name.clone(),
                        url: s.url.clone(),
                        api_key_configured: s.api_key.as_deref().is_some_and(|k| !k.is_empty()),
                        batch_limit: s.batch_limit,
                        ttl_hours: s.ttl_hours,
                        ordered: s.ordered,
                        enabled: s.enabled,
                    })
                    .collect(),
            },
            matcher: config.matcher.clone(),
            filters: config.filters.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host.to_string(), "0.0.0.0");
        assert_eq!(config.cache.backend, CacheBackend::Sqlite);
        assert_eq!(config.cache.path.to_str().unwrap(), "sourcerer.db");
        assert_eq!(config.cache.memory_max_entries, 10_000);
        assert_eq!(config.scraper.max_concurrency, 8);
        assert_eq!(config.scraper.provider_timeout(), Duration::from_secs(10));
        assert_eq!(config.scraper.overall_deadline(), Duration::from_secs(20));
        assert_eq!(config.availability.max_concurrency, 4);
        assert_eq!(config.matcher.fuzzy_threshold, 0.85);
        assert_eq!(config.matcher.year_tolerance, 1);
        assert!(!config.matcher.allow_absolute_numbering);
        assert!(config.providers.is_empty());
    }

    #[test]
    fn test_deserialize_full_config() {
        let toml = r#"
[server]
host = "127.0.0.1"
port = 9000

[cache]
backend = "memory"
memory_max_entries = 500
movie_ttl_hours = 12

[scraper]
max_concurrency = 4
provider_timeout_secs = 5
overall_deadline_secs = 8

[[providers]]
name = "torrentio"
url = "https://torrentio.example/manifest.json"

[[providers]]
name = "other"
kind = "stremio"
url = "https://other.example"
enabled = false
timeout_secs = 3

[availability]
max_concurrency = 2

[[availability.services]]
name = "debrid"
url = "https://debrid.example/api/availability"
api_key = "secret"
batch_limit = 50

[matcher]
fuzzy_threshold = 0.9
allow_absolute_numbering = true

[filters]
min_quality = "720p"
excluded_codecs = []
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.cache.backend, CacheBackend::Memory);
        assert_eq!(config.cache.memory_max_entries, 500);
        assert_eq!(config.cache.movie_ttl_hours, 12);
        assert_eq!(config.cache.episode_ttl_hours, 24);
        assert_eq!(config.scraper.max_concurrency, 4);

        assert_eq!(config.providers.len(), 2);
        assert_eq!(config.providers[0].kind, ProviderKind::Stremio);
        assert!(config.providers[0].enabled);
        assert!(!config.providers[1].enabled);
        assert_eq!(config.providers[1].timeout_secs, Some(3));

        let service = &config.availability.services[0];
        assert_eq!(service.batch_limit, 50);
        assert_eq!(service.ttl_hours, 24);
        assert!(service.ordered);
        assert!(service.enabled);

        assert_eq!(config.matcher.fuzzy_threshold, 0.9);
        assert!(config.matcher.allow_absolute_numbering);
        assert!(config.filters.excluded_codecs.is_empty());
    }

    #[test]
    fn test_sanitized_config_hides_secrets() {
        let mut config = Config::default();
        config.providers.push(ProviderConfig {
            name: "addon".to_string(),
            kind: ProviderKind::Stremio,
            url: "https://addon.example/realdebrid=KEY/manifest.json".to_string(),
            enabled: true,
            timeout_secs: None,
        });
        config.availability.services.push(AvailabilityServiceConfig {
            name: "debrid".to_string(),
            url: "https://debrid.example".to_string(),
            api_key: Some("secret-key".to_string()),
            batch_limit: 100,
            ttl_hours: 24,
            ordered: true,
            enabled: true,
        });

        let sanitized = SanitizedConfig::from(&config);
        assert!(sanitized.availability.services[0].api_key_configured);

        let json = serde_json::to_string(&sanitized).unwrap();
        assert!(!json.contains("secret-key"));
        assert!(!json.contains("realdebrid=KEY"));
        assert!(json.contains("\"api_key_configured\":true"));
    }
}
