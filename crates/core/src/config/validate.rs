use std::collections::HashSet;

use super::{types::Config, ConfigError};

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.scraper.max_concurrency == 0 {
        return Err(ConfigError::ValidationError(
            "scraper.max_concurrency must be at least 1".to_string(),
        ));
    }

    if config.scraper.provider_timeout_secs == 0 || config.scraper.overall_deadline_secs == 0 {
        return Err(ConfigError::ValidationError(
            "scraper timeouts must be greater than zero".to_string(),
        ));
    }

    if config.cache.memory_max_entries == 0 {
        return Err(ConfigError::ValidationError(
            "cache.memory_max_entries must be at least 1".to_string(),
        ));
    }

    let mut provider_names = HashSet::new();
    for provider in &config.providers {
        if provider.name.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "provider name cannot be empty".to_string(),
            ));
        }
        if !provider_names.insert(provider.name.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "duplicate provider name: {}",
                provider.name
            )));
        }
        if !provider.url.starts_with("http://") && !provider.url.starts_with("https://") {
            return Err(ConfigError::ValidationError(format!(
                "provider {} url must be http(s)",
                provider.name
            )));
        }
        if provider.timeout_secs == Some(0) {
            return Err(ConfigError::ValidationError(format!(
                "provider {} timeout_secs must be greater than zero",
                provider.name
            )));
        }
    }

    if config.availability.max_concurrency == 0 {
        return Err(ConfigError::ValidationError(
            "availability.max_concurrency must be at least 1".to_string(),
        ));
    }

    let mut service_names = HashSet::new();
    for service in &config.availability.services {
        if service.name.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "availability service name cannot be empty".to_string(),
            ));
        }
        if !service_names.insert(service.name.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "duplicate availability service name: {}",
                service.name
            )));
        }
        if service.batch_limit == 0 {
            return Err(ConfigError::ValidationError(format!(
                "availability service {} batch_limit must be at least 1",
                service.name
            )));
        }
    }

    let threshold = config.matcher.fuzzy_threshold;
    if !(threshold > 0.0 && threshold <= 1.0) {
        return Err(ConfigError::ValidationError(format!(
            "matcher.fuzzy_threshold must be in (0, 1], got {}",
            threshold
        )));
    }

    if let (Some(min), Some(max)) = (config.filters.min_quality, config.filters.max_quality) {
        if min > max {
            return Err(ConfigError::ValidationError(format!(
                "filters.min_quality ({}) is above filters.max_quality ({})",
                min.as_str(),
                max.as_str()
            )));
        }
    }

    Ok(())
}
