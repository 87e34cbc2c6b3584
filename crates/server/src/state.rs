use sha2::{Digest, Sha256};
use sourcerer_core::{Config, SanitizedConfig, SourceAggregator};

/// Shared application state
pub struct AppState {
    config: Config,
    config_hash: String,
    aggregator: SourceAggregator,
}

impl AppState {
    pub fn new(config: Config, aggregator: SourceAggregator) -> Self {
        let config_json = serde_json::to_string(&config).unwrap_or_default();
        let config_hash = format!("{:x}", Sha256::digest(config_json.as_bytes()));

        Self {
            config,
            config_hash,
            aggregator,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    /// Short fingerprint of the loaded configuration.
    pub fn config_hash(&self) -> &str {
        &self.config_hash[..16]
    }

    pub fn aggregator(&self) -> &SourceAggregator {
        &self.aggregator
    }
}
