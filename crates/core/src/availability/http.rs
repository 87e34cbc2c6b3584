//! Generic HTTP batch availability service.
//!
//! Speaks the common "POST a list of hashes, get back the available ones"
//! shape: request `{"hashes": [...]}`, response `{"available": [{"hash": ...}]}`.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{AvailabilityError, AvailabilityService};
use crate::config::AvailabilityServiceConfig;

/// Availability service reached over HTTP.
pub struct HttpAvailabilityService {
    name: String,
    url: String,
    api_key: Option<String>,
    batch_limit: usize,
    answer_ttl: Duration,
    ordered: bool,
    client: Client,
}

#[derive(Serialize)]
struct BatchRequest<'a> {
    hashes: &'a [String],
}

#[derive(Deserialize)]
struct BatchResponse {
    #[serde(default)]
    available: Vec<AvailableEntry>,
}

#[derive(Deserialize)]
struct AvailableEntry {
    #[serde(default)]
    hash: Option<String>,
}

impl HttpAvailabilityService {
    pub fn new(config: &AvailabilityServiceConfig, timeout: Duration) -> Result<Self, AvailabilityError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("sourcerer/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AvailabilityError::ConnectionFailed(e.to_string()))?;

        Ok(Self {
            name: config.name.clone(),
            url: config.url.clone(),
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
            batch_limit: config.batch_limit,
            answer_ttl: Duration::from_secs(config.ttl_hours.saturating_mul(3600)),
            ordered: config.ordered,
            client,
        })
    }
}

#[async_trait]
impl AvailabilityService for HttpAvailabilityService {
    fn name(&self) -> &str {
        &self.name
    }

    fn batch_limit(&self) -> usize {
        self.batch_limit
    }

    fn ordered(&self) -> bool {
        self.ordered
    }

    fn answer_ttl(&self) -> Duration {
        self.answer_ttl
    }

    async fn check_batch(&self, hashes: &[String]) -> Result<HashMap<String, bool>, AvailabilityError> {
        let sendable: Vec<String> = hashes
            .iter()
            .filter(|h| is_valid_info_hash(h))
            .map(|h| h.to_lowercase())
            .collect();

        if sendable.is_empty() {
            return Ok(HashMap::new());
        }

        debug!(service = %self.name, hashes = sendable.len(), "Sending availability batch");

        let mut request = self
            .client
            .post(&self.url)
            .json(&BatchRequest { hashes: &sendable });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                AvailabilityError::Timeout
            } else if e.is_connect() {
                AvailabilityError::ConnectionFailed(e.to_string())
            } else {
                AvailabilityError::ApiError(e.to_string())
            }
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AvailabilityError::ApiError(format!(
                "HTTP {}: {}",
                status,
                body.chars().take(200).collect::<String>()
            )));
        }

        let body: BatchResponse = response
            .json()
            .await
            .map_err(|e| AvailabilityError::MalformedResponse(e.to_string()))?;

        Ok(merge_response(&sendable, body))
    }
}

/// Every sent hash is answered: listed ones are cached, the rest are not.
fn merge_response(sent: &[String], body: BatchResponse) -> HashMap<String, bool> {
    let mut answers: HashMap<String, bool> = sent.iter().map(|h| (h.clone(), false)).collect();
    for entry in body.available {
        if let Some(hash) = entry.hash {
            let hash = hash.to_lowercase();
            if let Some(cached) = answers.get_mut(&hash) {
                *cached = true;
            }
        }
    }
    answers
}

/// 40-character hex BitTorrent v1 info hash.
pub fn is_valid_info_hash(hash: &str) -> bool {
    hash.len() == 40 && hash.chars().all(|c| c.is_ascii_hexdigit())
}
