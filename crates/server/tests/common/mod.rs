//! Common test utilities for in-process API testing with mocks.
//!
//! This module provides a test fixture that builds the router around a
//! `SourceAggregator` wired to mock providers and availability services,
//! enabling API tests without real addons or debrid services.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use sourcerer_core::{
    availability::AvailabilityService,
    provider::ProviderAdapter,
    testing::{MockAvailabilityService, MockProvider},
    CacheHandles, Config, MemoryCache, SourceAggregator,
};
use sourcerer_server::{api::create_router, state::AppState};

/// Re-export fixtures for test convenience
pub use sourcerer_core::testing::fixtures;

/// Test fixture with controllable mocks.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_sources() {
///     let fixture = TestFixture::new();
///     fixture.provider.set_results(vec![fixtures::torrent("mock", "Alpha.2020.1080p", 1, 10)]);
///
///     let response = fixture.post("/api/v1/sources", json!({ "query": { ... } })).await;
///     assert_eq!(response.status, 200);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Mock provider - configure scrape results
    pub provider: Arc<MockProvider>,
    /// Mock availability service - configure cached hashes
    pub service: Arc<MockAvailabilityService>,
    /// Shared cache backing both caches
    pub cache: Arc<MemoryCache>,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestFixture {
    /// Fixture with one mock provider and one mock availability service.
    pub fn new() -> Self {
        Self::with_mocks(
            MockProvider::new("mock"),
            MockAvailabilityService::new("debrid"),
            true,
        )
    }

    /// Fixture whose aggregator has no providers at all.
    pub fn without_providers() -> Self {
        Self::with_mocks(
            MockProvider::new("mock"),
            MockAvailabilityService::new("debrid"),
            false,
        )
    }

    pub fn with_mocks(
        provider: MockProvider,
        service: MockAvailabilityService,
        enable_provider: bool,
    ) -> Self {
        let config = Config::default();
        let provider = Arc::new(provider);
        let service = Arc::new(service);
        let cache = Arc::new(MemoryCache::new(1_000));

        let providers: Vec<Arc<dyn ProviderAdapter>> = if enable_provider {
            vec![Arc::clone(&provider) as Arc<dyn ProviderAdapter>]
        } else {
            Vec::new()
        };
        let services = vec![Arc::clone(&service) as Arc<dyn AvailabilityService>];

        let aggregator = SourceAggregator::new(
            &config,
            CacheHandles::shared(Arc::clone(&cache)),
            providers,
            services,
        );
        let router = create_router(Arc::new(AppState::new(config, aggregator)));

        Self {
            router,
            provider,
            service,
            cache,
        }
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// Send a POST request without a body.
    pub async fn post_empty(&self, path: &str) -> TestResponse {
        self.request("POST", path, None).await
    }

    /// Send a DELETE request.
    pub async fn delete(&self, path: &str) -> TestResponse {
        self.request("DELETE", path, None).await
    }

    /// Send a request to the test server.
    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        let request = request_builder.body(body).unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}
