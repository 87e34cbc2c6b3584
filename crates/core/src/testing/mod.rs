//! Testing utilities and mock implementations for integration tests.
//!
//! This module provides mock implementations of the provider and
//! availability-service traits, allowing end-to-end pipeline tests without
//! real addons or debrid services.
//!
//! # Example
//!
//! ```rust,ignore
//! use sourcerer_core::testing::{fixtures, MockAvailabilityService, MockProvider};
//!
//! let provider = MockProvider::new("indexer")
//!     .with_results(vec![fixtures::torrent("indexer", "Alpha.2020.1080p.WEB.x264-GRP", 1, 50)]);
//! let service = MockAvailabilityService::new("debrid").with_cached([fixtures::info_hash(1)]);
//! ```

mod mock_availability;
mod mock_provider;

pub use mock_availability::MockAvailabilityService;
pub use mock_provider::MockProvider;

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::provider::{RawResult, SourceKind};
    use crate::query::Query;

    /// Deterministic 40-character hex info hash for a small id.
    pub fn info_hash(id: u32) -> String {
        format!("{:040x}", id)
    }

    /// The "Alpha (2020)" movie query used across tests.
    pub fn alpha_query() -> Query {
        Query::movie(1001, "Alpha", 2020).with_imdb_id("tt1001")
    }

    /// Episode query with an IMDb id.
    pub fn episode_query(title: &str, season: u32, episode: u32) -> Query {
        Query::episode(2002, title, season, episode).with_imdb_id("tt2002")
    }

    /// Torrent result with a fixture hash, 2 GB size and the given seeders.
    pub fn torrent(provider: &str, release_name: &str, hash_id: u32, seeders: u32) -> RawResult {
        RawResult::torrent(provider, release_name, info_hash(hash_id))
            .with_size(2 * 1024 * 1024 * 1024)
            .with_seeders(seeders)
    }

    /// Direct-link result (no hash).
    pub fn direct(provider: &str, release_name: &str, url: &str) -> RawResult {
        RawResult::link(provider, release_name, url, SourceKind::Direct)
            .with_size(1024 * 1024 * 1024)
    }
}
