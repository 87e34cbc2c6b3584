//! Provider adapters: pluggable sources of raw candidates.
//!
//! The scraper invokes every adapter uniformly through [`ProviderAdapter`].
//! [`StremioProvider`] covers any Stremio addon exposing stream resources.

mod stremio;
mod types;

pub use stremio::StremioProvider;
pub use types::*;
