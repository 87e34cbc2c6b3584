//! End-to-end aggregation: query, scrape, match, availability, rank.

mod service;
mod types;

pub use service::SourceAggregator;
pub use types::{AggregateError, AggregationResult};
