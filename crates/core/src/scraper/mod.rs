//! Scraper orchestrator: cache-first fan-out to providers under a fixed
//! worker ceiling, a per-provider timeout and an overall deadline.

mod orchestrator;
mod types;

pub use orchestrator::ScraperOrchestrator;
pub use types::*;
