//! Filter & rank engine.
//!
//! Turns the merged provider output into the list a client sees: release
//! matching, hash dedupe, user filters, availability annotation and a
//! deterministic composite sort.

mod engine;
mod filters;
mod types;

pub use engine::RankEngine;
pub use types::*;
