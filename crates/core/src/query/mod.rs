//! The request value every stage of the pipeline reads.

mod types;

pub use types::*;
