//! Availability checking against external debrid cache services.

mod checker;
mod http;
mod types;

pub use checker::AvailabilityChecker;
pub use http::{is_valid_info_hash, HttpAvailabilityService};
pub use types::*;
