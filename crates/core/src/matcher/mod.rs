//! Release matching.
//!
//! Decides whether a free-text release name plausibly is the requested
//! movie or episode, and extracts structured attributes (quality, codec,
//! dynamic range, audio, languages, source, group) from it. Everything here
//! is pure and synchronous.

mod attributes;
mod normalize;
mod parser;
mod release;
mod seasons;
mod types;

pub use attributes::extract_attributes;
pub use normalize::{levenshtein_distance, normalize_title, similarity};
pub use parser::{parse_release, ParsedRelease};
pub use release::ReleaseMatcher;
pub use seasons::{find_episode_marker, find_season_span, EpisodeMarker, SeasonSpan};
pub use types::*;
