use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::availability::AvailabilityStatus;
use crate::matcher::{PackInfo, Quality, ReleaseAttributes, VideoCodec};
use crate::provider::RawResult;

/// What to do with season and show packs.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PackPolicy {
    #[default]
    Include,
    Exclude,
    Only,
}

/// User-configured filters and ranking preferences.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserFilters {
    /// Lowest acceptable quality
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_quality: Option<Quality>,
    /// Highest acceptable quality
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_quality: Option<Quality>,
    #[serde(default = "default_excluded_codecs")]
    pub excluded_codecs: Vec<VideoCodec>,
    /// Keep only releases in one of these languages (ISO 639-1). Empty keeps all.
    #[serde(default)]
    pub include_languages: Vec<String>,
    /// Drop releases whose every language is listed here.
    #[serde(default)]
    pub exclude_languages: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_size_bytes: Option<u64>,
    #[serde(default)]
    pub pack_policy: PackPolicy,
    /// Minimum seeders for torrent results
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_seeders: Option<u32>,
    /// Drop CAM/TS/TC/screener releases
    #[serde(default = "default_true")]
    pub exclude_low_quality_sources: bool,
    /// Drop hashes every checked service reported as uncached
    #[serde(default)]
    pub hide_uncached: bool,
    #[serde(default)]
    pub exclude_dolby_vision: bool,
    #[serde(default)]
    pub exclude_hdr: bool,
    /// Providers listed here sort first, in this order
    #[serde(default)]
    pub priority_providers: Vec<String>,
    /// Preferred quality order, best first. Unlisted tiers sort last.
    #[serde(default = "default_quality_ranking")]
    pub quality_ranking: Vec<Quality>,
}

impl Default for UserFilters {
    fn default() -> Self {
        Self {
            min_quality: None,
            max_quality: None,
            excluded_codecs: default_excluded_codecs(),
            include_languages: Vec::new(),
            exclude_languages: Vec::new(),
            max_size_bytes: None,
            pack_policy: PackPolicy::default(),
            min_seeders: None,
            exclude_low_quality_sources: true,
            hide_uncached: false,
            exclude_dolby_vision: false,
            exclude_hdr: false,
            priority_providers: Vec::new(),
            quality_ranking: default_quality_ranking(),
        }
    }
}

fn default_excluded_codecs() -> Vec<VideoCodec> {
    vec![VideoCodec::Av1]
}

fn default_true() -> bool {
    true
}

fn default_quality_ranking() -> Vec<Quality> {
    vec![Quality::P2160, Quality::P1080, Quality::P720, Quality::Sd]
}

/// Why a matched, deduplicated result was filtered out.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FilterReason {
    Quality,
    Codec,
    DynamicRange,
    LowQualitySource,
    Language,
    Size,
    Pack,
    Seeders,
    Uncached,
}

/// Composite ordering key. Lower sorts first.
///
/// Compared field by field: priority provider rank, availability rank,
/// quality rank, seeders (descending), then input position.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SortKey {
    pub priority: usize,
    pub availability: u8,
    pub quality: usize,
    pub seeders: u32,
    pub ordinal: usize,
}

impl Ord for SortKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then(self.availability.cmp(&other.availability))
            .then(self.quality.cmp(&other.quality))
            .then(other.seeders.cmp(&self.seeders))
            .then(self.ordinal.cmp(&other.ordinal))
    }
}

impl PartialOrd for SortKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A raw result that survived matching, dedupe and filtering.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RankedResult {
    #[serde(flatten)]
    pub result: RawResult,
    /// Always true for ranked output.
    pub matched: bool,
    pub quality: Quality,
    pub attributes: ReleaseAttributes,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pack: Option<PackInfo>,
    /// Availability of hash-bearing results; None for plain links.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub availability: Option<AvailabilityStatus>,
    /// Service that has the hash cached.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debrid_service: Option<String>,
    /// Display label: `cached:<service>`, `uncached`, `unknown`, or the link kind.
    pub cache_provider: String,
    pub sort_key: SortKey,
}

/// Counters describing what one ranking pass removed.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RankStats {
    pub input: usize,
    pub rejected_by_matcher: usize,
    pub duplicates: usize,
    pub filtered: BTreeMap<FilterReason, usize>,
    pub output: usize,
}

/// Ranked results plus counters.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Ranking {
    pub results: Vec<RankedResult>,
    pub stats: RankStats,
}
