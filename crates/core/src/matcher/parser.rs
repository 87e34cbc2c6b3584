//! Splits a free-text release name into title, year and the remainder.

use once_cell::sync::Lazy;
use regex_lite::Regex;

use super::normalize::title_tokens;
use super::seasons::ordinal_value;

static EXTENSION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\.(?:mkv|mp4|avi|m4v|wmv|mov|webm|mpe?g|m2ts|iso)$").unwrap()
});
static LEADING_BRACKETS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(?:\[[^\]]*\]\s*)+").unwrap());
static SITE_PREFIX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^\s*(?:www\.[a-z0-9-]+\.[a-z]{2,6}[\s.\-]+|[a-z0-9-]+\.(?:com|org|net|to|io|me|xyz|lol|cc|tv|ws|info|se|ru|mx)\s+-\s+)",
    )
    .unwrap()
});
static TRAILING_BRACKET_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[([A-Za-z0-9 ._-]+)\]\s*$").unwrap());
static GROUP_SUFFIX_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"-([A-Za-z0-9]{2,})\s*$").unwrap());
static LEADING_GROUP_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*\[([^\]]+)\]").unwrap());
static SEASON_TOKEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:s\d{1,3}(?:e\d{1,4})*(?:s\d{1,3})*|\d{1,2}x\d{2,3}|seasons?|saison|temporada|stagione)$",
    )
    .unwrap()
});
static RESOLUTION_TOKEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{3,4}[pi]$").unwrap());

/// Tokens that end a title when no year or season marker is present.
const QUALITY_TOKENS: &[&str] = &[
    "4k", "uhd", "hdr", "hdr10", "dv", "dovi", "10bit", "webrip", "webdl", "bluray", "bdrip",
    "brrip", "remux", "hdtv", "dvdrip", "hdrip", "x264", "x265", "h264", "h265", "hevc", "av1",
    "xvid", "divx", "aac", "ac3", "dts", "atmos", "truehd", "proper", "repack", "extended",
    "unrated", "remastered", "imax", "hdcam", "telesync", "hdts", "telecine", "screener",
    "dvdscr",
];

/// A release name split into its parts.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRelease {
    /// Lowercased name (extension, prefixes stripped; underscores as spaces).
    pub spaced: String,
    /// Normalized tokens of the name.
    pub tokens: Vec<String>,
    /// Number of leading tokens that form the title.
    pub title_end: usize,
    /// Release year, if one is stated.
    pub year: Option<u16>,
    /// Release group.
    pub group: Option<String>,
}

impl ParsedRelease {
    /// Normalized title.
    pub fn title(&self) -> String {
        self.tokens[..self.title_end].join(" ")
    }

    /// Tokens following the title.
    pub fn tail(&self) -> &[String] {
        &self.tokens[self.title_end..]
    }
}

/// Parse a release name. Never fails; unparseable input gives an empty title.
pub fn parse_release(name: &str) -> ParsedRelease {
    let trimmed = name.trim();
    let without_ext = EXTENSION_RE.replace(trimmed, "");
    let group = release_group(&without_ext);

    let body = LEADING_BRACKETS_RE.replace(&without_ext, "");
    let body = SITE_PREFIX_RE.replace(&body, "");

    let spaced = body.to_lowercase().replace('_', " ");
    let tokens = title_tokens(&body);
    let (title_end, year) = locate_title_end(&tokens);

    ParsedRelease {
        spaced,
        tokens,
        title_end,
        year,
        group,
    }
}

fn release_group(name: &str) -> Option<String> {
    if let Some(group) = TRAILING_BRACKET_RE.captures(name).and_then(|c| c.get(1)) {
        let group = group.as_str().trim();
        if !is_quality_token(&group.to_lowercase()) {
            return Some(group.to_string());
        }
    }
    if let Some(group) = GROUP_SUFFIX_RE.captures(name).and_then(|c| c.get(1)) {
        let group = group.as_str();
        let lower = group.to_lowercase();
        // "WEB-DL" and friends end in a dash too
        let is_tag = matches!(lower.as_str(), "dl" | "rip" | "hd" | "ray" | "ma" | "x");
        if !is_tag && !is_quality_token(&lower) {
            return Some(group.to_string());
        }
    }
    LEADING_GROUP_RE
        .captures(name)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
}

/// Year value of a token in the plausible release range.
pub(crate) fn as_year(token: &str) -> Option<u16> {
    if token.len() != 4 || !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let year: u16 = token.parse().ok()?;
    (1900..=2099).contains(&year).then_some(year)
}

fn is_quality_token(token: &str) -> bool {
    QUALITY_TOKENS.contains(&token) || RESOLUTION_TOKEN_RE.is_match(token)
}

/// "Complete" only marks a pack when a pack word, a tag or nothing follows it.
fn is_complete_marker(tokens: &[String], i: usize) -> bool {
    match tokens.get(i + 1) {
        None => i > 0,
        Some(next) => {
            matches!(
                next.as_str(),
                "series" | "serie" | "season" | "seasons" | "collection" | "pack" | "boxset"
            ) || is_quality_token(next)
                || SEASON_TOKEN_RE.is_match(next)
                || as_year(next).is_some()
        }
    }
}

fn is_season_marker(tokens: &[String], i: usize) -> bool {
    let token = tokens[i].as_str();
    if SEASON_TOKEN_RE.is_match(token) {
        return true;
    }
    if token == "complete" {
        return is_complete_marker(tokens, i);
    }
    ordinal_value(token).is_some()
        && tokens
            .get(i + 1)
            .is_some_and(|next| next == "season" || next == "seasons")
}

/// Where the title stops, and the stated year.
///
/// The title ends at the earlier of the year and the first season/episode
/// marker. A year in first position belongs to the title ("1917"), as does a
/// year directly followed by another year ("Blade Runner 2049 2017"). Only
/// when neither marker exists does the first quality tag end the title.
fn locate_title_end(tokens: &[String]) -> (usize, Option<u16>) {
    let mut year = None;
    let mut year_idx = None;
    for (i, token) in tokens.iter().enumerate().skip(1) {
        if let Some(y) = as_year(token) {
            if tokens.get(i + 1).and_then(|t| as_year(t)).is_some() {
                continue;
            }
            year = Some(y);
            year_idx = Some(i);
            break;
        }
    }

    let season_idx = (0..tokens.len()).find(|&i| is_season_marker(tokens, i));
    let end = match (year_idx, season_idx) {
        (Some(y), Some(s)) => y.min(s),
        (Some(y), None) => y,
        (None, Some(s)) => s,
        (None, None) => tokens
            .iter()
            .position(|t| is_quality_token(t))
            .unwrap_or(tokens.len()),
    };

    (end, year)
}
