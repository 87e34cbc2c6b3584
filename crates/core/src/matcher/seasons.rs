//! Season and episode marker detection.
//!
//! All functions take the lowercased, underscore-free release name
//! ([`ParsedRelease::spaced`](super::parser::ParsedRelease)).
//!
//! Season spans are detected in precedence tiers. The first tier that finds
//! anything wins, and inside a tier the leftmost occurrence wins:
//!
//! 1. two-ended ranges: `S01-S03`, `S01-03`, `Season 1 to 3`, `1st thru 3rd Season`
//! 2. lists: `S01.S02.S03`, `S01S02`, `Seasons 1, 2 & 3`
//! 3. single seasons: `S02`, `Season 2`, `2nd Season`
//!
//! Complete-series wording is reported separately by [`is_complete_series`].

use once_cell::sync::Lazy;
use regex_lite::{Captures, Regex};

static SXXEYY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\bs(\d{1,3})[\s.]?e(\d{1,4})(?:(?:[\s.]?-[\s.]?|[\s.]?)e(\d{1,4})|-(\d{1,4}))?\b")
        .unwrap()
});
static NXNN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(\d{1,2})x(\d{2,3})(?:-(?:\d{1,2}x)?(\d{2,3}))?\b").unwrap()
});
static VERBOSE_EPISODE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\bseason[\s.]*(\d{1,2})[\s.,-]*(?:episode|ep)[\s.]*(\d{1,3})(?:[\s.]*(?:-|to)[\s.]*(\d{1,3}))?\b",
    )
    .unwrap()
});

static S_RANGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\bs(\d{1,2})[\s.]*(?:-|~|\bto\b|\bthru\b|\bthrough\b)[\s.]*s?(\d{1,2})\b").unwrap()
});
static SEASON_WORD_RANGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\bseasons?[\s.]*(\d{1,2})[\s.]*(?:-|~|\bto\b|\bthru\b|\bthrough\b)[\s.]*(?:seasons?[\s.]*)?(\d{1,2})\b",
    )
    .unwrap()
});
static ORDINAL_RANGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"\b(\d{1,2}(?:st|nd|rd|th)|first|second|third|fourth|fifth|sixth|seventh|eighth|ninth|tenth)",
        r"[\s.]*(?:-|~|\bto\b|\bthru\b|\bthrough\b)[\s.]*",
        r"(\d{1,2}(?:st|nd|rd|th)|first|second|third|fourth|fifth|sixth|seventh|eighth|ninth|tenth)",
        r"[\s.]+seasons?\b",
    ))
    .unwrap()
});

static S_CONCAT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(?:s\d{1,2}){2,}\b").unwrap());
static S_NUMBER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"s(\d{1,2})").unwrap());
static SEASON_LIST_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\bseasons?[\s.]*\d{1,2}(?:[\s.,]+(?:(?:and|&|\+)[\s.,]+)?\d{1,2}\b)+").unwrap()
});
static NUMBER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{1,2}").unwrap());

static S_SINGLE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bs(\d{1,2})\b").unwrap());
static SEASON_WORD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:season|saison|temporada|stagione|series)[\s.]*(\d{1,2})\b").unwrap()
});
static ORDINAL_SEASON_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(\d{1,2}(?:st|nd|rd|th)|first|second|third|fourth|fifth|sixth|seventh|eighth|ninth|tenth)[\s.]+season\b",
    )
    .unwrap()
});

static COMPLETE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\bcomplete\b|\ball[\s.]+seasons\b|\bbox[\s.]?set\b|\bintegrale?\b").unwrap()
});

/// Single episode, or a short run of episodes, of one season.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpisodeMarker {
    pub season: u32,
    pub first_episode: u32,
    pub last_episode: u32,
}

impl EpisodeMarker {
    fn new(season: u32, first: u32, last: Option<u32>) -> Self {
        let last = last.unwrap_or(first);
        Self {
            season,
            first_episode: first.min(last),
            last_episode: first.max(last),
        }
    }

    pub fn covers(&self, season: u32, episode: u32) -> bool {
        self.season == season && (self.first_episode..=self.last_episode).contains(&episode)
    }
}

/// Seasons advertised by a pack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeasonSpan {
    pub first: u32,
    pub last: u32,
    /// Explicitly listed seasons; empty for contiguous ranges.
    pub listed: Vec<u32>,
}

impl SeasonSpan {
    fn range(a: u32, b: u32) -> Self {
        Self {
            first: a.min(b),
            last: a.max(b),
            listed: Vec::new(),
        }
    }

    fn list(mut seasons: Vec<u32>) -> Option<Self> {
        seasons.sort_unstable();
        seasons.dedup();
        let first = *seasons.first()?;
        let last = *seasons.last()?;
        Some(Self {
            first,
            last,
            listed: seasons,
        })
    }

    pub fn contains(&self, season: u32) -> bool {
        if self.listed.is_empty() {
            (self.first..=self.last).contains(&season)
        } else {
            self.listed.contains(&season)
        }
    }
}

/// Numeric value of an ordinal ("1st", "second").
pub fn ordinal_value(token: &str) -> Option<u32> {
    let words = [
        "first", "second", "third", "fourth", "fifth", "sixth", "seventh", "eighth", "ninth",
        "tenth",
    ];
    if let Some(pos) = words.iter().position(|w| *w == token) {
        return Some(pos as u32 + 1);
    }
    let digits = token
        .strip_suffix("st")
        .or_else(|| token.strip_suffix("nd"))
        .or_else(|| token.strip_suffix("rd"))
        .or_else(|| token.strip_suffix("th"))?;
    if digits.is_empty() || digits.len() > 2 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

fn num(caps: &Captures<'_>, i: usize) -> Option<u32> {
    caps.get(i).and_then(|m| m.as_str().parse().ok())
}

fn ordinal(caps: &Captures<'_>, i: usize) -> Option<u32> {
    caps.get(i).and_then(|m| ordinal_value(m.as_str()))
}

fn start(caps: &Captures<'_>) -> usize {
    caps.get(0).map(|m| m.start()).unwrap_or(usize::MAX)
}

/// Leftmost episode marker (`S01E02`, `S01E01-E03`, `1x02`, `Season 1 Episode 2`).
pub fn find_episode_marker(spaced: &str) -> Option<EpisodeMarker> {
    let mut found: Vec<(usize, EpisodeMarker)> = Vec::new();

    if let Some(c) = SXXEYY_RE.captures(spaced) {
        if let (Some(s), Some(e)) = (num(&c, 1), num(&c, 2)) {
            let last = num(&c, 3).or_else(|| num(&c, 4));
            found.push((start(&c), EpisodeMarker::new(s, e, last)));
        }
    }
    if let Some(c) = NXNN_RE.captures(spaced) {
        if let (Some(s), Some(e)) = (num(&c, 1), num(&c, 2)) {
            found.push((start(&c), EpisodeMarker::new(s, e, num(&c, 3))));
        }
    }
    if let Some(c) = VERBOSE_EPISODE_RE.captures(spaced) {
        if let (Some(s), Some(e)) = (num(&c, 1), num(&c, 2)) {
            found.push((start(&c), EpisodeMarker::new(s, e, num(&c, 3))));
        }
    }

    found.into_iter().min_by_key(|(pos, _)| *pos).map(|(_, m)| m)
}

/// Seasons advertised by a pack, using the tier precedence described above.
pub fn find_season_span(spaced: &str) -> Option<SeasonSpan> {
    explicit_range(spaced)
        .or_else(|| season_list(spaced))
        .or_else(|| single_season(spaced))
}

/// Whether the name advertises a complete series or box set.
pub fn is_complete_series(spaced: &str) -> bool {
    COMPLETE_RE.is_match(spaced)
}

fn leftmost(candidates: Vec<(usize, SeasonSpan)>) -> Option<SeasonSpan> {
    candidates
        .into_iter()
        .min_by_key(|(pos, _)| *pos)
        .map(|(_, span)| span)
}

fn explicit_range(spaced: &str) -> Option<SeasonSpan> {
    let mut found = Vec::new();
    for re in [&*S_RANGE_RE, &*SEASON_WORD_RANGE_RE] {
        if let Some(c) = re.captures(spaced) {
            if let (Some(a), Some(b)) = (num(&c, 1), num(&c, 2)) {
                found.push((start(&c), SeasonSpan::range(a, b)));
            }
        }
    }
    if let Some(c) = ORDINAL_RANGE_RE.captures(spaced) {
        if let (Some(a), Some(b)) = (ordinal(&c, 1), ordinal(&c, 2)) {
            found.push((start(&c), SeasonSpan::range(a, b)));
        }
    }
    leftmost(found)
}

fn season_list(spaced: &str) -> Option<SeasonSpan> {
    let mut found = Vec::new();

    if let Some(m) = S_CONCAT_RE.find(spaced) {
        let seasons = S_NUMBER_RE
            .captures_iter(m.as_str())
            .filter_map(|c| num(&c, 1))
            .collect();
        if let Some(span) = SeasonSpan::list(seasons) {
            found.push((m.start(), span));
        }
    }

    if let Some((pos, seasons)) = first_marker_run(spaced) {
        if let Some(span) = SeasonSpan::list(seasons) {
            found.push((pos, span));
        }
    }

    if let Some(m) = SEASON_LIST_RE.find(spaced) {
        let seasons = NUMBER_RE
            .find_iter(m.as_str())
            .filter_map(|n| n.as_str().parse().ok())
            .collect();
        if let Some(span) = SeasonSpan::list(seasons) {
            found.push((m.start(), span));
        }
    }

    leftmost(found)
}

/// First run of two or more `sNN` markers separated only by spaces or dots.
fn first_marker_run(spaced: &str) -> Option<(usize, Vec<u32>)> {
    let mut run: Vec<u32> = Vec::new();
    let mut run_start = 0;
    let mut prev_end: Option<usize> = None;

    for c in S_SINGLE_RE.captures_iter(spaced) {
        let Some(whole) = c.get(0) else { continue };
        let Some(season) = num(&c, 1) else { continue };

        let adjacent = prev_end.is_some_and(|end| {
            let gap = &spaced[end..whole.start()];
            !gap.is_empty() && gap.chars().all(|ch| ch == ' ' || ch == '.')
        });

        if !adjacent {
            if run.len() >= 2 {
                return Some((run_start, run));
            }
            run.clear();
            run_start = whole.start();
        }
        run.push(season);
        prev_end = Some(whole.end());
    }

    (run.len() >= 2).then_some((run_start, run))
}

fn single_season(spaced: &str) -> Option<SeasonSpan> {
    let mut found = Vec::new();
    for re in [&*S_SINGLE_RE, &*SEASON_WORD_RE] {
        if let Some(c) = re.captures(spaced) {
            if let Some(s) = num(&c, 1) {
                found.push((start(&c), SeasonSpan::range(s, s)));
            }
        }
    }
    if let Some(c) = ORDINAL_SEASON_RE.captures(spaced) {
        if let Some(s) = ordinal(&c, 1) {
            found.push((start(&c), SeasonSpan::range(s, s)));
        }
    }
    leftmost(found)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(first: u32, last: u32) -> Option<SeasonSpan> {
        Some(SeasonSpan::range(first, last))
    }

    #[test]
    fn test_ordinal_value() {
        assert_eq!(ordinal_value("1st"), Some(1));
        assert_eq!(ordinal_value("22nd"), Some(22));
        assert_eq!(ordinal_value("third"), Some(3));
        assert_eq!(ordinal_value("th"), None);
        assert_eq!(ordinal_value("first1"), None);
        assert_eq!(ordinal_value("east"), None);
    }

    #[test]
    fn test_episode_markers() {
        assert_eq!(
            find_episode_marker("show.s01e02.1080p"),
            Some(EpisodeMarker::new(1, 2, None))
        );
        assert_eq!(
            find_episode_marker("show 3x07 hdtv"),
            Some(EpisodeMarker::new(3, 7, None))
        );
        assert_eq!(
            find_episode_marker("show season 2 episode 5"),
            Some(EpisodeMarker::new(2, 5, None))
        );
    }

    #[test]
    fn test_multi_episode_markers() {
        let m = find_episode_marker("show.s01e01-e03.720p").unwrap();
        assert_eq!((m.first_episode, m.last_episode), (1, 3));
        let m = find_episode_marker("show.s01e01e02.720p").unwrap();
        assert_eq!((m.first_episode, m.last_episode), (1, 2));
        let m = find_episode_marker("show.s01e04-06").unwrap();
        assert_eq!((m.first_episode, m.last_episode), (4, 6));
        assert!(m.covers(1, 5));
        assert!(!m.covers(2, 5));
    }

    #[test]
    fn test_episode_marker_ignores_resolution() {
        let m = find_episode_marker("show.s01e05-1080p").unwrap();
        assert_eq!((m.first_episode, m.last_episode), (5, 5));
        assert_eq!(find_episode_marker("movie.1920x1080"), None);
        assert_eq!(find_episode_marker("show.s01.1080p"), None);
    }

    #[test]
    fn test_explicit_ranges() {
        assert_eq!(find_season_span("show.s01-s03.1080p"), span(1, 3));
        assert_eq!(find_season_span("show s01-03 1080p"), span(1, 3));
        assert_eq!(find_season_span("show season 1 to 4"), span(1, 4));
        assert_eq!(find_season_span("show seasons 2 thru 5"), span(2, 5));
        assert_eq!(find_season_span("show.1st-3rd.season"), span(1, 3));
        assert_eq!(find_season_span("show first to third seasons"), span(1, 3));
    }

    #[test]
    fn test_range_does_not_swallow_resolution() {
        assert_eq!(find_season_span("show.s02.-.1080p"), span(2, 2));
        assert_eq!(find_season_span("show.s02-10bit"), span(2, 2));
    }

    #[test]
    fn test_lists() {
        let s = find_season_span("show.s01.s02.s04.720p").unwrap();
        assert_eq!((s.first, s.last), (1, 4));
        assert!(s.contains(2));
        assert!(!s.contains(3));

        let s = find_season_span("show s01s02s03").unwrap();
        assert_eq!(s.listed, vec![1, 2, 3]);

        let s = find_season_span("show seasons 1, 2 & 5").unwrap();
        assert_eq!(s.listed, vec![1, 2, 5]);
    }

    #[test]
    fn test_single_seasons() {
        assert_eq!(find_season_span("show.s02.1080p"), span(2, 2));
        assert_eq!(find_season_span("show season 12 720p"), span(12, 12));
        assert_eq!(find_season_span("show 2nd season"), span(2, 2));
        assert_eq!(find_season_span("show 1080p"), None);
    }

    #[test]
    fn test_range_beats_single_and_list() {
        // A range anywhere outranks a single marker appearing earlier
        assert_eq!(find_season_span("show season 1 bonus s01-s05"), span(1, 5));
        // Within a tier the leftmost occurrence wins
        assert_eq!(find_season_span("show s01-s02 s03-s09"), span(1, 2));
    }

    #[test]
    fn test_complete_series() {
        assert!(is_complete_series("show.complete.series.1080p"));
        assert!(is_complete_series("show all seasons"));
        assert!(is_complete_series("show boxset"));
        assert!(!is_complete_series("show.s01.1080p"));
    }
}
