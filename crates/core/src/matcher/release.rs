//! The release matcher: decides whether a release name is the requested title.

use crate::config::MatcherConfig;
use crate::query::{MediaKind, Query};

use super::attributes::extract_from_parsed;
use super::normalize::{canonical_numerals, normalize_title, similarity, title_numerals};
use super::parser::{as_year, parse_release, ParsedRelease};
use super::seasons::{find_episode_marker, find_season_span, is_complete_series};
use super::types::{MatchOutcome, PackInfo, RejectReason};

/// Title/year/season/episode identity check with attribute extraction.
///
/// Ambiguous names (no year for a movie, no season marker for an episode)
/// are rejected.
#[derive(Debug, Clone, Default)]
pub struct ReleaseMatcher {
    config: MatcherConfig,
}

impl ReleaseMatcher {
    pub fn new(config: MatcherConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    /// Match a release name against a query. Never panics; attributes are
    /// always extracted, whatever the decision.
    pub fn matches(&self, query: &Query, release_name: &str) -> MatchOutcome {
        let parsed = parse_release(release_name);
        let attributes = extract_from_parsed(&parsed);

        if parsed.tokens.is_empty() {
            return MatchOutcome::reject(attributes, RejectReason::EmptyName);
        }

        let decision = match query.kind {
            MediaKind::Movie => self.decide_movie(query, &parsed),
            MediaKind::Episode => self.decide_episode(query, &parsed),
        };

        match decision {
            Ok(pack) => MatchOutcome::accept(attributes, pack),
            Err(reason) => MatchOutcome::reject(attributes, reason),
        }
    }

    fn decide_movie(
        &self,
        query: &Query,
        parsed: &ParsedRelease,
    ) -> Result<Option<PackInfo>, RejectReason> {
        self.check_title(query, &parsed.tokens[..parsed.title_end])?;

        let year = parsed.year.ok_or(RejectReason::MissingYear)?;
        if let Some(expected) = query.year {
            if year.abs_diff(expected) > self.config.year_tolerance {
                return Err(RejectReason::YearMismatch);
            }
        }

        if find_episode_marker(&parsed.spaced).is_some() {
            return Err(RejectReason::UnexpectedEpisode);
        }

        Ok(None)
    }

    fn decide_episode(
        &self,
        query: &Query,
        parsed: &ParsedRelease,
    ) -> Result<Option<PackInfo>, RejectReason> {
        let season = query.season.unwrap_or(0);
        let episode = query.episode.unwrap_or(0);
        let title = &parsed.tokens[..parsed.title_end];

        if let Some(marker) = find_episode_marker(&parsed.spaced) {
            self.check_title(query, title)?;
            self.check_show_year(query, parsed.year)?;
            if marker.season != season {
                return Err(RejectReason::SeasonMismatch);
            }
            if !marker.covers(season, episode) {
                return Err(RejectReason::EpisodeMismatch);
            }
            return Ok(None);
        }

        let complete = is_complete_series(&parsed.spaced);

        if let Some(span) = find_season_span(&parsed.spaced) {
            self.check_title(query, title)?;
            self.check_show_year(query, parsed.year)?;

            if complete && span.first <= 1 && span.last > span.first && span.listed.is_empty() {
                if season > span.last {
                    return Err(RejectReason::ShowPackTooShort);
                }
                return Ok(Some(PackInfo::Show {
                    last_season: span.last,
                }));
            }

            if !span.contains(season) {
                return Err(RejectReason::SeasonMismatch);
            }
            return Ok(Some(PackInfo::Season {
                first: span.first,
                last: span.last,
            }));
        }

        if complete {
            self.check_title(query, title)?;
            self.check_show_year(query, parsed.year)?;
            let last_season = query
                .total_seasons
                .ok_or(RejectReason::UnknownSeriesLength)?;
            if season > last_season {
                return Err(RejectReason::ShowPackTooShort);
            }
            return Ok(Some(PackInfo::Show { last_season }));
        }

        if self.config.allow_absolute_numbering {
            if let Some(absolute) = query.absolute_episode {
                if let Some(idx) = find_absolute_episode(&parsed.tokens, absolute) {
                    self.check_title(query, trim_episode_words(&parsed.tokens[..idx]))?;
                    self.check_show_year(query, parsed.year)?;
                    return Ok(None);
                }
            }
        }

        Err(RejectReason::MissingSeasonMarker)
    }

    fn check_title(&self, query: &Query, title: &[String]) -> Result<(), RejectReason> {
        if self.title_matches(query, title) {
            Ok(())
        } else {
            Err(RejectReason::TitleMismatch)
        }
    }

    /// Episode releases rarely state a year. When they do, it only rejects
    /// if it predates the show by more than the tolerance.
    fn check_show_year(&self, query: &Query, year: Option<u16>) -> Result<(), RejectReason> {
        if let (Some(year), Some(show_year)) = (year, query.year) {
            if year.saturating_add(self.config.year_tolerance) < show_year {
                return Err(RejectReason::YearMismatch);
            }
        }
        Ok(())
    }

    /// Exact match of any normalized alias, or fuzzy similarity above the
    /// threshold. Sequel numbers must agree exactly before fuzzy matching.
    fn title_matches(&self, query: &Query, title: &[String]) -> bool {
        if title.is_empty() {
            return false;
        }
        let candidate = title.join(" ");
        let candidate_bare = strip_article(&candidate);
        let candidate_numerals = title_numerals(&candidate);

        query.all_titles().into_iter().any(|t| {
            let wanted = strip_trailing_year(normalize_title(t));
            if wanted.is_empty() {
                return false;
            }
            if wanted == candidate || strip_article(&wanted) == candidate_bare {
                return true;
            }
            if title_numerals(&wanted) != candidate_numerals {
                return false;
            }
            strip_article(&canonical_numerals(&wanted))
                == strip_article(&canonical_numerals(&candidate))
                || similarity(&wanted, &candidate) >= self.config.fuzzy_threshold
        })
    }
}

fn strip_article(title: &str) -> &str {
    ["the ", "a ", "an "]
        .iter()
        .find_map(|a| title.strip_prefix(a))
        .unwrap_or(title)
}

/// "Doctor Who (2005)" names the show, not a release year.
fn strip_trailing_year(title: String) -> String {
    match title.rsplit_once(' ') {
        Some((head, last)) if as_year(last).is_some() => head.to_string(),
        _ => title,
    }
}

/// Index of the token carrying the absolute episode number (`105`, `e105`, `ep105`).
fn find_absolute_episode(tokens: &[String], absolute: u32) -> Option<usize> {
    tokens.iter().enumerate().skip(1).find_map(|(i, t)| {
        let digits = t
            .strip_prefix("ep")
            .or_else(|| t.strip_prefix('e'))
            .unwrap_or(t);
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        (digits.parse::<u32>().ok()? == absolute).then_some(i)
    })
}

fn trim_episode_words(tokens: &[String]) -> &[String] {
    match tokens.split_last() {
        Some((last, head)) if last == "ep" || last == "episode" => head,
        _ => tokens,
    }
}
