//! Types describing what the user asked to play.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Kind of media being requested.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Movie,
    Episode,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Movie => "movie",
            MediaKind::Episode => "episode",
        }
    }
}

/// An aggregation request for one movie or one episode.
///
/// Built once per user request and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Query {
    /// Movie or episode.
    pub kind: MediaKind,
    /// Numeric catalog identity (TMDB id of the movie or show).
    pub tmdb_id: u64,
    /// IMDb identity (`tt1234567`), used by adapters that address streams by it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imdb_id: Option<String>,
    /// Primary title (show title for episodes).
    pub title: String,
    /// Alternative titles (original title, regional titles).
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Release year (first-air year for shows).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<u16>,
    /// Season number (episodes only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub season: Option<u32>,
    /// Episode number within the season (episodes only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub episode: Option<u32>,
    /// Absolute episode number, for anthology/absolute-numbered releases.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub absolute_episode: Option<u32>,
    /// Episode title (episodes only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub episode_title: Option<String>,
    /// Number of aired seasons (used to validate complete-series packs).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_seasons: Option<u32>,
}

/// Fatal problems with a query: no provider call can be built from it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("Query is missing a catalog identity")]
    MissingIdentity,

    #[error("Query title is empty")]
    EmptyTitle,

    #[error("Movie query is missing its year")]
    MissingYear,

    #[error("Episode query is missing season or episode number")]
    MissingEpisodeNumbers,
}

impl Query {
    /// Build a movie query.
    pub fn movie(tmdb_id: u64, title: impl Into<String>, year: u16) -> Self {
        Self {
            kind: MediaKind::Movie,
            tmdb_id,
            imdb_id: None,
            title: title.into(),
            aliases: Vec::new(),
            year: Some(year),
            season: None,
            episode: None,
            absolute_episode: None,
            episode_title: None,
            total_seasons: None,
        }
    }

    /// Build an episode query.
    pub fn episode(tmdb_id: u64, title: impl Into<String>, season: u32, episode: u32) -> Self {
        Self {
            kind: MediaKind::Episode,
            tmdb_id,
            imdb_id: None,
            title: title.into(),
            aliases: Vec::new(),
            year: None,
            season: Some(season),
            episode: Some(episode),
            absolute_episode: None,
            episode_title: None,
            total_seasons: None,
        }
    }

    pub fn with_imdb_id(mut self, imdb_id: impl Into<String>) -> Self {
        self.imdb_id = Some(imdb_id.into());
        self
    }

    pub fn with_aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases = aliases.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_year(mut self, year: u16) -> Self {
        self.year = Some(year);
        self
    }

    pub fn with_total_seasons(mut self, total_seasons: u32) -> Self {
        self.total_seasons = Some(total_seasons);
        self
    }

    pub fn with_absolute_episode(mut self, absolute_episode: u32) -> Self {
        self.absolute_episode = Some(absolute_episode);
        self
    }

    pub fn with_episode_title(mut self, episode_title: impl Into<String>) -> Self {
        self.episode_title = Some(episode_title.into());
        self
    }

    /// Check that the query carries every identity field its kind requires.
    pub fn validate(&self) -> Result<(), QueryError> {
        if self.tmdb_id == 0 {
            return Err(QueryError::MissingIdentity);
        }
        if self.title.trim().is_empty() {
            return Err(QueryError::EmptyTitle);
        }
        match self.kind {
            MediaKind::Movie => {
                if self.year.is_none() {
                    return Err(QueryError::MissingYear);
                }
            }
            MediaKind::Episode => {
                if self.season.is_none() || self.episode.is_none() {
                    return Err(QueryError::MissingEpisodeNumbers);
                }
            }
        }
        Ok(())
    }

    /// Title followed by every alias, with duplicates and blanks removed.
    pub fn all_titles(&self) -> Vec<&str> {
        let mut titles: Vec<&str> = Vec::with_capacity(self.aliases.len() + 1);
        for t in std::iter::once(self.title.as_str()).chain(self.aliases.iter().map(String::as_str))
        {
            let t = t.trim();
            if !t.is_empty() && !titles.contains(&t) {
                titles.push(t);
            }
        }
        titles
    }

    /// Stable cache key for this query.
    pub fn key(&self) -> QueryKey {
        QueryKey::for_query(self)
    }
}

/// Stable composite of media identity plus season/episode when applicable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueryKey(String);

impl QueryKey {
    pub fn for_query(query: &Query) -> Self {
        let key = match query.kind {
            MediaKind::Movie => format!("movie:{}:{}", query.tmdb_id, query.year.unwrap_or(0)),
            MediaKind::Episode => format!(
                "episode:{}:s{:02}e{:02}",
                query.tmdb_id,
                query.season.unwrap_or(0),
                query.episode.unwrap_or(0)
            ),
        };
        Self(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for QueryKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}
