//! Stremio addon provider.
//!
//! Any addon exposing the `stream` resource can be used. Streams carrying an
//! `infoHash` become torrent candidates; URL streams become direct links, or
//! debrid-resolved links when the URL points at a debrid host or the addon
//! itself is configured with debrid credentials.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex_lite::Regex;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::query::{MediaKind, Query};

use super::{ProviderAdapter, ProviderError, RawResult, SourceKind};

static SEEDERS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:👤\s*|seeders?[:\s]*|peers?[:\s]*)(\d+)").unwrap());
static SIZE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\d+(?:[,.]\d+)?)\s*(TiB|TB|GiB|GB|MiB|MB)\b").unwrap());
static DEBRID_HOST_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(real-?debrid|alldebrid|premiumize|torbox|debrid-link|easydebrid|offcloud)",
    )
    .unwrap()
});

/// Query-string fragments that mark an addon URL as carrying debrid credentials.
const DEBRID_CONFIG_MARKERS: &[&str] = &[
    "realdebrid=",
    "rd=",
    "debridkey=",
    "premiumize=",
    "pm=",
    "alldebrid=",
    "ad=",
    "torbox=",
    "tb=",
    "offcloud=",
    "oc=",
    "debrid-link=",
    "dl=",
    "easydebrid=",
    "ed=",
];

/// Provider backed by a Stremio addon's stream endpoint.
pub struct StremioProvider {
    name: String,
    base_url: String,
    debrid_configured: bool,
    call_timeout: Option<Duration>,
    client: Client,
}

impl StremioProvider {
    /// Create a provider for the addon at `url` (with or without `/manifest.json`).
    pub fn new(
        name: impl Into<String>,
        url: &str,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("sourcerer/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ProviderError::ConnectionFailed(e.to_string()))?;

        Ok(Self {
            name: name.into(),
            base_url: addon_base_url(url),
            debrid_configured: is_debrid_configured(url),
            call_timeout: None,
            client,
        })
    }

    /// Ask the scraper to use this timeout instead of its default.
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = Some(timeout);
        self
    }

    /// Stream endpoint for a query.
    fn stream_url(&self, query: &Query) -> Result<String, ProviderError> {
        let imdb_id = query
            .imdb_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| ProviderError::Unsupported("query has no IMDb id".to_string()))?;

        let (media_type, media_id) = match query.kind {
            MediaKind::Movie => ("movie", imdb_id.to_string()),
            MediaKind::Episode => (
                "series",
                format!(
                    "{}:{}:{}",
                    imdb_id,
                    query.season.unwrap_or(0),
                    query.episode.unwrap_or(0)
                ),
            ),
        };

        Ok(format!("{}/stream/{}/{}.json", self.base_url, media_type, media_id))
    }

    /// Convert an addon response into candidates, skipping unplayable streams.
    fn convert_streams(&self, response: StreamResponse) -> Vec<RawResult> {
        response
            .streams
            .into_iter()
            .filter_map(|s| self.convert_stream(s))
            .collect()
    }

    fn convert_stream(&self, stream: Stream) -> Option<RawResult> {
        if stream.external_url.is_some() {
            return None;
        }

        let hints = stream.behavior_hints.unwrap_or_default();
        let name = stream.name.unwrap_or_default();
        let description = stream
            .description
            .or(stream.title)
            .unwrap_or_default();
        let full_text = format!("{}\n{}", name, description);

        let release_name = hints
            .filename
            .clone()
            .filter(|f| !f.trim().is_empty())
            .or_else(|| first_line(&description))
            .or_else(|| first_line(&name))?;

        let hash = stream
            .info_hash
            .map(|h| h.trim().to_lowercase())
            .filter(|h| !h.is_empty());

        let (kind, url) = match (hash.as_ref(), stream.url) {
            (Some(_), url) => (SourceKind::Torrent, url),
            (None, Some(url)) => {
                let kind = if self.debrid_configured || DEBRID_HOST_RE.is_match(&url) {
                    SourceKind::DebridResolved
                } else {
                    SourceKind::Direct
                };
                (kind, Some(url))
            }
            (None, None) => return None,
        };

        let size_bytes = parse_size(&full_text)
            .or(hints.video_size)
            .unwrap_or(0);
        let seeders = SEEDERS_RE
            .captures(&full_text)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<u32>().ok());

        Some(RawResult {
            provider: self.name.clone(),
            release_name,
            info_hash: hash,
            url,
            size_bytes,
            seeders,
            kind,
            file_index: stream.file_idx,
            binge_group: hints.binge_group,
        })
    }
}

#[async_trait]
impl ProviderAdapter for StremioProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn timeout(&self) -> Option<Duration> {
        self.call_timeout
    }

    async fn fetch(&self, query: &Query) -> Result<Vec<RawResult>, ProviderError> {
        let url = self.stream_url(query)?;
        debug!(provider = %self.name, url = %url, "Fetching addon streams");

        let response = self.client.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout
            } else if e.is_connect() {
                ProviderError::ConnectionFailed(e.to_string())
            } else {
                ProviderError::ApiError(e.to_string())
            }
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::ApiError(format!(
                "HTTP {}: {}",
                status,
                body.chars().take(200).collect::<String>()
            )));
        }

        let body: StreamResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;

        let results = self.convert_streams(body);
        debug!(provider = %self.name, results = results.len(), "Addon streams parsed");
        Ok(results)
    }
}

/// Strip a trailing `/manifest.json` and slashes from an addon URL.
fn addon_base_url(url: &str) -> String {
    let trimmed = url.trim().trim_end_matches('/');
    trimmed
        .strip_suffix("/manifest.json")
        .unwrap_or(trimmed)
        .trim_end_matches('/')
        .to_string()
}

fn is_debrid_configured(url: &str) -> bool {
    let lower = url.to_lowercase();
    DEBRID_CONFIG_MARKERS.iter().any(|m| lower.contains(m))
}

fn first_line(text: &str) -> Option<String> {
    text.lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .map(str::to_string)
}

/// Parse the first human-readable size ("1.4 GB", "700 MiB") into bytes.
fn parse_size(text: &str) -> Option<u64> {
    let caps = SIZE_RE.captures(text)?;
    let value: f64 = caps.get(1)?.as_str().replace(',', ".").parse().ok()?;
    let unit = caps.get(2)?.as_str().to_ascii_lowercase();
    let multiplier = match unit.as_str() {
        "tb" | "tib" => 1024f64.powi(4),
        "gb" | "gib" => 1024f64.powi(3),
        _ => 1024f64.powi(2),
    };
    Some((value * multiplier) as u64)
}

#[derive(Debug, Deserialize)]
struct StreamResponse {
    #[serde(default)]
    streams: Vec<Stream>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Stream {
    name: Option<String>,
    title: Option<String>,
    description: Option<String>,
    info_hash: Option<String>,
    file_idx: Option<u32>,
    url: Option<String>,
    external_url: Option<String>,
    behavior_hints: Option<BehaviorHints>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BehaviorHints {
    filename: Option<String>,
    video_size: Option<u64>,
    binge_group: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(url: &str) -> StremioProvider {
        StremioProvider::new("addon", url, Duration::from_secs(5)).unwrap()
    }

    fn parse(p: &StremioProvider, json: &str) -> Vec<RawResult> {
        let response: StreamResponse = serde_json::from_str(json).unwrap();
        p.convert_streams(response)
    }

    #[test]
    fn test_base_url_strips_manifest() {
        assert_eq!(
            addon_base_url("https://addon.example/abc/manifest.json"),
            "https://addon.example/abc"
        );
        assert_eq!(addon_base_url("https://addon.example/"), "https://addon.example");
    }

    #[test]
    fn test_call_timeout_override() {
        let p = provider("https://addon.example");
        assert_eq!(p.timeout(), None);
        let p = p.with_call_timeout(Duration::from_secs(3));
        assert_eq!(p.timeout(), Some(Duration::from_secs(3)));
    }

    #[test]
    fn test_stream_url_for_movie_and_episode() {
        let p = provider("https://addon.example/manifest.json");
        let movie = Query::movie(603, "The Matrix", 1999).with_imdb_id("tt0133093");
        assert_eq!(
            p.stream_url(&movie).unwrap(),
            "https://addon.example/stream/movie/tt0133093.json"
        );

        let ep = Query::episode(1399, "Game of Thrones", 1, 2).with_imdb_id("tt0944947");
        assert_eq!(
            p.stream_url(&ep).unwrap(),
            "https://addon.example/stream/series/tt0944947:1:2.json"
        );
    }

    #[test]
    fn test_stream_url_requires_imdb_id() {
        let p = provider("https://addon.example");
        let q = Query::movie(603, "The Matrix", 1999);
        assert!(matches!(p.stream_url(&q), Err(ProviderError::Unsupported(_))));
    }

    #[test]
    fn test_torrent_stream_conversion() {
        let p = provider("https://addon.example");
        let json = r#"{"streams": [{
            "name": "Addon\n1080p",
            "title": "Alpha.2020.1080p.WEB.x264-GRP\n👤 42 💾 1.5 GB",
            "infoHash": "ABCDEF0123456789ABCDEF0123456789ABCDEF01",
            "fileIdx": 3,
            "behaviorHints": {"bingeGroup": "addon|1080p"}
        }]}"#;
        let results = parse(&p, json);
        assert_eq!(results.len(), 1);
        let r = &results[0];
        assert_eq!(r.kind, SourceKind::Torrent);
        assert_eq!(r.release_name, "Alpha.2020.1080p.WEB.x264-GRP");
        assert_eq!(
            r.info_hash.as_deref(),
            Some("abcdef0123456789abcdef0123456789abcdef01")
        );
        assert_eq!(r.seeders, Some(42));
        assert_eq!(r.size_bytes, (1.5 * 1024f64.powi(3)) as u64);
        assert_eq!(r.file_index, Some(3));
        assert_eq!(r.binge_group.as_deref(), Some("addon|1080p"));
    }

    #[test]
    fn test_filename_hint_wins_and_video_size_fallback() {
        let p = provider("https://addon.example");
        let json = r#"{"streams": [{
            "name": "Some Addon",
            "url": "https://cdn.example/file.mkv",
            "behaviorHints": {"filename": "Alpha.2020.2160p.mkv", "videoSize": 1234}
        }]}"#;
        let results = parse(&p, json);
        assert_eq!(results[0].release_name, "Alpha.2020.2160p.mkv");
        assert_eq!(results[0].size_bytes, 1234);
        assert_eq!(results[0].kind, SourceKind::Direct);
    }

    #[test]
    fn test_debrid_url_detection() {
        let p = provider("https://addon.example");
        let json = r#"{"streams": [
            {"title": "Alpha.2020.1080p", "url": "https://download.real-debrid.com/d/xyz"},
            {"title": "Alpha.2020.720p", "url": "https://cdn.example/x"}
        ]}"#;
        let results = parse(&p, json);
        assert_eq!(results[0].kind, SourceKind::DebridResolved);
        assert_eq!(results[1].kind, SourceKind::Direct);

        let configured = provider("https://addon.example/realdebrid=KEY/manifest.json");
        let results = parse(&configured, json);
        assert!(results.iter().all(|r| r.kind == SourceKind::DebridResolved));
    }

    #[test]
    fn test_skips_external_and_sourceless_streams() {
        let p = provider("https://addon.example");
        let json = r#"{"streams": [
            {"title": "Alpha", "externalUrl": "https://netflix.example/title"},
            {"title": "Alpha.2020.1080p"},
            {"title": "Alpha.2020.1080p", "ytId": "abc"}
        ]}"#;
        assert!(parse(&p, json).is_empty());
    }

    #[test]
    fn test_parse_size_units() {
        assert_eq!(parse_size("700 MB"), Some(700 * 1024 * 1024));
        assert_eq!(parse_size("size: 2,5 GiB"), Some((2.5 * 1024f64.powi(3)) as u64));
        assert_eq!(parse_size("1 TB"), Some(1024u64.pow(4)));
        assert_eq!(parse_size("no size here"), None);
    }

    #[test]
    fn test_empty_response() {
        let p = provider("https://addon.example");
        assert!(parse(&p, "{}").is_empty());
    }
}
