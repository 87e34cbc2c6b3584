//! Types produced by the release matcher.

use serde::{Deserialize, Serialize};

/// Normalized video quality tier, ordered from lowest to highest.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Quality {
    #[default]
    #[serde(rename = "sd")]
    Sd,
    #[serde(rename = "720p")]
    P720,
    #[serde(rename = "1080p")]
    P1080,
    #[serde(rename = "2160p")]
    P2160,
}

impl Quality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Quality::Sd => "sd",
            Quality::P720 => "720p",
            Quality::P1080 => "1080p",
            Quality::P2160 => "2160p",
        }
    }
}

/// Video codec family.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum VideoCodec {
    Av1,
    Hevc,
    H264,
    #[default]
    Unknown,
}

/// Dynamic-range flags. All false means SDR (or not advertised).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DynamicRange {
    pub hdr: bool,
    pub hdr10_plus: bool,
    pub dolby_vision: bool,
    pub hlg: bool,
}

impl DynamicRange {
    /// Any form of HDR other than Dolby Vision.
    pub fn is_hdr(&self) -> bool {
        self.hdr || self.hdr10_plus || self.hlg
    }

    pub fn is_sdr(&self) -> bool {
        !self.is_hdr() && !self.dolby_vision
    }
}

/// Advertised audio channel layout.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AudioChannels {
    #[serde(rename = "2.0")]
    Stereo,
    #[serde(rename = "5.1")]
    Surround51,
    #[serde(rename = "7.1")]
    Surround71,
}

/// Advertised audio format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AudioFormat {
    Atmos,
    TrueHd,
    DtsX,
    DtsHd,
    Dts,
    DolbyDigitalPlus,
    DolbyDigital,
    Aac,
    Flac,
    Opus,
}

/// Where the video was ripped from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseSource {
    Cam,
    Telesync,
    Telecine,
    Screener,
    Dvd,
    Hdtv,
    HdRip,
    WebRip,
    WebDl,
    BluRay,
    Remux,
}

impl ReleaseSource {
    /// Theatre recordings and pre-release screeners.
    pub fn is_low_quality(&self) -> bool {
        matches!(
            self,
            ReleaseSource::Cam
                | ReleaseSource::Telesync
                | ReleaseSource::Telecine
                | ReleaseSource::Screener
        )
    }
}

/// Attributes extracted from a release name, independent of the match decision.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ReleaseAttributes {
    pub quality: Quality,
    pub codec: VideoCodec,
    pub dynamic_range: DynamicRange,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_channels: Option<AudioChannels>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub audio: Vec<AudioFormat>,
    /// ISO 639-1 codes, plus `multi` for multi-audio releases. Empty when none advertised.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub languages: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<ReleaseSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

/// Pack advertised by a release that matched an episode query.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PackInfo {
    /// One or more explicitly named seasons.
    Season { first: u32, last: u32 },
    /// Complete series up to and including `last_season`.
    Show { last_season: u32 },
}

/// Why a release was rejected.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    EmptyName,
    TitleMismatch,
    MissingYear,
    YearMismatch,
    UnexpectedEpisode,
    MissingSeasonMarker,
    SeasonMismatch,
    EpisodeMismatch,
    ShowPackTooShort,
    UnknownSeriesLength,
}

/// Result of matching one release name against a query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchOutcome {
    pub matched: bool,
    pub attributes: ReleaseAttributes,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pack: Option<PackInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<RejectReason>,
}

impl MatchOutcome {
    pub(crate) fn accept(attributes: ReleaseAttributes, pack: Option<PackInfo>) -> Self {
        Self {
            matched: true,
            attributes,
            pack,
            reason: None,
        }
    }

    pub(crate) fn reject(attributes: ReleaseAttributes, reason: RejectReason) -> Self {
        Self {
            matched: false,
            attributes,
            pack: None,
            reason: Some(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quality_ordering() {
        assert!(Quality::Sd < Quality::P720);
        assert!(Quality::P1080 < Quality::P2160);
        assert_eq!(Quality::default(), Quality::Sd);
    }

    #[test]
    fn test_quality_serde_names() {
        assert_eq!(serde_json::to_string(&Quality::P2160).unwrap(), "\"2160p\"");
        let q: Quality = serde_json::from_str("\"720p\"").unwrap();
        assert_eq!(q, Quality::P720);
    }

    #[test]
    fn test_pack_info_serialization() {
        let json = serde_json::to_string(&PackInfo::Season { first: 1, last: 3 }).unwrap();
        assert_eq!(json, r#"{"type":"season","first":1,"last":3}"#);
    }

    #[test]
    fn test_dynamic_range_flags() {
        let dr = DynamicRange::default();
        assert!(dr.is_sdr());
        let dv = DynamicRange {
            dolby_vision: true,
            ..Default::default()
        };
        assert!(!dv.is_hdr());
        assert!(!dv.is_sdr());
    }
}
