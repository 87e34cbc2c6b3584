//! Attribute extraction from release names.

use once_cell::sync::Lazy;
use regex_lite::Regex;

use super::parser::{parse_release, ParsedRelease};
use super::types::{
    AudioChannels, AudioFormat, DynamicRange, Quality, ReleaseAttributes, ReleaseSource,
    VideoCodec,
};

static RESOLUTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(2160p|4k|uhd|3840x2160|1080[pi]|1920x1080|720p|1280x720|576p|480p|360p)\b")
        .unwrap()
});
static CODEC_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(av1|hevc|[xh]\.?265|avc|[xh]\.?264)\b").unwrap());

static DOLBY_VISION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:dv|dovi|dolby[\s.-]?vision)\b").unwrap());
static HDR10_PLUS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bhdr10(?:\+|plus)").unwrap());
static HDR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bhdr(?:10)?\b").unwrap());
static HLG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bhlg\b").unwrap());

static CHANNELS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|[^0-9])([2578])[.\s]([01])(?:[^0-9]|$)").unwrap());
static CHANNEL_COUNT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b([268])ch\b").unwrap());

static LOW_QUALITY_SOURCES: Lazy<Vec<(Regex, ReleaseSource)>> = Lazy::new(|| {
    vec![
        (
            Regex::new(r"\b(?:cam|camrip|hdcam|hq-?cam)\b").unwrap(),
            ReleaseSource::Cam,
        ),
        (
            Regex::new(r"\b(?:ts|telesync|hdts|hd-ts|tsrip)\b").unwrap(),
            ReleaseSource::Telesync,
        ),
        (
            Regex::new(r"\b(?:tc|telecine|hdtc)\b").unwrap(),
            ReleaseSource::Telecine,
        ),
        (
            Regex::new(r"\b(?:scr|screener|dvdscr|bdscr|r5)\b").unwrap(),
            ReleaseSource::Screener,
        ),
    ]
});

/// Best source first.
static SOURCES: Lazy<Vec<(Regex, ReleaseSource)>> = Lazy::new(|| {
    vec![
        (Regex::new(r"\b(?:remux|bdremux)\b").unwrap(), ReleaseSource::Remux),
        (
            Regex::new(r"\b(?:blu-?ray|bdrip|brrip|bd25|bd50)\b").unwrap(),
            ReleaseSource::BluRay,
        ),
        (
            Regex::new(r"\b(?:web-?dl|webdl|web)\b").unwrap(),
            ReleaseSource::WebDl,
        ),
        (Regex::new(r"\bweb-?rip\b").unwrap(), ReleaseSource::WebRip),
        (Regex::new(r"\bhdrip\b").unwrap(), ReleaseSource::HdRip),
        (Regex::new(r"\b(?:hdtv|pdtv)\b").unwrap(), ReleaseSource::Hdtv),
        (
            Regex::new(r"\bdvd(?:rip|r|5|9)?\b").unwrap(),
            ReleaseSource::Dvd,
        ),
    ]
});

static AUDIO_FORMATS: Lazy<Vec<(Regex, AudioFormat)>> = Lazy::new(|| {
    vec![
        (Regex::new(r"\batmos\b").unwrap(), AudioFormat::Atmos),
        (Regex::new(r"\btrue-?hd\b").unwrap(), AudioFormat::TrueHd),
        (Regex::new(r"\bdts[\s.-]?x\b").unwrap(), AudioFormat::DtsX),
        (Regex::new(r"\bdts[\s.-]?hd").unwrap(), AudioFormat::DtsHd),
        (
            Regex::new(r"\b(?:ddp|dd\+|e-?ac-?3)").unwrap(),
            AudioFormat::DolbyDigitalPlus,
        ),
        (Regex::new(r"\baac").unwrap(), AudioFormat::Aac),
        (Regex::new(r"\bflac\b").unwrap(), AudioFormat::Flac),
        (Regex::new(r"\bopus\b").unwrap(), AudioFormat::Opus),
    ]
});
static DTS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bdts\b").unwrap());
static DOLBY_DIGITAL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:dd|ac-?3)(?:[257]|\b)").unwrap());

/// Tokens naming an audio language, by ISO 639-1 code.
const LANGUAGE_TOKENS: &[(&str, &[&str])] = &[
    ("multi", &["multi", "dual", "multilang"]),
    ("en", &["english", "eng"]),
    ("fr", &["french", "fre", "fra", "vff", "vfq", "vf", "vf2", "truefrench"]),
    ("de", &["german", "ger", "deu", "deutsch"]),
    ("es", &["spanish", "spa", "esp", "castellano", "latino"]),
    ("it", &["italian", "ita"]),
    ("ru", &["russian", "rus"]),
    ("ja", &["japanese", "jpn", "jap"]),
    ("ko", &["korean", "kor"]),
    ("zh", &["chinese", "chi", "mandarin", "cantonese"]),
    ("hi", &["hindi", "hin"]),
    ("pt", &["portuguese", "por", "dublado", "ptbr"]),
    ("pl", &["polish", "pol"]),
    ("nl", &["dutch"]),
    ("sv", &["swedish", "swe"]),
    ("tr", &["turkish", "tur"]),
    ("ar", &["arabic", "ara"]),
];

/// Extract attributes from a raw release name.
pub fn extract_attributes(release_name: &str) -> ReleaseAttributes {
    extract_from_parsed(&parse_release(release_name))
}

/// Extract attributes from an already parsed release.
pub fn extract_from_parsed(parsed: &ParsedRelease) -> ReleaseAttributes {
    let text = parsed.spaced.as_str();
    let (audio_channels, audio) = audio(text);

    ReleaseAttributes {
        quality: quality(text),
        codec: codec(text),
        dynamic_range: dynamic_range(text),
        audio_channels,
        audio,
        languages: languages(parsed.tail()),
        source: source(text),
        group: parsed.group.clone(),
    }
}

fn quality(text: &str) -> Quality {
    let Some(m) = RESOLUTION_RE.find(text) else {
        return Quality::Sd;
    };
    match m.as_str() {
        "2160p" | "4k" | "uhd" | "3840x2160" => Quality::P2160,
        "1080p" | "1080i" | "1920x1080" => Quality::P1080,
        "720p" | "1280x720" => Quality::P720,
        _ => Quality::Sd,
    }
}

fn codec(text: &str) -> VideoCodec {
    let Some(m) = CODEC_RE.find(text) else {
        return VideoCodec::Unknown;
    };
    match m.as_str() {
        "av1" => VideoCodec::Av1,
        "avc" => VideoCodec::H264,
        s if s.ends_with("265") || s == "hevc" => VideoCodec::Hevc,
        _ => VideoCodec::H264,
    }
}

fn dynamic_range(text: &str) -> DynamicRange {
    let hdr10_plus = HDR10_PLUS_RE.is_match(text);
    DynamicRange {
        hdr: hdr10_plus || HDR_RE.is_match(text),
        hdr10_plus,
        dolby_vision: DOLBY_VISION_RE.is_match(text),
        hlg: HLG_RE.is_match(text),
    }
}

fn audio(text: &str) -> (Option<AudioChannels>, Vec<AudioFormat>) {
    let channels = CHANNELS_RE
        .captures(text)
        .and_then(|c| match (c.get(1)?.as_str(), c.get(2)?.as_str()) {
            ("7", "1") => Some(AudioChannels::Surround71),
            ("5", "1") => Some(AudioChannels::Surround51),
            ("2", "0") => Some(AudioChannels::Stereo),
            _ => None,
        })
        .or_else(|| {
            CHANNEL_COUNT_RE
                .captures(text)
                .and_then(|c| match c.get(1)?.as_str() {
                    "8" => Some(AudioChannels::Surround71),
                    "6" => Some(AudioChannels::Surround51),
                    _ => Some(AudioChannels::Stereo),
                })
        });

    let mut formats: Vec<AudioFormat> = AUDIO_FORMATS
        .iter()
        .filter(|(re, _)| re.is_match(text))
        .map(|(_, f)| *f)
        .collect();

    let lossless_dts =
        formats.contains(&AudioFormat::DtsHd) || formats.contains(&AudioFormat::DtsX);
    if DTS_RE.is_match(text) && !lossless_dts {
        formats.push(AudioFormat::Dts);
    }
    if DOLBY_DIGITAL_RE.is_match(text) && !formats.contains(&AudioFormat::DolbyDigitalPlus) {
        formats.push(AudioFormat::DolbyDigital);
    }

    (channels, formats)
}

fn languages(tail: &[String]) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();
    for token in tail {
        for (code, names) in LANGUAGE_TOKENS {
            if names.contains(&token.as_str()) && !found.iter().any(|c| c.as_str() == *code) {
                found.push((*code).to_string());
            }
        }
    }
    found
}

fn source(text: &str) -> Option<ReleaseSource> {
    LOW_QUALITY_SOURCES
        .iter()
        .chain(SOURCES.iter())
        .find(|(re, _)| re.is_match(text))
        .map(|(_, s)| *s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quality_detection() {
        assert_eq!(extract_attributes("Alpha.2020.2160p.WEB").quality, Quality::P2160);
        assert_eq!(extract_attributes("Alpha 2020 4K HDR").quality, Quality::P2160);
        assert_eq!(extract_attributes("Alpha.2020.1080p").quality, Quality::P1080);
        assert_eq!(extract_attributes("Alpha.2020.720p").quality, Quality::P720);
        assert_eq!(extract_attributes("Alpha.2020.DVDRip").quality, Quality::Sd);
        assert_eq!(extract_attributes("Alpha 2020").quality, Quality::Sd);
    }

    #[test]
    fn test_codec_detection() {
        assert_eq!(extract_attributes("Alpha.2020.1080p.AV1").codec, VideoCodec::Av1);
        assert_eq!(extract_attributes("Alpha.2020.1080p.x265").codec, VideoCodec::Hevc);
        assert_eq!(extract_attributes("Alpha.2020.1080p.H.265").codec, VideoCodec::Hevc);
        assert_eq!(extract_attributes("Alpha.2020.1080p.HEVC").codec, VideoCodec::Hevc);
        assert_eq!(extract_attributes("Alpha.2020.1080p.x264").codec, VideoCodec::H264);
        assert_eq!(extract_attributes("Alpha.2020.1080p.H.264").codec, VideoCodec::H264);
        assert_eq!(extract_attributes("Alpha.2020.1080p").codec, VideoCodec::Unknown);
    }

    #[test]
    fn test_dynamic_range_detection() {
        let dr = extract_attributes("Alpha.2020.2160p.DV.HDR10+.HEVC").dynamic_range;
        assert!(dr.dolby_vision);
        assert!(dr.hdr10_plus);
        assert!(dr.hdr);

        let dr = extract_attributes("Alpha.2020.2160p.Dolby.Vision").dynamic_range;
        assert!(dr.dolby_vision);
        assert!(!dr.hdr);

        let dr = extract_attributes("Alpha.2020.2160p.HDR.x265").dynamic_range;
        assert!(dr.hdr && !dr.dolby_vision);

        let dr = extract_attributes("Alpha.2020.DVDRip").dynamic_range;
        assert!(dr.is_sdr());
    }

    #[test]
    fn test_audio_detection() {
        let a = extract_attributes("Alpha.2020.1080p.TrueHD.7.1.Atmos");
        assert_eq!(a.audio_channels, Some(AudioChannels::Surround71));
        assert!(a.audio.contains(&AudioFormat::Atmos));
        assert!(a.audio.contains(&AudioFormat::TrueHd));

        let a = extract_attributes("Alpha.2020.1080p.WEB.DDP5.1.H.264");
        assert_eq!(a.audio_channels, Some(AudioChannels::Surround51));
        assert_eq!(a.audio, vec![AudioFormat::DolbyDigitalPlus]);

        let a = extract_attributes("Alpha.2020.1080p.DTS-HD.MA");
        assert_eq!(a.audio, vec![AudioFormat::DtsHd]);

        let a = extract_attributes("Alpha.2020.720p.AAC2.0");
        assert_eq!(a.audio_channels, Some(AudioChannels::Stereo));
        assert_eq!(a.audio, vec![AudioFormat::Aac]);
    }

    #[test]
    fn test_channels_not_confused_with_episode_numbers() {
        let a = extract_attributes("Show.S01E05.1080p.x264");
        assert_eq!(a.audio_channels, None);
    }

    #[test]
    fn test_language_detection_skips_title() {
        let a = extract_attributes("The.German.2006.1080p.FRENCH.x264");
        assert_eq!(a.languages, vec!["fr".to_string()]);

        let a = extract_attributes("Alpha.2020.MULTi.1080p");
        assert_eq!(a.languages, vec!["multi".to_string()]);

        assert!(extract_attributes("Alpha.2020.1080p").languages.is_empty());
    }

    #[test]
    fn test_source_detection() {
        let s = |n: &str| extract_attributes(n).source;
        assert_eq!(s("Alpha.2020.1080p.BluRay.REMUX"), Some(ReleaseSource::Remux));
        assert_eq!(s("Alpha.2020.1080p.BluRay.x264"), Some(ReleaseSource::BluRay));
        assert_eq!(s("Alpha.2020.1080p.WEB-DL"), Some(ReleaseSource::WebDl));
        assert_eq!(s("Alpha.2020.1080p.WEBRip"), Some(ReleaseSource::WebRip));
        assert_eq!(s("Alpha.2020.HDCAM.x264"), Some(ReleaseSource::Cam));
        assert_eq!(s("Alpha.2020.HDTS"), Some(ReleaseSource::Telesync));
        assert_eq!(s("Alpha.2020.DVDSCR"), Some(ReleaseSource::Screener));
        assert_eq!(s("Alpha.2020.1080p"), None);
        assert!(ReleaseSource::Cam.is_low_quality());
        assert!(!ReleaseSource::WebDl.is_low_quality());
    }

    #[test]
    fn test_group_is_carried() {
        let a = extract_attributes("Alpha.2020.1080p.WEB.x264-GRP");
        assert_eq!(a.group.as_deref(), Some("GRP"));
    }
}
