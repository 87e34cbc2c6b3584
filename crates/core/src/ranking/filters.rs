//! User filter predicates.

use crate::availability::AvailabilityStatus;
use crate::matcher::{PackInfo, ReleaseAttributes};
use crate::provider::{RawResult, SourceKind};

use super::{FilterReason, UserFilters};

/// Language assumed for releases that advertise none.
const DEFAULT_LANGUAGE: &str = "en";
const MULTI_LANGUAGE: &str = "multi";

impl UserFilters {
    /// First filter that rejects the result, or None when it passes all of them.
    pub fn rejection(
        &self,
        result: &RawResult,
        attributes: &ReleaseAttributes,
        pack: Option<&PackInfo>,
        availability: Option<AvailabilityStatus>,
    ) -> Option<FilterReason> {
        let quality = attributes.quality;
        if self.min_quality.is_some_and(|min| quality < min)
            || self.max_quality.is_some_and(|max| quality > max)
        {
            return Some(FilterReason::Quality);
        }

        if self.excluded_codecs.contains(&attributes.codec) {
            return Some(FilterReason::Codec);
        }

        let range = &attributes.dynamic_range;
        if (self.exclude_dolby_vision && range.dolby_vision) || (self.exclude_hdr && range.is_hdr())
        {
            return Some(FilterReason::DynamicRange);
        }

        if self.exclude_low_quality_sources
            && attributes.source.is_some_and(|s| s.is_low_quality())
        {
            return Some(FilterReason::LowQualitySource);
        }

        if !self.languages_pass(&attributes.languages) {
            return Some(FilterReason::Language);
        }

        if self
            .max_size_bytes
            .is_some_and(|max| result.size_bytes > max)
        {
            return Some(FilterReason::Size);
        }

        let pack_rejected = match self.pack_policy {
            super::PackPolicy::Include => false,
            super::PackPolicy::Exclude => pack.is_some(),
            super::PackPolicy::Only => pack.is_none(),
        };
        if pack_rejected {
            return Some(FilterReason::Pack);
        }

        if result.kind == SourceKind::Torrent
            && self
                .min_seeders
                .is_some_and(|min| result.seeders.unwrap_or(0) < min)
        {
            return Some(FilterReason::Seeders);
        }

        if self.hide_uncached && availability == Some(AvailabilityStatus::Uncached) {
            return Some(FilterReason::Uncached);
        }

        None
    }

    /// Include: any detected language (or "multi") is wanted.
    /// Exclude: drop only when every detected language is unwanted.
    fn languages_pass(&self, detected: &[String]) -> bool {
        let default = [DEFAULT_LANGUAGE.to_string()];
        let detected: &[String] = if detected.is_empty() { &default } else { detected };

        let wanted = |lang: &String| {
            self.include_languages
                .iter()
                .any(|l| l.eq_ignore_ascii_case(lang))
        };
        let unwanted = |lang: &String| {
            self.exclude_languages
                .iter()
                .any(|l| l.eq_ignore_ascii_case(lang))
        };

        if !self.include_languages.is_empty()
            && !detected.iter().any(|l| l == MULTI_LANGUAGE || wanted(l))
        {
            return false;
        }

        if !self.exclude_languages.is_empty() && detected.iter().all(unwanted) {
            return false;
        }

        true
    }
}
