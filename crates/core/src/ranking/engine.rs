use std::collections::HashMap;

use tracing::debug;

use super::{RankStats, RankedResult, Ranking, SortKey, UserFilters};
use crate::availability::{AvailabilityReport, AvailabilityStatus};
use crate::matcher::{MatchOutcome, ReleaseMatcher};
use crate::provider::{RawResult, SourceKind};
use crate::query::Query;

/// Matched result waiting for filters.
struct Candidate<'a> {
    ordinal: usize,
    result: &'a RawResult,
    outcome: MatchOutcome,
}

impl Candidate<'_> {
    /// Dedupe preference: more seeders, then larger size, then earlier position.
    fn beats(&self, other: &Candidate<'_>) -> bool {
        let mine = (self.result.seeders.unwrap_or(0), self.result.size_bytes);
        let theirs = (other.result.seeders.unwrap_or(0), other.result.size_bytes);
        mine > theirs || (mine == theirs && self.ordinal < other.ordinal)
    }
}

/// Turns a raw result set into the final ordered list.
///
/// One pass matches and deduplicates, a second pass over the survivors
/// filters and annotates them, then a single sort orders the output. The
/// output depends only on the inputs, never on provider completion order.
#[derive(Debug, Clone, Default)]
pub struct RankEngine {
    matcher: ReleaseMatcher,
}

impl RankEngine {
    pub fn new(matcher: ReleaseMatcher) -> Self {
        Self { matcher }
    }

    pub fn matcher(&self) -> &ReleaseMatcher {
        &self.matcher
    }

    /// Ranked results for `query`. Empty input or exhaustive filters give an empty list.
    pub fn rank(
        &self,
        raw: &[RawResult],
        query: &Query,
        availability: &AvailabilityReport,
        filters: &UserFilters,
    ) -> Vec<RankedResult> {
        self.rank_detailed(raw, query, availability, filters).results
    }

    /// Like `rank`, plus counters for what each stage removed.
    pub fn rank_detailed(
        &self,
        raw: &[RawResult],
        query: &Query,
        availability: &AvailabilityReport,
        filters: &UserFilters,
    ) -> Ranking {
        let mut stats = RankStats {
            input: raw.len(),
            ..Default::default()
        };

        // Pass 1: match and dedupe by hash.
        let mut candidates: Vec<Candidate<'_>> = Vec::new();
        let mut by_hash: HashMap<String, usize> = HashMap::new();
        for (ordinal, result) in raw.iter().enumerate() {
            let outcome = self.matcher.matches(query, &result.release_name);
            if !outcome.matched {
                stats.rejected_by_matcher += 1;
                continue;
            }

            let candidate = Candidate {
                ordinal,
                result,
                outcome,
            };
            match result.normalized_hash() {
                Some(hash) => match by_hash.get(&hash).copied() {
                    Some(slot) => {
                        stats.duplicates += 1;
                        if candidate.beats(&candidates[slot]) {
                            candidates[slot] = candidate;
                        }
                    }
                    None => {
                        by_hash.insert(hash, candidates.len());
                        candidates.push(candidate);
                    }
                },
                None => candidates.push(candidate),
            }
        }

        // Pass 2: filter and annotate.
        let mut ranked = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let hash = candidate.result.normalized_hash();
            let status = hash.as_deref().map(|h| availability.status_for(h));
            let attributes = candidate.outcome.attributes;
            let pack = candidate.outcome.pack;

            if let Some(reason) = filters.rejection(candidate.result, &attributes, pack.as_ref(), status) {
                *stats.filtered.entry(reason).or_default() += 1;
                continue;
            }

            let debrid_service = hash
                .as_deref()
                .and_then(|h| availability.cached_by(h))
                .map(str::to_string);
            let sort_key = SortKey {
                priority: priority_rank(filters, &candidate.result.provider),
                availability: availability_rank(candidate.result.kind, status),
                quality: quality_rank(filters, attributes.quality),
                seeders: candidate.result.seeders.unwrap_or(0),
                ordinal: candidate.ordinal,
            };

            ranked.push(RankedResult {
                result: candidate.result.clone(),
                matched: true,
                quality: attributes.quality,
                cache_provider: cache_provider_label(
                    candidate.result.kind,
                    status,
                    debrid_service.as_deref(),
                ),
                attributes,
                pack,
                availability: status,
                debrid_service,
                sort_key,
            });
        }

        ranked.sort_by(|a, b| a.sort_key.cmp(&b.sort_key));
        stats.output = ranked.len();

        debug!(
            input = stats.input,
            rejected = stats.rejected_by_matcher,
            duplicates = stats.duplicates,
            output = stats.output,
            "Ranking complete"
        );

        Ranking {
            results: ranked,
            stats,
        }
    }
}

fn priority_rank(filters: &UserFilters, provider: &str) -> usize {
    filters
        .priority_providers
        .iter()
        .position(|p| p.eq_ignore_ascii_case(provider))
        .unwrap_or(filters.priority_providers.len())
}

fn quality_rank(filters: &UserFilters, quality: crate::matcher::Quality) -> usize {
    filters
        .quality_ranking
        .iter()
        .position(|q| *q == quality)
        .unwrap_or(filters.quality_ranking.len())
}

/// Cached hashes and ready-to-play links first, then uncached, then unknown.
fn availability_rank(kind: SourceKind, status: Option<AvailabilityStatus>) -> u8 {
    match (kind, status) {
        (_, Some(AvailabilityStatus::Cached)) => 0,
        (_, Some(AvailabilityStatus::Uncached)) => 1,
        (_, Some(AvailabilityStatus::Unknown)) => 2,
        (SourceKind::Torrent, None) => 2,
        (_, None) => 0,
    }
}

fn cache_provider_label(
    kind: SourceKind,
    status: Option<AvailabilityStatus>,
    service: Option<&str>,
) -> String {
    match (status, service) {
        (Some(AvailabilityStatus::Cached), Some(service)) => format!("cached:{}", service),
        (Some(status), _) => status.as_str().to_string(),
        (None, _) => kind.as_str().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::availability::AvailabilityAnswer;
    use crate::matcher::Quality;
    use crate::ranking::FilterReason;
    use crate::testing::fixtures;
    use chrono::Utc;

    const NAME: &str = "Alpha.2020.1080p.WEB.x264-GRP";

    fn report(service: &str, answers: &[(String, bool)]) -> AvailabilityReport {
        let mut report = AvailabilityReport {
            services: vec![service.to_string()],
            ..Default::default()
        };
        for (hash, cached) in answers {
            report.push(AvailabilityAnswer {
                info_hash: hash.clone(),
                service: service.to_string(),
                cached: *cached,
                expires_at: Utc::now() + chrono::Duration::hours(1),
            });
        }
        report
    }

    fn engine() -> RankEngine {
        RankEngine::default()
    }

    #[test]
    fn test_empty_input() {
        let ranked = engine().rank(
            &[],
            &fixtures::alpha_query(),
            &AvailabilityReport::default(),
            &UserFilters::default(),
        );
        assert!(ranked.is_empty());
    }

    #[test]
    fn test_two_providers_ranked_by_seeders() {
        let raw = vec![
            fixtures::torrent("b", NAME, 2, 10),
            fixtures::torrent("a", NAME, 1, 50),
        ];
        let ranked = engine().rank(
            &raw,
            &fixtures::alpha_query(),
            &AvailabilityReport::default(),
            &UserFilters::default(),
        );
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].result.info_hash, Some(fixtures::info_hash(1)));
        assert_eq!(ranked[1].result.info_hash, Some(fixtures::info_hash(2)));
        assert!(ranked.iter().all(|r| r.matched));
    }

    #[test]
    fn test_non_matching_releases_discarded() {
        let raw = vec![
            fixtures::torrent("a", "Alpha.2017.1080p.WEB", 1, 50),
            fixtures::torrent("a", "Beta.2020.1080p.WEB", 2, 50),
            fixtures::torrent("a", "Alpha.2019.1080p.WEB", 3, 50),
        ];
        let ranking = engine().rank_detailed(
            &raw,
            &fixtures::alpha_query(),
            &AvailabilityReport::default(),
            &UserFilters::default(),
        );
        assert_eq!(ranking.results.len(), 1);
        assert_eq!(ranking.results[0].result.info_hash, Some(fixtures::info_hash(3)));
        assert_eq!(ranking.stats.rejected_by_matcher, 2);
    }

    #[test]
    fn test_dedupe_keeps_most_seeded() {
        let raw = vec![
            fixtures::torrent("a", NAME, 1, 5),
            fixtures::torrent("b", NAME, 1, 40),
            fixtures::torrent("c", NAME, 1, 40).with_size(1),
        ];
        let ranking = engine().rank_detailed(
            &raw,
            &fixtures::alpha_query(),
            &AvailabilityReport::default(),
            &UserFilters::default(),
        );
        assert_eq!(ranking.results.len(), 1);
        assert_eq!(ranking.results[0].result.provider, "b");
        assert_eq!(ranking.stats.duplicates, 2);
    }

    #[test]
    fn test_dedupe_is_case_insensitive() {
        let mut upper = fixtures::torrent("b", NAME, 1, 5);
        upper.info_hash = upper.info_hash.map(|h| h.to_uppercase());
        let raw = vec![fixtures::torrent("a", NAME, 1, 5), upper];
        let ranked = engine().rank(
            &raw,
            &fixtures::alpha_query(),
            &AvailabilityReport::default(),
            &UserFilters::default(),
        );
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].result.provider, "a");
    }

    #[test]
    fn test_availability_order_and_labels() {
        let h1 = fixtures::info_hash(1);
        let h2 = fixtures::info_hash(2);
        let h3 = fixtures::info_hash(3);
        let raw = vec![
            fixtures::torrent("a", NAME, 3, 10),
            fixtures::torrent("a", NAME, 2, 10),
            fixtures::torrent("a", NAME, 1, 10),
        ];
        let availability = report("debrid", &[(h1.clone(), true), (h2.clone(), false)]);

        let ranked = engine().rank(
            &raw,
            &fixtures::alpha_query(),
            &availability,
            &UserFilters::default(),
        );
        let hashes: Vec<_> = ranked.iter().map(|r| r.result.info_hash.clone().unwrap()).collect();
        assert_eq!(hashes, vec![h1, h2, h3]);
        assert_eq!(ranked[0].cache_provider, "cached:debrid");
        assert_eq!(ranked[0].debrid_service.as_deref(), Some("debrid"));
        assert_eq!(ranked[1].cache_provider, "uncached");
        assert_eq!(ranked[2].availability, Some(AvailabilityStatus::Unknown));
        assert_eq!(ranked[2].cache_provider, "unknown");
    }

    #[test]
    fn test_priority_providers_first() {
        let raw = vec![
            fixtures::torrent("busy", NAME, 1, 500),
            fixtures::torrent("favourite", NAME, 2, 1),
        ];
        let filters = UserFilters {
            priority_providers: vec!["favourite".to_string()],
            ..UserFilters::default()
        };
        let ranked = engine().rank(
            &raw,
            &fixtures::alpha_query(),
            &AvailabilityReport::default(),
            &filters,
        );
        assert_eq!(ranked[0].result.provider, "favourite");
    }

    #[test]
    fn test_quality_ranking_before_seeders() {
        let raw = vec![
            fixtures::torrent("a", "Alpha.2020.720p.WEB.x264", 1, 500),
            fixtures::torrent("a", "Alpha.2020.2160p.WEB.x265", 2, 1),
        ];
        let ranked = engine().rank(
            &raw,
            &fixtures::alpha_query(),
            &AvailabilityReport::default(),
            &UserFilters::default(),
        );
        assert_eq!(ranked[0].quality, Quality::P2160);

        let prefer_720 = UserFilters {
            quality_ranking: vec![Quality::P720, Quality::P2160],
            ..UserFilters::default()
        };
        let ranked = engine().rank(
            &raw,
            &fixtures::alpha_query(),
            &AvailabilityReport::default(),
            &prefer_720,
        );
        assert_eq!(ranked[0].quality, Quality::P720);
    }

    #[test]
    fn test_excluded_codec_removed_even_if_cached() {
        let av1 = fixtures::torrent("a", "Alpha.2020.2160p.WEB.AV1-GRP", 1, 100);
        let plain = fixtures::torrent("a", NAME, 2, 1);
        let availability = report("debrid", &[(fixtures::info_hash(1), true)]);

        let ranking = engine().rank_detailed(
            &[av1, plain],
            &fixtures::alpha_query(),
            &availability,
            &UserFilters::default(),
        );
        assert_eq!(ranking.results.len(), 1);
        assert_eq!(ranking.results[0].result.info_hash, Some(fixtures::info_hash(2)));
        assert_eq!(ranking.stats.filtered.get(&FilterReason::Codec), Some(&1));
    }

    #[test]
    fn test_filters_can_empty_the_list() {
        let raw = vec![fixtures::torrent("a", NAME, 1, 5)];
        let filters = UserFilters {
            min_quality: Some(Quality::P2160),
            ..UserFilters::default()
        };
        let ranked = engine().rank(
            &raw,
            &fixtures::alpha_query(),
            &AvailabilityReport::default(),
            &filters,
        );
        assert!(ranked.is_empty());
    }

    #[test]
    fn test_direct_links_rank_with_cached() {
        let raw = vec![
            fixtures::torrent("a", NAME, 1, 100),
            fixtures::direct("b", NAME, "https://cdn.example/alpha.mkv"),
        ];
        let ranked = engine().rank(
            &raw,
            &fixtures::alpha_query(),
            &report("debrid", &[(fixtures::info_hash(1), false)]),
            &UserFilters::default(),
        );
        assert_eq!(ranked[0].result.provider, "b");
        assert_eq!(ranked[0].cache_provider, "direct");
        assert_eq!(ranked[0].availability, None);
    }

    #[test]
    fn test_output_independent_of_input_order() {
        let a = fixtures::torrent("a", NAME, 1, 30);
        let b = fixtures::torrent("b", NAME, 2, 30);
        let c = fixtures::torrent("c", "Alpha.2020.2160p.WEB.x265", 3, 5);
        let availability = report("debrid", &[(fixtures::info_hash(2), true)]);
        let query = fixtures::alpha_query();
        let filters = UserFilters::default();

        let providers = |ranked: Vec<RankedResult>| -> Vec<String> {
            ranked.into_iter().map(|r| r.result.provider).collect()
        };
        let first = engine().rank(&[a.clone(), b.clone(), c.clone()], &query, &availability, &filters);
        let reversed = engine().rank(&[c, b, a], &query, &availability, &filters);

        assert_eq!(providers(first), vec!["b", "c", "a"]);
        assert_eq!(providers(reversed), vec!["b", "c", "a"]);
    }
}
