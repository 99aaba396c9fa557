//! Absolute ("global") to season-relative episode mapping.

use serde::Serialize;

use crate::config::ResolutionConfig;
use crate::domain::AnimeId;
use crate::models::FranchiseTimeline;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedEpisode {
    pub anime_id: AnimeId,
    pub episode: u32,
    pub title: String,
    /// 0-based position of the season in the timeline.
    pub season_index: usize,
    /// The absolute number ran past every known season.
    pub extrapolated: bool,
}

/// Maps `absolute_episode` onto a season of `timeline`.
///
/// Seasons with unknown length count as `fallback_count` episodes. Numbers
/// beyond the whole timeline land in the last season, counted from that
/// season's start. Returns `None` only for an empty timeline.
#[must_use]
pub fn resolve_episode(
    timeline: &FranchiseTimeline,
    absolute_episode: u32,
    fallback_count: u32,
) -> Option<ResolvedEpisode> {
    let mut cumulative_offset = 0_u32;

    for (index, season) in timeline.seasons.iter().enumerate() {
        let max_episodes = season
            .episode_count
            .filter(|&c| c > 0)
            .unwrap_or(fallback_count);

        if absolute_episode <= cumulative_offset.saturating_add(max_episodes) {
            return Some(ResolvedEpisode {
                anime_id: season.anime_id,
                episode: absolute_episode - cumulative_offset,
                title: season.title.clone(),
                season_index: index,
                extrapolated: false,
            });
        }

        cumulative_offset = cumulative_offset.saturating_add(max_episodes);
    }

    let index = timeline.len().checked_sub(1)?;
    let last = &timeline.seasons[index];
    let last_count = last
        .episode_count
        .filter(|&c| c > 0)
        .unwrap_or(fallback_count);

    Some(ResolvedEpisode {
        anime_id: last.anime_id,
        episode: absolute_episode - cumulative_offset + last_count,
        title: last.title.clone(),
        season_index: index,
        extrapolated: true,
    })
}

/// Whether an observed episode should be treated as franchise-global.
///
/// Only when an absolute number is present, and it either exceeds the
/// matched season's known total or exceeds `threshold` while the detection
/// names season 2 or later.
#[must_use]
pub fn needs_resolution(
    overall_episode: Option<u32>,
    season_hint: Option<u32>,
    matched_total: Option<u32>,
    threshold: u32,
) -> bool {
    let Some(overall) = overall_episode else {
        return false;
    };

    let exceeds_total = matched_total.is_some_and(|total| total > 0 && overall > total);
    let late_season = season_hint.is_some_and(|s| s >= 2) && overall > threshold;

    exceeds_total || late_season
}

/// Configured view of the two functions above.
#[derive(Debug, Clone, Copy)]
pub struct EpisodeResolver {
    fallback_episode_count: u32,
    absolute_episode_threshold: u32,
}

impl EpisodeResolver {
    #[must_use]
    pub const fn new(config: &ResolutionConfig) -> Self {
        Self {
            fallback_episode_count: config.fallback_episode_count,
            absolute_episode_threshold: config.absolute_episode_threshold,
        }
    }

    #[must_use]
    pub fn needs_resolution(
        &self,
        overall_episode: Option<u32>,
        season_hint: Option<u32>,
        matched_total: Option<u32>,
    ) -> bool {
        needs_resolution(
            overall_episode,
            season_hint,
            matched_total,
            self.absolute_episode_threshold,
        )
    }

    #[must_use]
    pub fn resolve(
        &self,
        timeline: &FranchiseTimeline,
        absolute_episode: u32,
    ) -> Option<ResolvedEpisode> {
        resolve_episode(timeline, absolute_episode, self.fallback_episode_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SeasonEntry;

    const FALLBACK: u32 = 25;

    fn timeline(counts: &[Option<u32>]) -> FranchiseTimeline {
        FranchiseTimeline {
            seasons: counts
                .iter()
                .enumerate()
                .map(|(i, &episode_count)| SeasonEntry {
                    anime_id: AnimeId::new(i32::try_from(i).unwrap() + 100),
                    title: format!("Season {}", i + 1),
                    episode_count,
                })
                .collect(),
            partial: false,
        }
    }

    #[test]
    fn test_franchise_split() {
        let t = timeline(&[Some(12), Some(11)]);
        let r = resolve_episode(&t, 14, FALLBACK).unwrap();
        assert_eq!(r.season_index, 1);
        assert_eq!(r.episode, 2);
        assert_eq!(r.anime_id, AnimeId::new(101));
        assert!(!r.extrapolated);
    }

    #[test]
    fn test_season_boundaries() {
        let t = timeline(&[Some(12), Some(11)]);
        assert_eq!(resolve_episode(&t, 12, FALLBACK).unwrap().season_index, 0);
        assert_eq!(resolve_episode(&t, 12, FALLBACK).unwrap().episode, 12);
        assert_eq!(resolve_episode(&t, 13, FALLBACK).unwrap().season_index, 1);
        assert_eq!(resolve_episode(&t, 13, FALLBACK).unwrap().episode, 1);
    }

    #[test]
    fn test_monotonic_coverage() {
        for counts in [vec![12, 11], vec![1, 1, 1], vec![24, 12, 13, 25], vec![7]] {
            let t = timeline(&counts.iter().map(|&c| Some(c)).collect::<Vec<_>>());
            let total: u32 = counts.iter().sum();

            for absolute in 1..=total {
                let r = resolve_episode(&t, absolute, FALLBACK).unwrap();
                let before: u32 = counts[..r.season_index].iter().sum();
                let through = before + counts[r.season_index];
                assert!(before < absolute && absolute <= through, "{counts:?} {absolute}");
                assert_eq!(r.episode, absolute - before);
                assert!(!r.extrapolated);
            }
        }
    }

    #[test]
    fn test_extrapolation_past_known_timeline() {
        let counts = [12_u32, 11];
        let t = timeline(&[Some(12), Some(11)]);
        for absolute in 24..40 {
            let r = resolve_episode(&t, absolute, FALLBACK).unwrap();
            assert_eq!(r.season_index, 1);
            assert!(r.extrapolated);
            assert!(r.episode > counts[1]);
            assert_eq!(r.episode, absolute - 12);
        }
    }

    #[test]
    fn test_unknown_count_uses_fallback() {
        let t = timeline(&[Some(12), None, Some(10)]);
        let r = resolve_episode(&t, 30, FALLBACK).unwrap();
        assert_eq!(r.season_index, 1);
        assert_eq!(r.episode, 18);

        let r = resolve_episode(&t, 38, FALLBACK).unwrap();
        assert_eq!(r.season_index, 2);
        assert_eq!(r.episode, 1);
    }

    #[test]
    fn test_zero_count_treated_as_unknown() {
        let t = timeline(&[Some(0), Some(12)]);
        let r = resolve_episode(&t, 20, FALLBACK).unwrap();
        assert_eq!(r.season_index, 0);
        assert_eq!(r.episode, 20);
    }

    #[test]
    fn test_empty_timeline() {
        assert_eq!(resolve_episode(&FranchiseTimeline::default(), 3, FALLBACK), None);
    }

    #[test]
    fn test_needs_resolution() {
        assert!(!needs_resolution(None, Some(2), Some(12), 24));
        assert!(needs_resolution(Some(14), None, Some(12), 24));
        assert!(!needs_resolution(Some(12), None, Some(12), 24));
        assert!(!needs_resolution(Some(30), None, None, 24));
        assert!(needs_resolution(Some(30), Some(2), None, 24));
        assert!(!needs_resolution(Some(24), Some(2), None, 24));
        assert!(!needs_resolution(Some(30), Some(1), None, 24));
        assert!(!needs_resolution(Some(5), Some(0), Some(0), 24));
    }

    #[test]
    fn test_configured_resolver() {
        let config = ResolutionConfig {
            absolute_episode_threshold: 12,
            ..ResolutionConfig::default()
        };
        let resolver = EpisodeResolver::new(&config);
        assert!(resolver.needs_resolution(Some(13), Some(2), None));
        let t = timeline(&[None, None]);
        assert_eq!(resolver.resolve(&t, 26).unwrap().season_index, 1);
    }
}
