use serde::{Deserialize, Serialize};

use crate::constants::limits::MAX_EPISODE_NUMBER;
use crate::domain::Platform;

/// Keeps an episode number only if it is usable as progress: episode 0 and
/// numbers above [`MAX_EPISODE_NUMBER`] count as missing.
#[must_use]
pub fn usable_episode(episode: Option<u32>) -> Option<u32> {
    episode.filter(|&n| (1..=MAX_EPISODE_NUMBER).contains(&n))
}

/// A single "user is watching X episode Y" observation.
///
/// Produced by the player watcher or the extension endpoint and consumed
/// once by the pipeline; only its effect on the library is persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeDetection {
    pub platform: Platform,
    pub raw_title: String,
    /// Franchise-global number as seen by the source, may span seasons.
    pub overall_episode: Option<u32>,
    pub season_number: Option<u32>,
    pub season_episode: Option<u32>,
    pub url: Option<String>,
}

impl EpisodeDetection {
    /// Detection from a media player window; only the raw title is known.
    #[must_use]
    pub fn local(raw_title: impl Into<String>) -> Self {
        Self {
            platform: Platform::Local,
            raw_title: raw_title.into(),
            overall_episode: None,
            season_number: None,
            season_episode: None,
            url: None,
        }
    }

    #[must_use]
    pub const fn has_episode(&self) -> bool {
        self.overall_episode.is_some() || self.season_episode.is_some()
    }

    /// Drops episode and season numbers that cannot be progress.
    #[must_use]
    pub fn with_usable_numbers(mut self) -> Self {
        self.overall_episode = usable_episode(self.overall_episode);
        self.season_episode = usable_episode(self.season_episode);
        self.season_number = self.season_number.filter(|&s| s > 0);
        self
    }

    /// Key used for duplicate suppression by the producers.
    #[must_use]
    pub fn dedupe_key(&self) -> (String, Option<u32>) {
        (
            self.raw_title.trim().to_lowercase(),
            self.season_episode.or(self.overall_episode),
        )
    }
}
