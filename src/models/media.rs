use serde::{Deserialize, Serialize};

use crate::domain::AnimeId;

/// Search result or lookup result from the media provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaSummary {
    pub id: AnimeId,
    pub title: String,
    pub title_english: Option<String>,
    pub title_japanese: Option<String>,
    pub episodes: Option<u32>,
}

impl MediaSummary {
    pub fn titles(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.title.as_str())
            .chain(self.title_english.as_deref())
            .chain(self.title_japanese.as_deref())
    }
}

/// A media node together with its prequel/sequel edges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaWithRelations {
    pub media: MediaSummary,
    pub prequel_id: Option<AnimeId>,
    pub sequel_id: Option<AnimeId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeasonEntry {
    pub anime_id: AnimeId,
    pub title: String,
    pub episode_count: Option<u32>,
}

impl From<&MediaSummary> for SeasonEntry {
    fn from(media: &MediaSummary) -> Self {
        Self {
            anime_id: media.id,
            title: media.title.clone(),
            episode_count: media.episodes,
        }
    }
}

/// Seasons of a franchise in airing order, index 0 is the first season.
///
/// Never contains the same `anime_id` twice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FranchiseTimeline {
    pub seasons: Vec<SeasonEntry>,
    /// Set when a lookup failed or the step bound was hit, so the timeline
    /// may be missing seasons.
    pub partial: bool,
}

impl FranchiseTimeline {
    #[must_use]
    pub fn single(season: SeasonEntry) -> Self {
        Self {
            seasons: vec![season],
            partial: true,
        }
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.seasons.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.seasons.is_empty()
    }

    #[must_use]
    pub fn contains(&self, id: AnimeId) -> bool {
        self.seasons.iter().any(|s| s.anime_id == id)
    }

    #[must_use]
    pub fn position(&self, id: AnimeId) -> Option<usize> {
        self.seasons.iter().position(|s| s.anime_id == id)
    }
}
