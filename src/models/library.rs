use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{AnimeId, WatchSource, WatchStatus};
use crate::models::MediaSummary;
use crate::parser::extract_season_number;

/// One tracked anime and the user's progress on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryEntry {
    pub id: AnimeId,
    pub title: String,
    pub title_english: Option<String>,
    pub title_japanese: Option<String>,
    pub episodes: Option<u32>,
    pub status: WatchStatus,
    pub progress: u32,
    pub updated_at: DateTime<Utc>,
}

impl LibraryEntry {
    #[must_use]
    pub fn from_media(media: &MediaSummary, status: WatchStatus, now: DateTime<Utc>) -> Self {
        Self {
            id: media.id,
            title: media.title.clone(),
            title_english: media.title_english.clone(),
            title_japanese: media.title_japanese.clone(),
            episodes: media.episodes,
            status,
            progress: 0,
            updated_at: now,
        }
    }

    /// Episode total, treating a zero count as unknown.
    #[must_use]
    pub fn known_episodes(&self) -> Option<u32> {
        self.episodes.filter(|&e| e > 0)
    }

    pub fn titles(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.title.as_str())
            .chain(self.title_english.as_deref())
            .chain(self.title_japanese.as_deref())
            .filter(|t| !t.is_empty())
    }

    #[must_use]
    pub fn display_progress(&self) -> String {
        self.known_episodes().map_or_else(
            || format!("{}/?", self.progress),
            |total| format!("{}/{total}", self.progress),
        )
    }
}

/// Human-confirmed association of a raw detected title with an anime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TitleMapping {
    pub raw_title_key: String,
    pub anime_id: AnimeId,
    pub created_at: DateTime<Utc>,
}

impl TitleMapping {
    /// Normalized lookup key of a raw title.
    #[must_use]
    pub fn key_for(raw_title: &str) -> String {
        raw_title.trim().to_lowercase()
    }

    /// Key for a title observed together with an explicit season.
    ///
    /// A season 2+ hint the title does not spell out itself is folded into
    /// the key, so a sequel mapping never captures season 1 detections of
    /// the same bare title.
    #[must_use]
    pub fn key_with_season(raw_title: &str, season_hint: Option<u32>) -> String {
        let key = Self::key_for(raw_title);
        match season_hint {
            Some(season) if season > 1 && extract_season_number(&key).is_none() => {
                format!("{key} season {season}")
            }
            _ => key,
        }
    }
}

/// Append-only record of one newly watched episode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchEvent {
    pub anime_id: AnimeId,
    pub episode_number: u32,
    pub timestamp: DateTime<Utc>,
    pub source: WatchSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClampReason {
    /// Observed episode was behind stored progress.
    Regression,
    /// Observed episode was past the known episode total.
    Ceiling,
}

/// Correction applied to an observed episode before it was stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressClamp {
    pub reason: ClampReason,
    pub clamped_from: u32,
    pub clamped_to: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(episodes: Option<u32>) -> LibraryEntry {
        LibraryEntry {
            id: AnimeId::new(1),
            title: "Frieren".to_string(),
            title_english: Some("Frieren: Beyond Journey's End".to_string()),
            title_japanese: Some(String::new()),
            episodes,
            status: WatchStatus::Watching,
            progress: 3,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_known_episodes_ignores_zero() {
        assert_eq!(entry(Some(0)).known_episodes(), None);
        assert_eq!(entry(Some(28)).known_episodes(), Some(28));
        assert_eq!(entry(None).known_episodes(), None);
    }

    #[test]
    fn test_titles_skip_empty() {
        let e = entry(None);
        assert_eq!(e.titles().count(), 2);
    }

    #[test]
    fn test_display_progress() {
        assert_eq!(entry(Some(28)).display_progress(), "3/28");
        assert_eq!(entry(None).display_progress(), "3/?");
    }

    #[test]
    fn test_mapping_key() {
        assert_eq!(TitleMapping::key_for("  Sousou no Frieren "), "sousou no frieren");
    }

    #[test]
    fn test_mapping_key_with_season() {
        assert_eq!(TitleMapping::key_with_season("Oshi no Ko", Some(2)), "oshi no ko season 2");
        assert_eq!(TitleMapping::key_with_season("Oshi no Ko", Some(1)), "oshi no ko");
        assert_eq!(TitleMapping::key_with_season("Oshi no Ko", None), "oshi no ko");
        assert_eq!(
            TitleMapping::key_with_season("Oshi no Ko 2nd Season", Some(2)),
            "oshi no ko 2nd season"
        );
    }
}
