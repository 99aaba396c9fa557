use serde::{Deserialize, Serialize};

use crate::domain::{AnimeId, Platform};
use crate::models::EpisodeDetection;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub const fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Payload posted by the browser extension for the video it is playing.
///
/// Playback position fields are accepted for compatibility and only logged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionEvent {
    pub platform: Option<String>,
    pub title: Option<String>,
    pub overall_episode: Option<u32>,
    pub season_number: Option<u32>,
    pub season_episode: Option<u32>,
    pub url: Option<String>,
    pub watched_seconds: Option<f64>,
    pub duration_seconds: Option<f64>,
    pub progress: Option<f64>,
    pub completed_at: Option<String>,
}

impl ExtensionEvent {
    /// Converts into a detection, or names the missing required field.
    pub fn into_detection(self) -> Result<EpisodeDetection, &'static str> {
        let platform = self
            .platform
            .filter(|p| !p.trim().is_empty())
            .ok_or("platform is required")?;
        let title = self
            .title
            .filter(|t| !t.trim().is_empty())
            .ok_or("title is required")?;

        Ok(EpisodeDetection {
            platform: Platform::from_name(&platform),
            raw_title: title,
            overall_episode: self.overall_episode,
            season_number: self.season_number,
            season_episode: self.season_episode,
            url: self.url,
        }
        .with_usable_numbers())
    }
}

/// Reply format the extension expects.
#[derive(Debug, Serialize)]
pub struct ExtensionAck {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExtensionAck {
    #[must_use]
    pub const fn ok() -> Self {
        Self {
            ok: true,
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: Some(message.into()),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveRequest {
    pub anime_id: AnimeId,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthDto {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_seconds: u64,
    pub database: bool,
    pub pending_disambiguations: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_event_into_detection() {
        let event: ExtensionEvent = serde_json::from_str(
            r#"{"platform":"9anime","title":"Frieren","overallEpisode":14,"seasonNumber":2,"watchedSeconds":12.5}"#,
        )
        .unwrap();
        let detection = event.into_detection().unwrap();
        assert_eq!(detection.platform, Platform::NineAnime);
        assert_eq!(detection.overall_episode, Some(14));
        assert_eq!(detection.season_number, Some(2));
    }

    #[test]
    fn test_extension_event_requires_fields() {
        let missing_title = ExtensionEvent {
            platform: Some("netflix".to_string()),
            title: Some("  ".to_string()),
            ..ExtensionEvent::default()
        };
        assert_eq!(missing_title.into_detection(), Err("title is required"));

        let missing_platform = ExtensionEvent {
            title: Some("Show".to_string()),
            ..ExtensionEvent::default()
        };
        assert_eq!(missing_platform.into_detection(), Err("platform is required"));
    }

    #[test]
    fn test_extension_event_drops_unusable_episodes() {
        let event: ExtensionEvent = serde_json::from_str(
            r#"{"platform":"crunchyroll","title":"Frieren","overallEpisode":4294967295,"seasonEpisode":0}"#,
        )
        .unwrap();
        let detection = event.into_detection().unwrap();
        assert_eq!(detection.overall_episode, None);
        assert_eq!(detection.season_episode, None);
        assert!(!detection.has_episode());
    }
}
