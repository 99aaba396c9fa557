//! Notification events published on the event bus.
//!
//! The SSE endpoint forwards these to the UI, which is also where
//! disambiguation requests get answered.

use serde::Serialize;
use uuid::Uuid;

use crate::domain::{AnimeId, Platform, WatchStatus};
use crate::models::{MediaSummary, ProgressClamp};

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", content = "payload")]
pub enum NotificationEvent {
    DetectionReceived {
        platform: Platform,
        title: String,
        episode: Option<u32>,
    },
    DetectionIgnored {
        title: String,
        reason: String,
    },

    /// Presence update: the final (anime, episode) a detection resolved to.
    NowWatching {
        anime_id: AnimeId,
        title: String,
        episode: u32,
    },

    ProgressUpdated {
        anime_id: AnimeId,
        title: String,
        progress: u32,
        episodes: Option<u32>,
        status: WatchStatus,
        clamp: Option<ProgressClamp>,
    },

    EntryAdded {
        anime_id: AnimeId,
        title: String,
        status: WatchStatus,
    },

    DisambiguationNeeded {
        request_id: Uuid,
        raw_title: String,
        episode: Option<u32>,
        candidates: Vec<MediaSummary>,
    },
    DisambiguationResolved {
        request_id: Uuid,
        anime_id: AnimeId,
    },
    DisambiguationCancelled {
        request_id: Uuid,
    },

    SyncFailed {
        anime_id: AnimeId,
        message: String,
    },

    Error {
        message: String,
    },
    Info {
        message: String,
    },
}
