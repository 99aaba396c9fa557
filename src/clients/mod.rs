//! Capabilities the pipeline consumes from the remote list provider.
//!
//! The pipeline only sees these traits; `anilist` is the production
//! implementation and tests plug in in-memory fakes.

pub mod anilist;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{AnimeId, WatchStatus};
use crate::models::{MediaSummary, MediaWithRelations};

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("GraphQL error: {0}")]
    GraphQl(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Media not found: {0}")]
    NotFound(AnimeId),

    #[error("Not authenticated: an access token is required")]
    Unauthenticated,
}

impl ProviderError {
    /// Transient failures worth another attempt.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::RateLimited)
    }
}

/// Relation and search lookups against the media database.
#[async_trait]
pub trait MediaProvider: Send + Sync {
    /// Fetches a media node with its prequel and sequel edges.
    async fn get_media_relations(&self, id: AnimeId)
    -> Result<MediaWithRelations, ProviderError>;

    /// Searches by title. `season_hint` is folded into the query as a
    /// `Season N` fragment the provider honors best-effort.
    async fn search_by_title(
        &self,
        query: &str,
        season_hint: Option<u32>,
    ) -> Result<Vec<MediaSummary>, ProviderError>;
}

/// Entry of the user's remote list, used for library import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteListEntry {
    pub media: MediaSummary,
    pub status: WatchStatus,
    pub progress: u32,
}

/// Write access to the user's remote list.
#[async_trait]
pub trait ListSync: Send + Sync {
    async fn update_progress(
        &self,
        id: AnimeId,
        progress: u32,
        status: WatchStatus,
        episode_hint: Option<u32>,
    ) -> Result<(), ProviderError>;

    async fn fetch_list(&self, user_name: &str) -> Result<Vec<RemoteListEntry>, ProviderError>;
}

/// Builds the provider query for a title and an optional season hint.
#[must_use]
pub fn season_query(query: &str, season_hint: Option<u32>) -> String {
    match season_hint {
        Some(season) if season > 1 && crate::parser::extract_season_number(query).is_none() => {
            format!("{query} Season {season}")
        }
        _ => query.to_string(),
    }
}
