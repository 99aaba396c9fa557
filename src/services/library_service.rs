//! Domain service owning the watch library.
//!
//! All writes to library entries go through this service. Writes for one
//! anime are serialized, and each progress update is committed together with
//! its watch events.

use serde::Serialize;
use thiserror::Error;

use crate::clients::RemoteListEntry;
use crate::domain::{AnimeId, WatchSource, WatchStatus};
use crate::models::{LibraryEntry, MediaSummary, TitleMapping, WatchEvent};
use crate::services::reconciler::Reconciliation;

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("Anime not found in library: {0}")]
    NotFound(AnimeId),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Validation failed: {0}")]
    Validation(String),
}

impl From<sea_orm::DbErr> for LibraryError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for LibraryError {
    fn from(err: anyhow::Error) -> Self {
        Self::Database(err.to_string())
    }
}

/// Result of [`LibraryService::ensure_entry`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnsuredEntry {
    pub entry: LibraryEntry,
    pub created: bool,
}

/// Counts of a remote list merge.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct MergeSummary {
    pub added: usize,
    pub updated: usize,
    pub unchanged: usize,
}

#[async_trait::async_trait]
pub trait LibraryService: Send + Sync {
    async fn list_entries(&self) -> Result<Vec<LibraryEntry>, LibraryError>;

    /// # Errors
    ///
    /// Returns [`LibraryError::NotFound`] if the anime is not in the library.
    async fn get_entry(&self, id: AnimeId) -> Result<LibraryEntry, LibraryError>;

    /// Returns the existing entry for `media.id`, or inserts a new one with
    /// `status` and zero progress.
    async fn ensure_entry(
        &self,
        media: &MediaSummary,
        status: WatchStatus,
    ) -> Result<EnsuredEntry, LibraryError>;

    /// Applies an observed episode through the progress state machine.
    ///
    /// # Errors
    ///
    /// Returns [`LibraryError::NotFound`] if the anime is not in the library.
    async fn record_progress(
        &self,
        id: AnimeId,
        observed_episode: u32,
        source: WatchSource,
    ) -> Result<Reconciliation, LibraryError>;

    /// User correction of progress; may move backwards.
    async fn override_progress(
        &self,
        id: AnimeId,
        progress: u32,
    ) -> Result<Reconciliation, LibraryError>;

    async fn set_status(
        &self,
        id: AnimeId,
        status: WatchStatus,
    ) -> Result<Reconciliation, LibraryError>;

    /// Removes an entry. Its watch history is kept.
    async fn remove_entry(&self, id: AnimeId) -> Result<(), LibraryError>;

    async fn list_mappings(&self) -> Result<Vec<TitleMapping>, LibraryError>;

    /// Maps a raw detected title to an anime, replacing an earlier mapping.
    ///
    /// # Errors
    ///
    /// Returns [`LibraryError::Validation`] for a blank title.
    async fn add_mapping(
        &self,
        raw_title: &str,
        anime_id: AnimeId,
    ) -> Result<TitleMapping, LibraryError>;

    async fn remove_mapping(&self, raw_title: &str) -> Result<bool, LibraryError>;

    /// Most recent watch events first.
    async fn history(&self, limit: u64) -> Result<Vec<WatchEvent>, LibraryError>;

    /// Merges the user's remote list into the library.
    ///
    /// Local-only entries are kept. Shared entries take the remote status and
    /// metadata and the larger of both progress values.
    async fn merge_remote(
        &self,
        remote: Vec<RemoteListEntry>,
    ) -> Result<MergeSummary, LibraryError>;
}
