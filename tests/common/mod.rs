//! In-memory provider and list sync shared by the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use shiori::clients::{ListSync, MediaProvider, ProviderError, RemoteListEntry};
use shiori::config::Config;
use shiori::domain::{AnimeId, WatchStatus};
use shiori::models::{MediaSummary, MediaWithRelations};
use shiori::state::SharedState;

pub fn media(id: i32, title: &str, episodes: Option<u32>) -> MediaSummary {
    MediaSummary {
        id: AnimeId::new(id),
        title: title.to_string(),
        title_english: None,
        title_japanese: None,
        episodes,
    }
}

#[derive(Default)]
pub struct FakeProvider {
    pub nodes: HashMap<AnimeId, MediaWithRelations>,
    /// Search results keyed by the lowercased query title.
    pub search_results: HashMap<String, Vec<MediaSummary>>,
    pub fail_search: bool,
}

impl FakeProvider {
    pub fn add_node(
        &mut self,
        media: MediaSummary,
        prequel: Option<i32>,
        sequel: Option<i32>,
    ) -> &mut Self {
        self.nodes.insert(
            media.id,
            MediaWithRelations {
                media,
                prequel_id: prequel.map(AnimeId::new),
                sequel_id: sequel.map(AnimeId::new),
            },
        );
        self
    }

    pub fn add_search(&mut self, query: &str, results: Vec<MediaSummary>) -> &mut Self {
        self.search_results.insert(query.to_lowercase(), results);
        self
    }
}

#[async_trait]
impl MediaProvider for FakeProvider {
    async fn get_media_relations(
        &self,
        id: AnimeId,
    ) -> Result<MediaWithRelations, ProviderError> {
        self.nodes.get(&id).cloned().ok_or(ProviderError::NotFound(id))
    }

    async fn search_by_title(
        &self,
        query: &str,
        _season_hint: Option<u32>,
    ) -> Result<Vec<MediaSummary>, ProviderError> {
        if self.fail_search {
            return Err(ProviderError::Network("connection refused".to_string()));
        }
        Ok(self
            .search_results
            .get(&query.to_lowercase())
            .cloned()
            .unwrap_or_default())
    }
}

#[derive(Default)]
pub struct RecordingSync {
    pub updates: Mutex<Vec<(AnimeId, u32, WatchStatus)>>,
    pub remote_list: Vec<RemoteListEntry>,
}

#[async_trait]
impl ListSync for RecordingSync {
    async fn update_progress(
        &self,
        id: AnimeId,
        progress: u32,
        status: WatchStatus,
        _episode_hint: Option<u32>,
    ) -> Result<(), ProviderError> {
        self.updates.lock().unwrap().push((id, progress, status));
        Ok(())
    }

    async fn fetch_list(&self, _user_name: &str) -> Result<Vec<RemoteListEntry>, ProviderError> {
        Ok(self.remote_list.clone())
    }
}

pub fn test_config() -> Config {
    let mut config = Config::default();
    config.general.database_path = "sqlite::memory:".to_string();
    config.watcher.enabled = false;
    config.observability.metrics_enabled = false;
    config
}

pub async fn spawn_state(provider: FakeProvider) -> Arc<SharedState> {
    let state = SharedState::with_clients(
        test_config(),
        Arc::new(provider),
        Arc::new(RecordingSync::default()),
    )
    .await
    .expect("Failed to create shared state");
    Arc::new(state)
}
