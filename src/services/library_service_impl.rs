//! `SeaORM` implementation of the `LibraryService` trait.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, broadcast};

use crate::clients::RemoteListEntry;
use crate::constants::limits::MAX_EPISODE_NUMBER;
use crate::db::Store;
use crate::domain::events::NotificationEvent;
use crate::domain::{AnimeId, WatchSource, WatchStatus};
use crate::models::{LibraryEntry, MediaSummary, TitleMapping, WatchEvent};
use crate::services::library_service::{EnsuredEntry, MergeSummary};
use crate::services::reconciler::{Reconciliation, override_progress, reconcile};
use crate::services::sync::RemoteSync;
use crate::services::{LibraryError, LibraryService};

pub struct SeaOrmLibraryService {
    store: Store,
    event_bus: broadcast::Sender<NotificationEvent>,
    sync: Option<RemoteSync>,
    /// Per-anime write locks; held across the read-modify-write transaction.
    locks: Mutex<HashMap<AnimeId, Arc<Mutex<()>>>>,
}

impl SeaOrmLibraryService {
    #[must_use]
    pub fn new(store: Store, event_bus: broadcast::Sender<NotificationEvent>) -> Self {
        Self {
            store,
            event_bus,
            sync: None,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Pushes every committed change to the remote list.
    #[must_use]
    pub fn with_sync(mut self, sync: RemoteSync) -> Self {
        self.sync = Some(sync);
        self
    }

    /// Rejects episode numbers that would be stored as progress but cannot
    /// be one.
    fn check_episode(episode: u32) -> Result<(), LibraryError> {
        if episode > MAX_EPISODE_NUMBER {
            return Err(LibraryError::Validation(format!(
                "Episode {episode} exceeds the maximum of {MAX_EPISODE_NUMBER}"
            )));
        }
        Ok(())
    }

    async fn entry_lock(&self, id: AnimeId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        Arc::clone(locks.entry(id).or_default())
    }

    async fn commit<F>(&self, id: AnimeId, apply: F) -> Result<Reconciliation, LibraryError>
    where
        F: FnOnce(&LibraryEntry) -> Reconciliation + Send,
    {
        let lock = self.entry_lock(id).await;
        let _guard = lock.lock().await;

        let reconciliation = self
            .store
            .commit_reconciliation(id, apply)
            .await?
            .ok_or(LibraryError::NotFound(id))?;

        self.after_commit(&reconciliation);
        Ok(reconciliation)
    }

    fn after_commit(&self, reconciliation: &Reconciliation) {
        let entry = &reconciliation.entry;

        if let Some(clamp) = reconciliation.clamp {
            let reason = match clamp.reason {
                crate::models::ClampReason::Regression => "regression",
                crate::models::ClampReason::Ceiling => "ceiling",
            };
            metrics::counter!("shiori_progress_clamps_total", "reason" => reason).increment(1);
            tracing::debug!(
                anime_id = %entry.id,
                reason,
                clamped_from = clamp.clamped_from,
                clamped_to = clamp.clamped_to,
                "Observed episode clamped"
            );
        }

        if !reconciliation.changed() && entry.progress == reconciliation.previous_progress {
            return;
        }

        tracing::info!(
            event = "progress_updated",
            anime_id = %entry.id,
            title = %entry.title,
            progress = %entry.display_progress(),
            status = %entry.status,
            new_events = reconciliation.events.len(),
            "Library entry updated"
        );

        let _ = self.event_bus.send(NotificationEvent::ProgressUpdated {
            anime_id: entry.id,
            title: entry.title.clone(),
            progress: entry.progress,
            episodes: entry.episodes,
            status: entry.status,
            clamp: reconciliation.clamp,
        });

        if let Some(sync) = &self.sync {
            sync.push(entry, Some(entry.progress));
        }
    }
}

/// Merged form of a local entry and its remote counterpart, or `None` when
/// the merge changes nothing.
#[must_use]
pub fn merge_remote_entry(
    local: Option<&LibraryEntry>,
    remote: &RemoteListEntry,
    now: DateTime<Utc>,
) -> Option<LibraryEntry> {
    let mut merged = match local {
        Some(local) => {
            let mut merged = local.clone();
            merged.title.clone_from(&remote.media.title);
            merged.title_english.clone_from(&remote.media.title_english);
            merged.title_japanese.clone_from(&remote.media.title_japanese);
            merged.episodes = remote.media.episodes.or(local.episodes);
            merged.status = remote.status;
            merged.progress = local.progress.max(remote.progress);
            merged
        }
        None => {
            let mut entry = LibraryEntry::from_media(&remote.media, remote.status, now);
            entry.progress = remote.progress;
            entry
        }
    };

    if let Some(total) = merged.known_episodes() {
        merged.progress = merged.progress.min(total);
    }

    if local.is_some_and(|l| *l == merged) {
        return None;
    }

    merged.updated_at = now;
    Some(merged)
}

#[async_trait::async_trait]
impl LibraryService for SeaOrmLibraryService {
    async fn list_entries(&self) -> Result<Vec<LibraryEntry>, LibraryError> {
        Ok(self.store.list_entries().await?)
    }

    async fn get_entry(&self, id: AnimeId) -> Result<LibraryEntry, LibraryError> {
        self.store
            .get_entry(id)
            .await?
            .ok_or(LibraryError::NotFound(id))
    }

    async fn ensure_entry(
        &self,
        media: &MediaSummary,
        status: WatchStatus,
    ) -> Result<EnsuredEntry, LibraryError> {
        let lock = self.entry_lock(media.id).await;
        let _guard = lock.lock().await;

        if let Some(entry) = self.store.get_entry(media.id).await? {
            return Ok(EnsuredEntry {
                entry,
                created: false,
            });
        }

        let entry = LibraryEntry::from_media(media, status, Utc::now());
        self.store.save_entry(&entry).await?;

        tracing::info!(
            event = "entry_added",
            anime_id = %entry.id,
            title = %entry.title,
            status = %entry.status,
            "Added anime to library"
        );
        let _ = self.event_bus.send(NotificationEvent::EntryAdded {
            anime_id: entry.id,
            title: entry.title.clone(),
            status: entry.status,
        });

        Ok(EnsuredEntry {
            entry,
            created: true,
        })
    }

    async fn record_progress(
        &self,
        id: AnimeId,
        observed_episode: u32,
        source: WatchSource,
    ) -> Result<Reconciliation, LibraryError> {
        Self::check_episode(observed_episode)?;
        self.commit(id, move |entry| {
            reconcile(entry, observed_episode, source, None, Utc::now())
        })
        .await
    }

    async fn override_progress(
        &self,
        id: AnimeId,
        progress: u32,
    ) -> Result<Reconciliation, LibraryError> {
        Self::check_episode(progress)?;
        self.commit(id, move |entry| override_progress(entry, progress, Utc::now()))
            .await
    }

    async fn set_status(
        &self,
        id: AnimeId,
        status: WatchStatus,
    ) -> Result<Reconciliation, LibraryError> {
        self.commit(id, move |entry| {
            reconcile(
                entry,
                entry.progress,
                WatchSource::Manual,
                Some(status),
                Utc::now(),
            )
        })
        .await
    }

    async fn remove_entry(&self, id: AnimeId) -> Result<(), LibraryError> {
        let lock = self.entry_lock(id).await;
        let _guard = lock.lock().await;

        if !self.store.remove_entry(id).await? {
            return Err(LibraryError::NotFound(id));
        }

        tracing::info!(event = "entry_removed", anime_id = %id, "Removed anime from library");
        Ok(())
    }

    async fn list_mappings(&self) -> Result<Vec<TitleMapping>, LibraryError> {
        Ok(self.store.list_mappings().await?)
    }

    async fn add_mapping(
        &self,
        raw_title: &str,
        anime_id: AnimeId,
    ) -> Result<TitleMapping, LibraryError> {
        let raw_title_key = TitleMapping::key_for(raw_title);
        if raw_title_key.is_empty() {
            return Err(LibraryError::Validation(
                "Cannot map an empty title".to_string(),
            ));
        }

        let mapping = TitleMapping {
            raw_title_key,
            anime_id,
            created_at: Utc::now(),
        };
        self.store.add_mapping(&mapping).await?;

        tracing::info!(
            event = "mapping_added",
            raw_title = %mapping.raw_title_key,
            anime_id = %anime_id,
            "Recorded title mapping"
        );
        Ok(mapping)
    }

    async fn remove_mapping(&self, raw_title: &str) -> Result<bool, LibraryError> {
        Ok(self
            .store
            .remove_mapping(&TitleMapping::key_for(raw_title))
            .await?)
    }

    async fn history(&self, limit: u64) -> Result<Vec<WatchEvent>, LibraryError> {
        Ok(self.store.recent_watch_events(limit).await?)
    }

    async fn merge_remote(
        &self,
        remote: Vec<RemoteListEntry>,
    ) -> Result<MergeSummary, LibraryError> {
        let mut summary = MergeSummary::default();
        let now = Utc::now();

        for remote_entry in &remote {
            let id = remote_entry.media.id;
            let lock = self.entry_lock(id).await;
            let _guard = lock.lock().await;

            let local = self.store.get_entry(id).await?;
            match merge_remote_entry(local.as_ref(), remote_entry, now) {
                Some(merged) => {
                    self.store.save_entry(&merged).await?;
                    if local.is_some() {
                        summary.updated += 1;
                    } else {
                        summary.added += 1;
                    }
                }
                None => summary.unchanged += 1,
            }
        }

        tracing::info!(
            event = "remote_merged",
            added = summary.added,
            updated = summary.updated,
            unchanged = summary.unchanged,
            "Merged remote list into library"
        );
        let _ = self.event_bus.send(NotificationEvent::Info {
            message: format!(
                "Imported remote list: {} added, {} updated, {} unchanged",
                summary.added, summary.updated, summary.unchanged
            ),
        });

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn media(id: i32, episodes: Option<u32>) -> MediaSummary {
        MediaSummary {
            id: AnimeId::new(id),
            title: format!("Remote {id}"),
            title_english: None,
            title_japanese: None,
            episodes,
        }
    }

    fn remote(id: i32, status: WatchStatus, progress: u32) -> RemoteListEntry {
        RemoteListEntry {
            media: media(id, Some(12)),
            status,
            progress,
        }
    }

    async fn service() -> (SeaOrmLibraryService, broadcast::Receiver<NotificationEvent>) {
        let store = Store::new("sqlite::memory:").await.unwrap();
        let (tx, rx) = broadcast::channel(64);
        (SeaOrmLibraryService::new(store, tx), rx)
    }

    #[test]
    fn test_merge_keeps_larger_progress() {
        let now = Utc::now();
        let mut local = LibraryEntry::from_media(&media(1, Some(12)), WatchStatus::Watching, now);
        local.progress = 8;

        let merged =
            merge_remote_entry(Some(&local), &remote(1, WatchStatus::OnHold, 5), now).unwrap();
        assert_eq!(merged.progress, 8);
        assert_eq!(merged.status, WatchStatus::OnHold);
        assert_eq!(merged.title, "Remote 1");
    }

    #[test]
    fn test_merge_new_entry_clamped() {
        let merged =
            merge_remote_entry(None, &remote(2, WatchStatus::Completed, 40), Utc::now()).unwrap();
        assert_eq!(merged.progress, 12);
        assert_eq!(merged.status, WatchStatus::Completed);
    }

    #[test]
    fn test_merge_unchanged() {
        let now = Utc::now();
        let mut local = LibraryEntry::from_media(&media(3, Some(12)), WatchStatus::Watching, now);
        local.title = "Remote 3".to_string();
        local.progress = 4;
        assert_eq!(
            merge_remote_entry(Some(&local), &remote(3, WatchStatus::Watching, 4), now),
            None
        );
    }

    #[tokio::test]
    async fn test_record_progress_publishes_update() {
        let (service, mut rx) = service().await;
        service
            .ensure_entry(&media(10, Some(12)), WatchStatus::PlanToWatch)
            .await
            .unwrap();
        assert!(matches!(
            rx.try_recv().unwrap(),
            NotificationEvent::EntryAdded { .. }
        ));

        let r = service
            .record_progress(AnimeId::new(10), 2, WatchSource::Local)
            .await
            .unwrap();
        assert_eq!(r.entry.progress, 2);
        assert_eq!(r.entry.status, WatchStatus::Watching);

        match rx.try_recv().unwrap() {
            NotificationEvent::ProgressUpdated {
                progress, status, ..
            } => {
                assert_eq!(progress, 2);
                assert_eq!(status, WatchStatus::Watching);
            }
            other => panic!("unexpected event: {other:?}"),
        }

        assert_eq!(service.history(10).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_regression_is_silent() {
        let (service, mut rx) = service().await;
        service
            .ensure_entry(&media(11, Some(12)), WatchStatus::Watching)
            .await
            .unwrap();
        service
            .record_progress(AnimeId::new(11), 6, WatchSource::Extension)
            .await
            .unwrap();
        while rx.try_recv().is_ok() {}

        let r = service
            .record_progress(AnimeId::new(11), 2, WatchSource::Extension)
            .await
            .unwrap();
        assert_eq!(r.entry.progress, 6);
        assert!(r.clamp.is_some());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_out_of_range_episode_rejected() {
        let (service, _rx) = service().await;
        service
            .ensure_entry(&media(12, None), WatchStatus::Watching)
            .await
            .unwrap();

        let err = service
            .record_progress(AnimeId::new(12), u32::MAX, WatchSource::Extension)
            .await
            .unwrap_err();
        assert!(matches!(err, LibraryError::Validation(_)));
        assert!(matches!(
            service.override_progress(AnimeId::new(12), MAX_EPISODE_NUMBER + 1).await,
            Err(LibraryError::Validation(_))
        ));

        let entry = service.get_entry(AnimeId::new(12)).await.unwrap();
        assert_eq!(entry.progress, 0);
        assert!(service.history(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_entry() {
        let (service, _rx) = service().await;
        let err = service
            .record_progress(AnimeId::new(99), 1, WatchSource::Local)
            .await
            .unwrap_err();
        assert!(matches!(err, LibraryError::NotFound(id) if id == AnimeId::new(99)));
        assert!(matches!(
            service.remove_entry(AnimeId::new(99)).await,
            Err(LibraryError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_concurrent_updates_do_not_lose_progress() {
        let (service, _rx) = service().await;
        let service = Arc::new(service);
        service
            .ensure_entry(&media(12, None), WatchStatus::Watching)
            .await
            .unwrap();

        let handles: Vec<_> = (1..=8)
            .map(|episode| {
                let service = Arc::clone(&service);
                tokio::spawn(async move {
                    service
                        .record_progress(AnimeId::new(12), episode, WatchSource::Local)
                        .await
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let entry = service.get_entry(AnimeId::new(12)).await.unwrap();
        assert_eq!(entry.progress, 8);
        let events = service.history(100).await.unwrap();
        assert_eq!(events.len(), 8);
    }

    #[tokio::test]
    async fn test_mappings_and_status() {
        let (service, _rx) = service().await;
        assert!(matches!(
            service.add_mapping("   ", AnimeId::new(1)).await,
            Err(LibraryError::Validation(_))
        ));

        service.add_mapping("Some Show", AnimeId::new(1)).await.unwrap();
        assert_eq!(service.list_mappings().await.unwrap().len(), 1);
        assert!(service.remove_mapping("some show ").await.unwrap());

        service
            .ensure_entry(&media(1, Some(12)), WatchStatus::Watching)
            .await
            .unwrap();
        let r = service
            .set_status(AnimeId::new(1), WatchStatus::Dropped)
            .await
            .unwrap();
        assert_eq!(r.entry.status, WatchStatus::Dropped);
        assert!(r.events.is_empty());
    }

    #[tokio::test]
    async fn test_merge_remote_preserves_local_only() {
        let (service, _rx) = service().await;
        service
            .ensure_entry(&media(50, Some(12)), WatchStatus::Watching)
            .await
            .unwrap();

        let summary = service
            .merge_remote(vec![remote(51, WatchStatus::Completed, 12)])
            .await
            .unwrap();
        assert_eq!(summary.added, 1);

        let ids: Vec<i32> = service
            .list_entries()
            .await
            .unwrap()
            .iter()
            .map(|e| e.id.value())
            .collect();
        assert!(ids.contains(&50));
        assert!(ids.contains(&51));
    }
}
