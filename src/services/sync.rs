//! Fire-and-forget push of local progress to the remote list.

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::clients::ListSync;
use crate::domain::events::NotificationEvent;
use crate::models::LibraryEntry;

#[derive(Clone)]
pub struct RemoteSync {
    client: Arc<dyn ListSync>,
    event_bus: broadcast::Sender<NotificationEvent>,
}

impl RemoteSync {
    #[must_use]
    pub fn new(client: Arc<dyn ListSync>, event_bus: broadcast::Sender<NotificationEvent>) -> Self {
        Self { client, event_bus }
    }

    /// Spawns the remote update for an already committed entry.
    ///
    /// Failures are logged and published as [`NotificationEvent::SyncFailed`];
    /// the local entry stays as committed.
    pub fn push(&self, entry: &LibraryEntry, episode_hint: Option<u32>) -> JoinHandle<()> {
        let client = Arc::clone(&self.client);
        let event_bus = self.event_bus.clone();
        let anime_id = entry.id;
        let progress = entry.progress;
        let status = entry.status;

        tokio::spawn(async move {
            match client
                .update_progress(anime_id, progress, status, episode_hint)
                .await
            {
                Ok(()) => {
                    metrics::counter!("shiori_sync_total", "result" => "ok").increment(1);
                    tracing::debug!(
                        anime_id = %anime_id,
                        progress,
                        status = %status,
                        remote_status = status.to_remote().as_str(),
                        "Remote list updated"
                    );
                }
                Err(e) => {
                    metrics::counter!("shiori_sync_total", "result" => "failed").increment(1);
                    tracing::warn!(
                        anime_id = %anime_id,
                        progress,
                        error = %e,
                        "Remote list update failed, local state kept"
                    );
                    let _ = event_bus.send(NotificationEvent::SyncFailed {
                        anime_id,
                        message: e.to_string(),
                    });
                }
            }
        })
    }
}
