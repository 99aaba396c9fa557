use super::{format_timestamp, from_db_count, parse_timestamp, to_db_count};
use crate::constants::limits::WATCH_EVENT_BATCH_SIZE;
use crate::domain::{AnimeId, WatchSource};
use crate::entities::{prelude::*, watch_events};
use crate::models::WatchEvent;
use anyhow::{Result, anyhow};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};

pub struct WatchEventRepository {
    conn: DatabaseConnection,
}

impl WatchEventRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Most recent events first.
    pub async fn recent(&self, limit: u64) -> Result<Vec<WatchEvent>> {
        let rows = WatchEvents::find()
            .order_by_desc(watch_events::Column::WatchedAt)
            .order_by_desc(watch_events::Column::Id)
            .limit(limit)
            .all(&self.conn)
            .await?;

        rows.into_iter().map(map_model).collect()
    }

    /// Events of one anime in the order they were recorded.
    pub async fn for_anime(&self, anime_id: AnimeId) -> Result<Vec<WatchEvent>> {
        let rows = WatchEvents::find()
            .filter(watch_events::Column::AnimeId.eq(anime_id.value()))
            .order_by_asc(watch_events::Column::Id)
            .all(&self.conn)
            .await?;

        rows.into_iter().map(map_model).collect()
    }
}

/// Inserts `events` in statements of at most [`WATCH_EVENT_BATCH_SIZE`] rows.
pub(crate) async fn insert_many<C: ConnectionTrait>(conn: &C, events: &[WatchEvent]) -> Result<()> {
    for chunk in events.chunks(WATCH_EVENT_BATCH_SIZE) {
        let models = chunk.iter().map(|event| watch_events::ActiveModel {
            anime_id: Set(event.anime_id.value()),
            episode_number: Set(to_db_count(event.episode_number)),
            source: Set(event.source.as_str().to_string()),
            watched_at: Set(format_timestamp(&event.timestamp)),
            ..Default::default()
        });

        WatchEvents::insert_many(models).exec(conn).await?;
    }
    Ok(())
}

fn map_model(model: watch_events::Model) -> Result<WatchEvent> {
    let source: WatchSource = model.source.parse().map_err(|e: String| anyhow!(e))?;

    Ok(WatchEvent {
        anime_id: AnimeId::new(model.anime_id),
        episode_number: from_db_count(model.episode_number),
        timestamp: parse_timestamp(&model.watched_at)?,
        source,
    })
}
