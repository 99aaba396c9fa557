use super::{format_timestamp, from_db_count, parse_timestamp, to_db_count};
use crate::domain::{AnimeId, WatchStatus};
use crate::entities::{library_entries, prelude::*};
use crate::models::LibraryEntry;
use anyhow::{Context, Result};
use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ConnectionTrait, DatabaseConnection, EntityTrait, QueryOrder, Set};

pub struct LibraryRepository {
    conn: DatabaseConnection,
}

impl LibraryRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn list(&self) -> Result<Vec<LibraryEntry>> {
        let rows = LibraryEntries::find()
            .order_by_asc(library_entries::Column::Title)
            .all(&self.conn)
            .await?;

        rows.into_iter().map(map_model).collect()
    }

    pub async fn get(&self, id: AnimeId) -> Result<Option<LibraryEntry>> {
        find(&self.conn, id).await
    }

    pub async fn save(&self, entry: &LibraryEntry) -> Result<()> {
        upsert(&self.conn, entry).await
    }

    pub async fn remove(&self, id: AnimeId) -> Result<bool> {
        let result = LibraryEntries::delete_by_id(id.value())
            .exec(&self.conn)
            .await?;
        Ok(result.rows_affected > 0)
    }
}

pub(crate) async fn find<C: ConnectionTrait>(conn: &C, id: AnimeId) -> Result<Option<LibraryEntry>> {
    LibraryEntries::find_by_id(id.value())
        .one(conn)
        .await?
        .map(map_model)
        .transpose()
}

/// Inserts or fully replaces an entry; `created_at` is kept on update.
pub(crate) async fn upsert<C: ConnectionTrait>(conn: &C, entry: &LibraryEntry) -> Result<()> {
    let updated_at = format_timestamp(&entry.updated_at);
    let active_model = library_entries::ActiveModel {
        id: Set(entry.id.value()),
        title: Set(entry.title.clone()),
        title_english: Set(entry.title_english.clone()),
        title_japanese: Set(entry.title_japanese.clone()),
        episodes: Set(entry.episodes.map(to_db_count)),
        status: Set(entry.status.as_str().to_string()),
        progress: Set(to_db_count(entry.progress)),
        created_at: Set(format_timestamp(&Utc::now())),
        updated_at: Set(updated_at),
    };

    LibraryEntries::insert(active_model)
        .on_conflict(
            OnConflict::column(library_entries::Column::Id)
                .update_columns([
                    library_entries::Column::Title,
                    library_entries::Column::TitleEnglish,
                    library_entries::Column::TitleJapanese,
                    library_entries::Column::Episodes,
                    library_entries::Column::Status,
                    library_entries::Column::Progress,
                    library_entries::Column::UpdatedAt,
                ])
                .to_owned(),
        )
        .exec(conn)
        .await?;

    Ok(())
}

fn map_model(model: library_entries::Model) -> Result<LibraryEntry> {
    let status: WatchStatus = model
        .status
        .parse()
        .with_context(|| format!("Library entry {} has a corrupt status", model.id))?;

    Ok(LibraryEntry {
        id: AnimeId::new(model.id),
        title: model.title,
        title_english: model.title_english,
        title_japanese: model.title_japanese,
        episodes: model.episodes.map(from_db_count),
        status,
        progress: from_db_count(model.progress),
        updated_at: parse_timestamp(&model.updated_at)?,
    })
}
