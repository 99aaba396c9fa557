use super::{format_timestamp, parse_timestamp};
use crate::domain::AnimeId;
use crate::entities::{prelude::*, title_mappings};
use crate::models::TitleMapping;
use anyhow::Result;
use sea_orm::sea_query::OnConflict;
use sea_orm::{DatabaseConnection, EntityTrait, QueryOrder, Set};

pub struct MappingRepository {
    conn: DatabaseConnection,
}

impl MappingRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Stores a mapping, replacing any previous target for the same key.
    pub async fn add(&self, mapping: &TitleMapping) -> Result<()> {
        let active_model = title_mappings::ActiveModel {
            raw_title_key: Set(mapping.raw_title_key.clone()),
            anime_id: Set(mapping.anime_id.value()),
            created_at: Set(format_timestamp(&mapping.created_at)),
        };

        TitleMappings::insert(active_model)
            .on_conflict(
                OnConflict::column(title_mappings::Column::RawTitleKey)
                    .update_columns([
                        title_mappings::Column::AnimeId,
                        title_mappings::Column::CreatedAt,
                    ])
                    .to_owned(),
            )
            .exec(&self.conn)
            .await?;

        Ok(())
    }

    pub async fn list(&self) -> Result<Vec<TitleMapping>> {
        let rows = TitleMappings::find()
            .order_by_asc(title_mappings::Column::RawTitleKey)
            .all(&self.conn)
            .await?;

        rows.into_iter().map(map_model).collect()
    }

    pub async fn remove(&self, raw_title_key: &str) -> Result<bool> {
        let result = TitleMappings::delete_by_id(raw_title_key.to_string())
            .exec(&self.conn)
            .await?;
        Ok(result.rows_affected > 0)
    }
}

fn map_model(model: title_mappings::Model) -> Result<TitleMapping> {
    Ok(TitleMapping {
        raw_title_key: model.raw_title_key,
        anime_id: AnimeId::new(model.anime_id),
        created_at: parse_timestamp(&model.created_at)?,
    })
}
