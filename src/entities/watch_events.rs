use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "watch_events")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub anime_id: i32,
    pub episode_number: i32,
    pub source: String,
    pub watched_at: String,
}

/// No foreign key: the log outlives removed library entries.
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
