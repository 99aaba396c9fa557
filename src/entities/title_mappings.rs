use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "title_mappings")]
pub struct Model {
    /// Lower-cased, trimmed raw title.
    #[sea_orm(primary_key, auto_increment = false)]
    pub raw_title_key: String,
    pub anime_id: i32,
    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
