use crate::domain::AnimeId;
use crate::models::{LibraryEntry, TitleMapping, WatchEvent};
use crate::services::reconciler::Reconciliation;
use anyhow::Result;
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement, TransactionTrait,
};
use std::path::Path;
use std::time::Duration;
use tracing::info;

pub mod migrator;
pub mod repositories;

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        let path_str = db_url.trim_start_matches("sqlite:").trim_start_matches("//");
        let in_memory = path_str.starts_with(":memory:");

        if !in_memory {
            let file_path = path_str.split('?').next().unwrap_or(path_str);
            if let Some(parent) = Path::new(file_path).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(file_path).exists() {
                std::fs::File::create(file_path)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .sqlx_logging(false);

        // Every pooled connection to `:memory:` is a separate database.
        if in_memory {
            opt.max_connections(1).min_connections(1);
        } else {
            opt.max_connections(max_connections)
                .min_connections(min_connections)
                .idle_timeout(Duration::from_secs(300))
                .max_lifetime(Duration::from_secs(600));
        }

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn library_repo(&self) -> repositories::library::LibraryRepository {
        repositories::library::LibraryRepository::new(self.conn.clone())
    }

    fn mapping_repo(&self) -> repositories::mappings::MappingRepository {
        repositories::mappings::MappingRepository::new(self.conn.clone())
    }

    fn watch_event_repo(&self) -> repositories::watch_events::WatchEventRepository {
        repositories::watch_events::WatchEventRepository::new(self.conn.clone())
    }

    // ========================================================================
    // Library
    // ========================================================================

    pub async fn list_entries(&self) -> Result<Vec<LibraryEntry>> {
        self.library_repo().list().await
    }

    pub async fn get_entry(&self, id: AnimeId) -> Result<Option<LibraryEntry>> {
        self.library_repo().get(id).await
    }

    pub async fn save_entry(&self, entry: &LibraryEntry) -> Result<()> {
        self.library_repo().save(entry).await
    }

    pub async fn remove_entry(&self, id: AnimeId) -> Result<bool> {
        self.library_repo().remove(id).await
    }

    /// Reads an entry, applies `apply` and stores the new entry together with
    /// its watch events in one transaction.
    ///
    /// Returns `None` when the entry does not exist.
    pub async fn commit_reconciliation<F>(
        &self,
        id: AnimeId,
        apply: F,
    ) -> Result<Option<Reconciliation>>
    where
        F: FnOnce(&LibraryEntry) -> Reconciliation + Send,
    {
        let txn = self.conn.begin().await?;

        let Some(current) = repositories::library::find(&txn, id).await? else {
            txn.rollback().await?;
            return Ok(None);
        };

        let reconciliation = apply(&current);

        if reconciliation.entry != current {
            repositories::library::upsert(&txn, &reconciliation.entry).await?;
        }
        repositories::watch_events::insert_many(&txn, &reconciliation.events).await?;

        txn.commit().await?;
        Ok(Some(reconciliation))
    }

    // ========================================================================
    // Title mappings
    // ========================================================================

    pub async fn add_mapping(&self, mapping: &TitleMapping) -> Result<()> {
        self.mapping_repo().add(mapping).await
    }

    pub async fn list_mappings(&self) -> Result<Vec<TitleMapping>> {
        self.mapping_repo().list().await
    }

    pub async fn remove_mapping(&self, raw_title_key: &str) -> Result<bool> {
        self.mapping_repo().remove(raw_title_key).await
    }

    // ========================================================================
    // Watch history
    // ========================================================================

    pub async fn recent_watch_events(&self, limit: u64) -> Result<Vec<WatchEvent>> {
        self.watch_event_repo().recent(limit).await
    }

    pub async fn watch_events_for(&self, anime_id: AnimeId) -> Result<Vec<WatchEvent>> {
        self.watch_event_repo().for_anime(anime_id).await
    }
}
