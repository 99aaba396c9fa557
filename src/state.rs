use std::sync::Arc;
use tokio::sync::{RwLock, broadcast};

use crate::clients::anilist::AnilistClient;
use crate::clients::{ListSync, MediaProvider};
use crate::config::Config;
use crate::constants::pipeline::COMMAND_QUEUE_SIZE;
use crate::db::Store;
use crate::domain::events::NotificationEvent;
use crate::models::EpisodeDetection;
use crate::services::{
    LibraryService, Orchestrator, PipelineHandle, RemoteSync, SeaOrmLibraryService,
};

#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<RwLock<Config>>,

    pub store: Store,

    pub provider: Arc<dyn MediaProvider>,

    pub list_sync: Arc<dyn ListSync>,

    pub library_service: Arc<dyn LibraryService>,

    pub orchestrator: Arc<Orchestrator>,

    pub pipeline: PipelineHandle,

    pub event_bus: broadcast::Sender<NotificationEvent>,

    /// Last detection accepted from the browser extension, for repeat
    /// suppression until the extension reports that playback stopped.
    pub last_extension_detection: Arc<RwLock<Option<EpisodeDetection>>>,
}

impl SharedState {
    /// Builds the state with the AniList client as provider and list sync,
    /// and starts the detection pipeline task.
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let anilist = Arc::new(AnilistClient::new(&config.anilist)?);
        Self::with_clients(config, anilist.clone(), anilist).await
    }

    pub async fn with_clients(
        config: Config,
        provider: Arc<dyn MediaProvider>,
        list_sync: Arc<dyn ListSync>,
    ) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        let (event_bus, _) = broadcast::channel(config.general.event_bus_buffer_size.max(1));

        let mut library = SeaOrmLibraryService::new(store.clone(), event_bus.clone());
        if config.sync.enabled {
            library = library.with_sync(RemoteSync::new(list_sync.clone(), event_bus.clone()));
        }
        let library_service = Arc::new(library) as Arc<dyn LibraryService>;

        let orchestrator = Arc::new(Orchestrator::new(
            library_service.clone(),
            provider.clone(),
            &config.resolution,
            event_bus.clone(),
        ));

        let (pipeline, commands) = PipelineHandle::channel(COMMAND_QUEUE_SIZE);
        tokio::spawn(Arc::clone(&orchestrator).run(commands));

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            store,
            provider,
            list_sync,
            library_service,
            orchestrator,
            pipeline,
            event_bus,
            last_extension_detection: Arc::new(RwLock::new(None)),
        })
    }

    pub async fn config(&self) -> Config {
        self.config.read().await.clone()
    }
}
