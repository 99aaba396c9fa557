use axum::{
    Router,
    http::HeaderValue,
    middleware,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::state::SharedState;

mod disambiguation;
mod error;
pub mod events;
mod extension;
mod library;
mod observability;
mod system;
mod types;

pub use error::ApiError;
pub use types::*;

use metrics_exporter_prometheus::PrometheusHandle;
use tokio::sync::RwLock;

#[derive(Clone)]
pub struct AppState {
    pub shared: Arc<SharedState>,

    pub start_time: std::time::Instant,

    pub prometheus_handle: Option<PrometheusHandle>,
}

impl AppState {
    #[must_use]
    pub fn config(&self) -> &Arc<RwLock<Config>> {
        &self.shared.config
    }

    #[must_use]
    pub fn store(&self) -> &crate::db::Store {
        &self.shared.store
    }

    #[must_use]
    pub fn event_bus(
        &self,
    ) -> &tokio::sync::broadcast::Sender<crate::domain::events::NotificationEvent> {
        &self.shared.event_bus
    }

    #[must_use]
    pub fn library_service(&self) -> &Arc<dyn crate::services::LibraryService> {
        &self.shared.library_service
    }

    #[must_use]
    pub fn orchestrator(&self) -> &Arc<crate::services::Orchestrator> {
        &self.shared.orchestrator
    }

    #[must_use]
    pub fn pipeline(&self) -> &crate::services::PipelineHandle {
        &self.shared.pipeline
    }
}

#[must_use]
pub fn create_app_state(
    shared: Arc<SharedState>,
    prometheus_handle: Option<PrometheusHandle>,
) -> Arc<AppState> {
    Arc::new(AppState {
        shared,
        start_time: std::time::Instant::now(),
        prometheus_handle,
    })
}

pub async fn create_app_state_from_config(
    config: Config,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<Arc<AppState>> {
    let shared = Arc::new(SharedState::new(config).await?);
    Ok(create_app_state(shared, prometheus_handle))
}

pub async fn router(state: Arc<AppState>) -> Router {
    let cors_origins = state.config().read().await.server.cors_allowed_origins.clone();

    let api_router = Router::new()
        .route("/library", get(library::list_entries))
        .route("/library/{id}", get(library::get_entry))
        .route("/history", get(library::get_history))
        .route("/pending", get(disambiguation::list_pending))
        .route("/pending/{id}/resolve", post(disambiguation::resolve))
        .route("/pending/{id}/cancel", post(disambiguation::cancel))
        .route("/health", get(system::health))
        .merge(events::router())
        .with_state(state.clone());

    let cors_layer = if cors_origins.contains(&"*".to_string()) {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins)
    };

    Router::new()
        .route("/extension-event", post(extension::receive_event))
        .route("/extension-event/clear", post(extension::clear_event))
        .route("/metrics", get(observability::get_metrics))
        .with_state(state)
        .nest("/api", api_router)
        .layer(cors_layer.allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(observability::track_metrics))
}
