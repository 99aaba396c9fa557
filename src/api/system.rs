use axum::{Json, extract::State};
use std::sync::Arc;

use super::{AppState, HealthDto};

/// `GET /api/health`
///
/// Always answers 200; `database` reports whether the store responds.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthDto> {
    let database = state.store().ping().await.is_ok();
    let pending = state.orchestrator().pending().await.len();

    Json(HealthDto {
        status: if database { "ok" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        database,
        pending_disambiguations: pending,
    })
}
