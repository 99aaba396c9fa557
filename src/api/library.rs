use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState};
use crate::constants::limits::{DEFAULT_HISTORY_LIMIT, MAX_HISTORY_LIMIT};
use crate::domain::AnimeId;
use crate::models::{LibraryEntry, WatchEvent};

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<u64>,
}

/// `GET /api/library`
pub async fn list_entries(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<LibraryEntry>>>, ApiError> {
    let entries = state.library_service().list_entries().await?;
    Ok(Json(ApiResponse::success(entries)))
}

/// `GET /api/library/{id}`
pub async fn get_entry(
    State(state): State<Arc<AppState>>,
    Path(id): Path<AnimeId>,
) -> Result<Json<ApiResponse<LibraryEntry>>, ApiError> {
    let entry = state.library_service().get_entry(id).await?;
    Ok(Json(ApiResponse::success(entry)))
}

/// `GET /api/history?limit=N`, newest first.
pub async fn get_history(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<ApiResponse<Vec<WatchEvent>>>, ApiError> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, MAX_HISTORY_LIMIT);
    let events = state.library_service().history(limit).await?;
    Ok(Json(ApiResponse::success(events)))
}
