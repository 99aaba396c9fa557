use axum::{
    Json,
    extract::{Path, State},
};
use std::sync::Arc;
use uuid::Uuid;

use super::{ApiError, ApiResponse, AppState, ResolveRequest};
use crate::services::{DetectionOutcome, PendingDisambiguation};

/// `GET /api/pending`
pub async fn list_pending(
    State(state): State<Arc<AppState>>,
) -> Json<ApiResponse<Vec<PendingDisambiguation>>> {
    Json(ApiResponse::success(state.orchestrator().pending().await))
}

/// `POST /api/pending/{id}/resolve`
///
/// Goes through the pipeline queue so the answer is applied in order with
/// detections that arrived before it.
pub async fn resolve(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(request): Json<ResolveRequest>,
) -> Result<Json<ApiResponse<DetectionOutcome>>, ApiError> {
    let outcome = state.pipeline().resolve(id, request.anime_id).await?;
    Ok(Json(ApiResponse::success(outcome)))
}

/// `POST /api/pending/{id}/cancel`
pub async fn cancel(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    state.pipeline().cancel(id).await?;
    Ok(Json(ApiResponse::success(())))
}
