//! Endpoint the browser extension posts playback detections to.
//!
//! The extension only understands `{ok}` / `{ok, error}` replies, so these
//! handlers answer in that shape instead of [`ApiResponse`](super::ApiResponse).

use axum::{Json, body::Bytes, extract::State, http::StatusCode};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{AppState, ExtensionAck, ExtensionEvent};
use crate::services::OrchestratorError;

type AckResponse = (StatusCode, Json<ExtensionAck>);

fn reject(status: StatusCode, message: impl Into<String>) -> AckResponse {
    (status, Json(ExtensionAck::error(message)))
}

/// `POST /extension-event`
pub async fn receive_event(State(state): State<Arc<AppState>>, body: Bytes) -> AckResponse {
    let event: ExtensionEvent = match serde_json::from_slice(&body) {
        Ok(event) => event,
        Err(e) => {
            debug!(error = %e, "Rejected malformed extension payload");
            return reject(StatusCode::BAD_REQUEST, "Invalid JSON body");
        }
    };

    let (watched, duration) = (event.watched_seconds, event.duration_seconds);
    let detection = match event.into_detection() {
        Ok(detection) => detection,
        Err(message) => return reject(StatusCode::BAD_REQUEST, message),
    };

    {
        let mut last = state.shared.last_extension_detection.write().await;
        if last
            .as_ref()
            .is_some_and(|l| l.dedupe_key() == detection.dedupe_key())
        {
            debug!(title = %detection.raw_title, "Ignoring repeated extension detection");
            return (StatusCode::OK, Json(ExtensionAck::ok()));
        }
        *last = Some(detection.clone());
    }

    info!(
        event = "extension_detection",
        platform = %detection.platform,
        title = %detection.raw_title,
        overall_episode = detection.overall_episode,
        season_number = detection.season_number,
        season_episode = detection.season_episode,
        watched_seconds = watched,
        duration_seconds = duration,
        "Received extension detection"
    );

    match state.pipeline().submit(detection).await {
        Ok(()) => (StatusCode::OK, Json(ExtensionAck::ok())),
        Err(OrchestratorError::PipelineClosed) => {
            warn!("Extension detection dropped, pipeline is not running");
            // Allow a retry of the same episode once the pipeline is back.
            *state.shared.last_extension_detection.write().await = None;
            reject(
                StatusCode::SERVICE_UNAVAILABLE,
                "Detection pipeline is not running",
            )
        }
        Err(e) => reject(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

/// `POST /extension-event/clear`: playback stopped, forget the last detection.
pub async fn clear_event(State(state): State<Arc<AppState>>) -> Json<ExtensionAck> {
    state.shared.last_extension_detection.write().await.take();
    Json(ExtensionAck::ok())
}
