//! Session Control Routes

use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::{ApiError, AppState};

/// Response for start/stop
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub status: &'static str,
}

/// Open the camera and begin a detection session
pub async fn start_detection(State(state): State<Arc<AppState>>) -> Result<Json<SessionResponse>, ApiError> {
    let service = state.service.clone();
    tokio::task::spawn_blocking(move || service.start())
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))??;

    Ok(Json(SessionResponse { status: "started" }))
}

/// Stop the session and release the camera
pub async fn stop_detection(State(state): State<Arc<AppState>>) -> Result<Json<SessionResponse>, ApiError> {
    let service = state.service.clone();
    tokio::task::spawn_blocking(move || service.stop())
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(SessionResponse { status: "stopped" }))
}
