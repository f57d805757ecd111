//! Status, Health and Metrics Routes

use axum::{extract::State, http::header, response::IntoResponse, Json};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

use crate::{ApiError, AppState};

/// Response for the status endpoint
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub fatigue_status: String,
    pub recommendation: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fatigue_probability: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blink_rate: Option<f64>,
    pub blink_count: u32,
    pub camera_active: bool,
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: u64,
    pub version: String,
    pub uptime_seconds: u64,
    pub components: ComponentStatus,
}

/// Component status
#[derive(Debug, Serialize)]
pub struct ComponentStatus {
    pub camera: ComponentHealth,
    pub landmarks: ComponentHealth,
}

/// Individual component health
#[derive(Debug, Serialize)]
pub struct ComponentHealth {
    pub status: String,
}

/// Service banner
pub async fn index(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "Eye fatigue detection API running!",
        "port": state.port,
    }))
}

/// Current fatigue status; never mutates the session.
/// The session lock is taken off the async workers since a stream holds it
/// across camera reads.
pub async fn get_status(State(state): State<Arc<AppState>>) -> Result<Json<StatusResponse>, ApiError> {
    let service = state.service.clone();
    let status = tokio::task::spawn_blocking(move || service.status())
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    let report = status.report;

    Ok(Json(StatusResponse {
        fatigue_status: report.status_text(),
        recommendation: report.recommendation_text(),
        fatigue_probability: report.probability,
        blink_rate: report.blink_rate,
        blink_count: report.blink_count,
        camera_active: status.camera_active,
    }))
}

/// Health check handler
pub async fn health(State(state): State<Arc<AppState>>) -> Result<Json<HealthResponse>, ApiError> {
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    let service = state.service.clone();
    let active = tokio::task::spawn_blocking(move || service.is_active())
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    let camera = if active { "active" } else { "idle" };
    let landmarks = if state.landmarks_enabled { "ok" } else { "disabled" };
    let overall = if state.landmarks_enabled { "healthy" } else { "degraded" };

    Ok(Json(HealthResponse {
        status: overall.to_string(),
        timestamp,
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        components: ComponentStatus {
            camera: ComponentHealth {
                status: camera.to_string(),
            },
            landmarks: ComponentHealth {
                status: landmarks.to_string(),
            },
        },
    }))
}

/// Prometheus text exposition
pub async fn metrics(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let handle = state.metrics.as_ref().ok_or(ApiError::MetricsDisabled)?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        handle.render(),
    ))
}
