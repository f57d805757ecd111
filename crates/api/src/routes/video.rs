//! Video Routes

use axum::{
    body::Body,
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};
use detection::MULTIPART_CONTENT_TYPE;
use std::convert::Infallible;
use std::sync::Arc;
use tokio_stream::{wrappers::ReceiverStream, StreamExt};
use tracing::info;

use crate::{ApiError, AppState};

/// Annotated MJPEG stream of the current session.
///
/// Waits for a start when the session is idle; ends when it is stopped.
pub async fn video_feed(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let rx = state.service.spawn_stream()?;
    info!("Video feed client connected");
    metrics::counter!("fatigue_stream_clients_total").increment(1);

    let body = ReceiverStream::new(rx).map(|frame| Ok::<_, Infallible>(frame.multipart_chunk()));

    Ok((
        [
            (header::CONTENT_TYPE, MULTIPART_CONTENT_TYPE),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        Body::from_stream(body),
    )
        .into_response())
}

/// Latest annotated frame as a JPEG
pub async fn snapshot(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let service = state.service.clone();
    let frame = tokio::task::spawn_blocking(move || service.snapshot())
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .ok_or(ApiError::NoFrame)?;
    Ok(([(header::CONTENT_TYPE, "image/jpeg")], frame.jpeg).into_response())
}
