//! Eye Fatigue Monitor API Server
//!
//! HTTP façade over the detection service: session control, MJPEG video
//! feed, fatigue status, snapshots, health and Prometheus metrics.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use detection::{DetectionError, DetectionService};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tower_governor::GovernorLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

pub mod config;
pub mod rate_limit;
mod routes;

pub use config::{AppConfig, LogConfig, ServerConfig};
pub use rate_limit::RateLimitConfig;
pub use routes::status::{HealthResponse, StatusResponse};

/// API error types
#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Detection(#[from] DetectionError),

    #[error("No frame available yet")]
    NoFrame,

    #[error("Metrics exporter not installed")]
    MetricsDisabled,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::NoFrame | ApiError::MetricsDisabled => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Application state shared across handlers
pub struct AppState {
    pub service: DetectionService,
    pub version: String,
    pub start_time: std::time::Instant,
    /// Port advertised by the banner route
    pub port: u16,
    pub landmarks_enabled: bool,
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(service: DetectionService, port: u16) -> Self {
        Self {
            service,
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: std::time::Instant::now(),
            port,
            landmarks_enabled: true,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    pub fn with_landmarks_enabled(mut self, enabled: bool) -> Self {
        self.landmarks_enabled = enabled;
        self
    }
}

/// Create the application router
pub fn create_router(state: Arc<AppState>, rate_limit: &RateLimitConfig) -> Result<Router, ApiError> {
    let governor = rate_limit::create_governor_config(rate_limit)?;

    let control = Router::new()
        .route("/start_detection", post(routes::detection::start_detection))
        .route("/stop_detection", post(routes::detection::stop_detection))
        .layer(GovernorLayer { config: governor });

    Ok(Router::new()
        .route("/", get(routes::status::index))
        .route("/health", get(routes::status::health))
        .route("/status", get(routes::status::get_status))
        .route("/metrics", get(routes::status::metrics))
        .route("/video_feed", get(routes::video::video_feed))
        .route("/snapshot", get(routes::video::snapshot))
        .merge(control)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

/// Initialize logging; `RUST_LOG` overrides the configured level
pub fn init_logging(config: &LogConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);

    if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    }
}

/// Serve until Ctrl-C, then end all streams and release the camera
pub async fn run_server(config: &AppConfig, state: Arc<AppState>) -> Result<(), ApiError> {
    let service = state.service.clone();
    let app = create_router(state, &config.rate_limit)?;

    info!("Starting API server on {}", config.server.bind);
    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal(service))
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal(service: DetectionService) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Ctrl-C received, shutting down");
    if let Err(e) = tokio::task::spawn_blocking(move || service.shutdown()).await {
        warn!("Detection shutdown task failed: {}", e);
    }
}
