//! Eye Fatigue Monitor - Main Entry Point

use std::sync::Arc;

use anyhow::Context;
use api::{init_logging, run_server, AppConfig, AppState};
use camera_capture::CameraBackend;
use detection::DetectionService;
use fatigue::{DisabledLandmarks, FaceMeshProvider, LandmarkProvider};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("Failed to load configuration")?;
    init_logging(&config.logging).map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!("=== Eye Fatigue Monitor v{} ===", env!("CARGO_PKG_VERSION"));

    let metrics = match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!("Prometheus exporter unavailable: {}", e);
            None
        }
    };

    let landmarks: Arc<dyn LandmarkProvider> = match config.landmarks.model_path {
        Some(_) => Arc::new(
            FaceMeshProvider::new(config.landmarks.clone()).context("Failed to load face mesh model")?,
        ),
        None => {
            warn!("No face mesh model configured; every frame will report no face");
            Arc::new(DisabledLandmarks)
        }
    };
    let landmarks_enabled = config.landmarks.model_path.is_some();

    let service = DetectionService::new(config.detection_settings(), camera_backend(), landmarks)
        .context("Failed to create detection service")?;

    let mut state = AppState::new(service, config.server.port().unwrap_or(5003))
        .with_landmarks_enabled(landmarks_enabled);
    if let Some(handle) = metrics {
        state = state.with_metrics(handle);
    }

    run_server(&config, Arc::new(state)).await?;
    Ok(())
}

#[cfg(feature = "v4l")]
fn camera_backend() -> Arc<dyn CameraBackend> {
    Arc::new(camera_capture::V4lBackend)
}

#[cfg(not(feature = "v4l"))]
fn camera_backend() -> Arc<dyn CameraBackend> {
    warn!("Built without the v4l feature; camera start will fail");
    Arc::new(camera_capture::UnavailableBackend)
}
