//! Detection Session Service
//!
//! Glues the capture device to the fatigue pipeline:
//! - Camera session lifecycle (start / stop, one device handle)
//! - Pull-based frame streamer with shutdown and detach signals
//! - Read-only diagnostic overlay and JPEG encoding
//! - Point-in-time fatigue status

pub mod camera;
pub mod overlay;
pub mod service;
pub mod streamer;

#[cfg(test)]
pub(crate) mod testing;

pub use camera::CameraSession;
pub use overlay::{Overlay, OverlayConfig};
pub use service::{DetectionService, DetectionSettings, DetectionStatus};
pub use streamer::{EncodedFrame, FrameStreamer, StreamConfig, MULTIPART_BOUNDARY, MULTIPART_CONTENT_TYPE};

use camera_capture::CameraError;
use fatigue::FatigueError;
use thiserror::Error;

/// Detection service error types
#[derive(Error, Debug)]
pub enum DetectionError {
    #[error("Device unavailable: {0}")]
    DeviceUnavailable(#[source] CameraError),

    #[error("Analysis setup failed: {0}")]
    Analysis(#[from] FatigueError),

    #[error("Overlay failed: {0}")]
    Overlay(String),

    #[error("Stream thread failed to start: {0}")]
    Spawn(#[from] std::io::Error),
}
