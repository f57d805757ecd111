//! Camera Capture Library for Eye Fatigue Monitoring
//!
//! Provides the capture device abstraction used by the detection pipeline:
//! - RGB video frames with MJPEG/YUYV decoding
//! - `CameraBackend` / `CameraDevice` traits for opening and reading a webcam
//! - V4L2 backend for Linux webcams (`v4l` feature)

pub mod device;
pub mod frame;
#[cfg(feature = "v4l")]
pub mod v4l2;

pub use device::{CameraBackend, CameraDevice, UnavailableBackend};
pub use frame::{PixelFormat, VideoFrame};
#[cfg(feature = "v4l")]
pub use v4l2::{V4lBackend, V4lCamera};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Camera error types
#[derive(Error, Debug)]
pub enum CameraError {
    #[error("Camera unavailable: {0}")]
    Unavailable(String),

    #[error("Frame read failed: {0}")]
    Read(String),

    #[error("Invalid format: {0}")]
    Format(String),

    #[error("Frame decode failed: {0}")]
    Decode(String),

    #[error("Camera not initialized")]
    NotInitialized,
}

/// Camera configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Device path (e.g., "/dev/video0")
    pub device: String,
    /// Capture width
    pub width: u32,
    /// Capture height
    pub height: u32,
    /// Target FPS
    pub fps: u32,
    /// Number of driver buffers to queue
    pub buffer_count: u32,
    /// Upper bound for a single blocking frame read (milliseconds)
    pub read_timeout_ms: u64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device: "/dev/video0".to_string(),
            width: 640,
            height: 480,
            fps: 30,
            buffer_count: 4,
            read_timeout_ms: 2000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CameraConfig::default();
        assert_eq!(config.device, "/dev/video0");
        assert_eq!((config.width, config.height), (640, 480));
        assert_eq!(config.fps, 30);
    }

    #[test]
    fn test_config_partial_deserialize() {
        let config: CameraConfig =
            serde_json::from_str(r#"{"device": "/dev/video2", "fps": 15}"#).unwrap();
        assert_eq!(config.device, "/dev/video2");
        assert_eq!(config.fps, 15);
        assert_eq!(config.width, 640);
    }
}
