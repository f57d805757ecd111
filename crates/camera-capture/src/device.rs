//! Capture device traits

use crate::{CameraConfig, CameraError, VideoFrame};

/// An open capture device handle.
///
/// Dropping the handle releases the underlying device.
pub trait CameraDevice: Send {
    /// Read the next frame. Blocks for at most the configured read timeout.
    fn read_frame(&mut self) -> Result<VideoFrame, CameraError>;
}

/// Opens capture devices
pub trait CameraBackend: Send + Sync {
    /// Open the device described by `config`
    fn open(&self, config: &CameraConfig) -> Result<Box<dyn CameraDevice>, CameraError>;

    /// Human readable backend name for logs
    fn name(&self) -> &'static str;
}

/// Backend used when the binary was built without any capture support.
/// Every open attempt fails with `CameraError::Unavailable`.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableBackend;

impl CameraBackend for UnavailableBackend {
    fn open(&self, config: &CameraConfig) -> Result<Box<dyn CameraDevice>, CameraError> {
        Err(CameraError::Unavailable(format!(
            "{}: no capture backend compiled in (enable the `v4l` feature)",
            config.device
        )))
    }

    fn name(&self) -> &'static str {
        "unavailable"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_backend_refuses_open() {
        let result = UnavailableBackend.open(&CameraConfig::default());
        match result {
            Err(CameraError::Unavailable(msg)) => assert!(msg.contains("/dev/video0")),
            _ => panic!("expected Unavailable"),
        }
    }
}
