//! Camera session lifecycle

use std::sync::Arc;

use camera_capture::{CameraBackend, CameraConfig, CameraDevice, CameraError, VideoFrame};
use tracing::{debug, info};

/// Owns the capture device handle and the active flag.
///
/// `active` implies an open handle; at most one handle is open at a time.
pub struct CameraSession {
    backend: Arc<dyn CameraBackend>,
    config: CameraConfig,
    device: Option<Box<dyn CameraDevice>>,
    active: bool,
    generation: u64,
}

impl CameraSession {
    pub fn new(backend: Arc<dyn CameraBackend>, config: CameraConfig) -> Self {
        Self {
            backend,
            config,
            device: None,
            active: false,
            generation: 0,
        }
    }

    /// Open the device if needed and mark the session active.
    /// Returns `true` if this call activated the session.
    pub fn start(&mut self) -> Result<bool, CameraError> {
        if self.device.is_none() {
            info!("Opening camera {} ({} backend)", self.config.device, self.backend.name());
            self.device = Some(self.backend.open(&self.config)?);
        }

        if self.active {
            debug!("Camera already active");
            return Ok(false);
        }
        self.active = true;
        self.generation += 1;
        Ok(true)
    }

    /// Deactivate and release the device handle.
    /// Returns `true` if the session was active.
    pub fn stop(&mut self) -> bool {
        let was_active = self.active;
        self.active = false;
        if self.device.take().is_some() {
            info!("Camera {} released", self.config.device);
        }
        was_active
    }

    /// Blocking read of the next frame
    pub fn read_frame(&mut self) -> Result<VideoFrame, CameraError> {
        self.device
            .as_mut()
            .ok_or(CameraError::NotInitialized)?
            .read_frame()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn has_device(&self) -> bool {
        self.device.is_some()
    }

    /// Number of times the session went from inactive to active
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeBackend;

    #[test]
    fn test_start_is_idempotent() {
        let backend = FakeBackend::new();
        let mut session = CameraSession::new(backend.clone(), CameraConfig::default());

        assert!(session.start().unwrap());
        assert!(!session.start().unwrap());

        assert!(session.is_active());
        assert!(session.has_device());
        assert_eq!(backend.opens(), 1);
        assert_eq!(backend.open_handles(), 1);
        assert_eq!(session.generation(), 1);
    }

    #[test]
    fn test_stop_is_idempotent() {
        let backend = FakeBackend::new();
        let mut session = CameraSession::new(backend.clone(), CameraConfig::default());

        assert!(!session.stop());
        session.start().unwrap();
        assert!(session.stop());
        assert!(!session.stop());

        assert!(!session.is_active());
        assert!(!session.has_device());
        assert_eq!(backend.open_handles(), 0);
    }

    #[test]
    fn test_open_failure_leaves_session_inactive() {
        let backend = FakeBackend::unavailable();
        let mut session = CameraSession::new(backend.clone(), CameraConfig::default());

        assert!(matches!(session.start(), Err(CameraError::Unavailable(_))));
        assert!(!session.is_active());
        assert!(!session.has_device());
        assert_eq!(session.generation(), 0);
    }

    #[test]
    fn test_restart_reopens_and_bumps_generation() {
        let backend = FakeBackend::new();
        let mut session = CameraSession::new(backend.clone(), CameraConfig::default());

        session.start().unwrap();
        session.stop();
        session.start().unwrap();

        assert_eq!(backend.opens(), 2);
        assert_eq!(backend.open_handles(), 1);
        assert_eq!(session.generation(), 2);
    }

    #[test]
    fn test_read_without_device() {
        let mut session = CameraSession::new(FakeBackend::new(), CameraConfig::default());
        assert!(matches!(session.read_frame(), Err(CameraError::NotInitialized)));
    }
}
