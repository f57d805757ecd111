//! Detection session service

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use camera_capture::{CameraBackend, CameraConfig};
use fatigue::{
    DetectionConfig, FatigueMonitor, FatigueReport, FrameAnalysis, LandmarkProvider, LandmarkSet,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::camera::CameraSession;
use crate::overlay::{Overlay, OverlayConfig};
use crate::streamer::{EncodedFrame, FrameStreamer, StreamConfig};
use crate::DetectionError;

/// State guarded by the session lock
pub(crate) struct SessionState {
    pub(crate) camera: CameraSession,
    pub(crate) monitor: FatigueMonitor,
    pub(crate) latest: Option<EncodedFrame>,
    /// Set while stopped; freezes the eyes-absent clock
    pub(crate) stopped_at: Option<Instant>,
    /// Capture ticket of the last frame read from the camera
    reads: u64,
    /// Capture ticket of the last frame fed to the monitor
    committed: u64,
}

impl SessionState {
    /// Ticket ordering the frame just read among all streams
    pub(crate) fn next_ticket(&mut self) -> u64 {
        self.reads += 1;
        self.reads
    }

    /// Feed one frame's landmarks to the monitor in capture order.
    /// Returns `None` for frames of an earlier session, frames read before
    /// a stop, and frames overtaken by a later capture.
    pub(crate) fn commit(
        &mut self,
        generation: u64,
        ticket: u64,
        landmarks: Option<&LandmarkSet>,
        now: Instant,
    ) -> Option<FrameAnalysis> {
        let current = self.camera.is_active() && self.camera.generation() == generation;
        if !current || ticket <= self.committed {
            return None;
        }
        self.committed = ticket;
        Some(self.monitor.observe(landmarks, now))
    }
}

/// Detection service settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionSettings {
    pub camera: CameraConfig,
    pub detection: DetectionConfig,
    pub overlay: OverlayConfig,
    pub stream: StreamConfig,
}

/// Point-in-time service status
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DetectionStatus {
    pub report: FatigueReport,
    pub camera_active: bool,
}

/// Shared handle over one camera session and its fatigue monitor
#[derive(Clone)]
pub struct DetectionService {
    state: Arc<Mutex<SessionState>>,
    landmarks: Arc<dyn LandmarkProvider>,
    overlay: Arc<Overlay>,
    shutdown: Arc<AtomicBool>,
    stream: StreamConfig,
}

impl DetectionService {
    pub fn new(
        settings: DetectionSettings,
        backend: Arc<dyn CameraBackend>,
        landmarks: Arc<dyn LandmarkProvider>,
    ) -> Result<Self, DetectionError> {
        let now = Instant::now();
        let monitor = FatigueMonitor::new(settings.detection, now)?;
        let overlay = Overlay::new(settings.overlay)?;
        info!("Detection service using {} camera backend", backend.name());

        Ok(Self {
            state: Arc::new(Mutex::new(SessionState {
                camera: CameraSession::new(backend, settings.camera),
                monitor,
                latest: None,
                stopped_at: Some(now),
                reads: 0,
                committed: 0,
            })),
            landmarks,
            overlay: Arc::new(overlay),
            shutdown: Arc::new(AtomicBool::new(false)),
            stream: settings.stream,
        })
    }

    /// Open the camera and activate the session. Activation starts a fresh
    /// detection session; calling this while active is a no-op.
    pub fn start(&self) -> Result<bool, DetectionError> {
        let mut state = self.state.lock();
        let activated = state.camera.start().map_err(|e| {
            warn!("Camera start failed: {}", e);
            DetectionError::DeviceUnavailable(e)
        })?;

        if activated {
            let now = Instant::now();
            state.monitor.reset(now);
            state.latest = None;
            state.stopped_at = None;
            metrics::gauge!("fatigue_camera_active").set(1.0);
            info!("Detection started (session {})", state.camera.generation());
        }
        Ok(activated)
    }

    /// Deactivate and release the camera. Idempotent.
    pub fn stop(&self) -> bool {
        let mut state = self.state.lock();
        let was_active = state.camera.stop();
        if was_active {
            state.stopped_at = Some(Instant::now());
            metrics::gauge!("fatigue_camera_active").set(0.0);
            info!(
                "Detection stopped after {} frames, {} blinks",
                state.monitor.session().frame_counter,
                state.monitor.session().blink_count
            );
        }
        was_active
    }

    pub fn status(&self) -> DetectionStatus {
        self.status_at(Instant::now())
    }

    pub(crate) fn status_at(&self, now: Instant) -> DetectionStatus {
        let state = self.state.lock();
        let at = state.stopped_at.unwrap_or(now);
        DetectionStatus {
            report: state.monitor.report(at),
            camera_active: state.camera.is_active(),
        }
    }

    /// New stream over the shared session
    pub fn stream(&self) -> FrameStreamer {
        FrameStreamer::new(
            self.state.clone(),
            self.landmarks.clone(),
            self.overlay.clone(),
            self.shutdown.clone(),
            Duration::from_millis(self.stream.idle_poll_ms),
        )
    }

    /// Stream driven on its own thread with the configured channel capacity
    pub fn spawn_stream(&self) -> Result<tokio::sync::mpsc::Receiver<EncodedFrame>, DetectionError> {
        self.stream().spawn(self.stream.channel_capacity)
    }

    /// Most recent annotated frame of the current session
    pub fn snapshot(&self) -> Option<EncodedFrame> {
        self.state.lock().latest.clone()
    }

    pub fn is_active(&self) -> bool {
        self.state.lock().camera.is_active()
    }

    /// End all streams and release the camera
    pub fn shutdown(&self) {
        info!("Shutting down detection service");
        self.shutdown.store(true, Ordering::SeqCst);
        self.stop();
    }
}
