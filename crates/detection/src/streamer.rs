//! Pull-based annotated frame streamer

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::{BufMut, Bytes, BytesMut};
use camera_capture::CameraError;
use fatigue::{LandmarkProvider, LandmarkSet};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::overlay::Overlay;
use crate::service::SessionState;
use crate::DetectionError;

pub const MULTIPART_BOUNDARY: &str = "frame";
pub const MULTIPART_CONTENT_TYPE: &str = "multipart/x-mixed-replace; boundary=frame";

/// Stream configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Poll interval while waiting for the session to become active
    pub idle_poll_ms: u64,
    /// Encoded frames buffered per HTTP stream
    pub channel_capacity: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            idle_poll_ms: 100,
            channel_capacity: 4,
        }
    }
}

/// Annotated JPEG frame
#[derive(Debug, Clone)]
pub struct EncodedFrame {
    pub jpeg: Bytes,
    pub sequence: u32,
    pub timestamp_ns: u64,
}

impl EncodedFrame {
    /// One part of a `multipart/x-mixed-replace` body
    pub fn multipart_chunk(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.jpeg.len() + 64);
        buf.put_slice(b"--");
        buf.put_slice(MULTIPART_BOUNDARY.as_bytes());
        buf.put_slice(b"\r\nContent-Type: image/jpeg\r\n\r\n");
        buf.put_slice(&self.jpeg);
        buf.put_slice(b"\r\n");
        buf.freeze()
    }
}

type DetachProbe = Box<dyn Fn() -> bool + Send>;

/// Iterator over annotated frames of the shared camera session.
///
/// Ends on shutdown, on detach, on a read failure, when the session is
/// stopped after frames were served, or when the session was restarted.
/// Corrupt frames are dropped. Several streams may share one session;
/// the monitor sees their frames in capture order and a frame overtaken
/// by a later capture is skipped.
pub struct FrameStreamer {
    state: Arc<Mutex<SessionState>>,
    landmarks: Arc<dyn LandmarkProvider>,
    overlay: Arc<Overlay>,
    shutdown: Arc<AtomicBool>,
    idle_poll: Duration,
    generation: Option<u64>,
    detached: Option<DetachProbe>,
    finished: bool,
}

impl FrameStreamer {
    pub(crate) fn new(
        state: Arc<Mutex<SessionState>>,
        landmarks: Arc<dyn LandmarkProvider>,
        overlay: Arc<Overlay>,
        shutdown: Arc<AtomicBool>,
        idle_poll: Duration,
    ) -> Self {
        Self {
            state,
            landmarks,
            overlay,
            shutdown,
            idle_poll,
            generation: None,
            detached: None,
            finished: false,
        }
    }

    /// End the stream once `probe` returns true
    pub fn detach_when<F>(mut self, probe: F) -> Self
    where
        F: Fn() -> bool + Send + 'static,
    {
        self.detached = Some(Box::new(probe));
        self
    }

    /// Drive the stream on a dedicated thread, forwarding frames over a
    /// bounded channel. The thread exits once the receiver is dropped.
    pub fn spawn(self, capacity: usize) -> Result<mpsc::Receiver<EncodedFrame>, DetectionError> {
        let (tx, rx) = mpsc::channel::<EncodedFrame>(capacity.max(1));
        let probe = tx.clone();
        let streamer = self.detach_when(move || probe.is_closed());

        std::thread::Builder::new()
            .name("frame-streamer".into())
            .spawn(move || {
                for frame in streamer {
                    if tx.blocking_send(frame).is_err() {
                        break;
                    }
                }
                debug!("Frame stream closed");
            })?;

        Ok(rx)
    }

    fn cancelled(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst) || self.detached.as_ref().is_some_and(|probe| probe())
    }

    fn finish(&mut self) -> Option<EncodedFrame> {
        self.finished = true;
        None
    }
}

impl Iterator for FrameStreamer {
    type Item = EncodedFrame;

    fn next(&mut self) -> Option<EncodedFrame> {
        if self.finished {
            return None;
        }

        loop {
            if self.cancelled() {
                debug!("Frame stream cancelled");
                return self.finish();
            }

            let shared = self.state.clone();
            let (frame, generation, ticket) = {
                let mut state = shared.lock();
                if !state.camera.is_active() {
                    if self.generation.is_some() {
                        debug!("Session stopped, ending stream");
                        return self.finish();
                    }
                    drop(state);
                    std::thread::sleep(self.idle_poll);
                    continue;
                }

                let current = state.camera.generation();
                if self.generation.is_some_and(|g| g != current) {
                    info!("Session restarted, ending stale stream");
                    return self.finish();
                }

                match state.camera.read_frame() {
                    Ok(frame) => (frame, current, state.next_ticket()),
                    Err(CameraError::Decode(e)) => {
                        drop(state);
                        warn!("Dropping corrupt frame: {}", e);
                        metrics::counter!("fatigue_frames_dropped_total").increment(1);
                        continue;
                    }
                    Err(e) => {
                        warn!("Frame read failed, ending stream: {}", e);
                        metrics::counter!("fatigue_stream_read_failures_total").increment(1);
                        return self.finish();
                    }
                }
            };
            self.generation = Some(generation);

            if !frame.is_well_formed() {
                warn!(
                    "Dropping frame {}: {} bytes for {}x{}",
                    frame.sequence,
                    frame.data.len(),
                    frame.width,
                    frame.height
                );
                metrics::counter!("fatigue_frames_dropped_total").increment(1);
                continue;
            }

            let points = match self.landmarks.detect(&frame) {
                Ok(points) => points,
                Err(e) => {
                    debug!("Landmark detection failed: {}", e);
                    None
                }
            };
            let landmarks = points.map(|p| LandmarkSet::from_normalized(&p, frame.width, frame.height));

            let committed = shared
                .lock()
                .commit(generation, ticket, landmarks.as_ref(), Instant::now());
            let Some(analysis) = committed else {
                debug!("Frame {} overtaken or session changed, skipping", frame.sequence);
                continue;
            };

            metrics::counter!("fatigue_frames_processed_total").increment(1);
            if !analysis.face_detected() {
                metrics::counter!("fatigue_frames_without_face_total").increment(1);
            }
            if analysis.blink.is_some() {
                metrics::counter!("fatigue_blinks_total").increment(1);
            }

            let encoded = match self.overlay.render(frame, &analysis) {
                Ok(encoded) => encoded,
                Err(e) => {
                    warn!("Skipping frame: {}", e);
                    continue;
                }
            };

            let mut state = shared.lock();
            if state.camera.generation() == generation {
                state.latest = Some(encoded.clone());
            }
            return Some(encoded);
        }
    }
}
