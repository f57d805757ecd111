//! Fake camera and landmark providers for unit tests

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use camera_capture::{CameraBackend, CameraConfig, CameraDevice, CameraError, VideoFrame};
use fatigue::config::{LEFT_EYE, RIGHT_EYE};
use fatigue::{FatigueError, LandmarkProvider, Point};
use parking_lot::Mutex;

pub const FRAME_SIZE: u32 = 40;

/// Backend handing out synthetic devices, counting opens and live handles
pub struct FakeBackend {
    opens: AtomicUsize,
    live: Arc<AtomicUsize>,
    available: bool,
    frames_before_failure: Option<usize>,
    corrupt_read: Option<u32>,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Self::build(true, None, None)
    }

    pub fn unavailable() -> Arc<Self> {
        Self::build(false, None, None)
    }

    /// Devices fail their read after `frames` successful frames
    pub fn failing_after(frames: usize) -> Arc<Self> {
        Self::build(true, Some(frames), None)
    }

    /// Devices return one undecodable buffer on their `read`-th read
    pub fn corrupt_on(read: u32) -> Arc<Self> {
        Self::build(true, None, Some(read))
    }

    fn build(available: bool, frames_before_failure: Option<usize>, corrupt_read: Option<u32>) -> Arc<Self> {
        Arc::new(Self {
            opens: AtomicUsize::new(0),
            live: Arc::new(AtomicUsize::new(0)),
            available,
            frames_before_failure,
            corrupt_read,
        })
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn open_handles(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

impl CameraBackend for FakeBackend {
    fn open(&self, config: &CameraConfig) -> Result<Box<dyn CameraDevice>, CameraError> {
        if !self.available {
            return Err(CameraError::Unavailable(config.device.clone()));
        }
        self.opens.fetch_add(1, Ordering::SeqCst);
        self.live.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeDevice {
            live: self.live.clone(),
            remaining: self.frames_before_failure,
            corrupt_read: self.corrupt_read,
            reads: 0,
            sequence: 0,
        }))
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

struct FakeDevice {
    live: Arc<AtomicUsize>,
    remaining: Option<usize>,
    corrupt_read: Option<u32>,
    reads: u32,
    sequence: u32,
}

impl CameraDevice for FakeDevice {
    fn read_frame(&mut self) -> Result<VideoFrame, CameraError> {
        self.reads += 1;
        if self.corrupt_read == Some(self.reads) {
            return Err(CameraError::Decode("truncated MJPEG".into()));
        }
        match self.remaining.as_mut() {
            Some(0) => return Err(CameraError::Read("device unplugged".into())),
            Some(n) => *n -= 1,
            None => {}
        }
        self.sequence += 1;
        Ok(VideoFrame::filled(FRAME_SIZE, FRAME_SIZE, [90, 90, 90], self.sequence))
    }
}

impl Drop for FakeDevice {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Landmark provider replaying a script of per-frame EAR values
/// (`None` = no face). Repeats `fallback` once the script runs out.
pub struct ScriptedLandmarks {
    script: Mutex<VecDeque<Option<f64>>>,
    fallback: Option<f64>,
}

impl ScriptedLandmarks {
    pub fn new(script: Vec<Option<f64>>, fallback: Option<f64>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            fallback,
        })
    }

    pub fn open_eyes() -> Arc<Self> {
        Self::new(Vec::new(), Some(0.3))
    }
}

impl LandmarkProvider for ScriptedLandmarks {
    fn detect(&self, _frame: &VideoFrame) -> Result<Option<Vec<Point>>, FatigueError> {
        let next = self.script.lock().pop_front().unwrap_or(self.fallback);
        Ok(next.map(face_with_ear))
    }
}

/// Normalized face mesh whose eyes both have the given EAR
pub fn face_with_ear(ear: f64) -> Vec<Point> {
    let mut points = vec![Point::new(0.5, 0.5); 468];
    let width = 0.2;
    let h = ear * width / 2.0;
    for (indices, x0) in [(LEFT_EYE, 0.2), (RIGHT_EYE, 0.6)] {
        let contour = [
            Point::new(x0, 0.4),
            Point::new(x0 + width / 4.0, 0.4 - h),
            Point::new(x0 + 3.0 * width / 4.0, 0.4 - h),
            Point::new(x0 + width, 0.4),
            Point::new(x0 + 3.0 * width / 4.0, 0.4 + h),
            Point::new(x0 + width / 4.0, 0.4 + h),
        ];
        for (idx, p) in indices.iter().zip(contour) {
            points[*idx] = p;
        }
    }
    points
}
