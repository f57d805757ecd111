//! Eye Fatigue Analysis
//!
//! Real-time user state analysis from facial landmarks:
//! - Eye aspect ratio (EAR) per frame
//! - Debounced blink detection
//! - Eyes-absent timeout
//! - Naive-Bayes fatigue classification over blink rate and duration

pub mod analysis;
pub mod blink;
pub mod classifier;
pub mod config;
pub mod ear;
pub mod facemesh;
pub mod landmarks;
pub mod status;

pub use analysis::FrameAnalysis;
pub use blink::{BlinkDetector, BlinkEvent, BlinkSession};
pub use classifier::{BlinkFeatures, CalibrationSample, CalibrationSet, FatigueClassifier, FatigueLabel};
pub use config::DetectionConfig;
pub use ear::{eye_aspect_ratio, EyeContours, EyeState};
pub use facemesh::{FaceMeshConfig, FaceMeshProvider};
pub use landmarks::{DisabledLandmarks, LandmarkProvider, LandmarkSet, Point};
pub use status::{FatigueCause, FatigueEngine, FatigueReport, FatigueStatus, Recommendation};

use std::time::Instant;

use thiserror::Error;
use tracing::{debug, info};

/// Fatigue analysis error types
#[derive(Error, Debug)]
pub enum FatigueError {
    #[error("Model loading failed: {0}")]
    ModelLoad(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Image processing failed: {0}")]
    ImageProcessing(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Per-session fatigue monitor: feeds frames through EAR, blink detection
/// and the fatigue engine.
pub struct FatigueMonitor {
    config: DetectionConfig,
    blinks: BlinkDetector,
    engine: FatigueEngine,
    last_face_seen: Instant,
}

impl FatigueMonitor {
    /// Create a monitor, fitting the classifier on the configured calibration set
    pub fn new(config: DetectionConfig, now: Instant) -> Result<Self, FatigueError> {
        config.validate()?;
        let classifier = FatigueClassifier::fit(&config.calibration)?;
        info!(
            "Fatigue monitor ready: ear_threshold={}, consec_frames={}, {} calibration samples",
            config.ear_threshold,
            config.consec_frames,
            config.calibration.samples.len()
        );
        Ok(Self {
            blinks: BlinkDetector::new(&config),
            engine: FatigueEngine::new(&config, classifier),
            last_face_seen: now,
            config,
        })
    }

    /// Analyze a single frame's landmarks (`None` when no face was found)
    pub fn observe(&mut self, landmarks: Option<&LandmarkSet>, now: Instant) -> FrameAnalysis {
        let contours = landmarks.and_then(|set| {
            let contours = EyeContours::extract(set, &self.config.left_eye, &self.config.right_eye);
            if contours.is_none() {
                debug!("Landmark set of {} points lacks eye contour indices", set.len());
            }
            contours
        });
        let eye_state = contours.map(|c| c.eye_state());

        if eye_state.is_some() {
            self.last_face_seen = now;
        }

        let blink = self.blinks.update(eye_state.map(|e| e.average_ear));
        if let Some(event) = blink {
            debug!(
                "Blink #{} detected ({:.0} ms)",
                self.blinks.session().blink_count,
                event.duration_ms
            );
        }

        FrameAnalysis {
            contours,
            eye_state,
            blink,
            report: self.report(now),
            frame_counter: self.blinks.session().frame_counter,
        }
    }

    /// Current fatigue assessment; does not mutate state
    pub fn report(&self, now: Instant) -> FatigueReport {
        let since_face = now.saturating_duration_since(self.last_face_seen);
        self.engine.evaluate(self.blinks.session(), since_face)
    }

    pub fn session(&self) -> &BlinkSession {
        self.blinks.session()
    }

    /// Reset counters and the eyes-absent clock (new detection session)
    pub fn reset(&mut self, now: Instant) {
        self.blinks.reset();
        self.last_face_seen = now;
    }
}
