//! Fatigue detection configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::classifier::CalibrationSet;
use crate::FatigueError;

/// MediaPipe face mesh indices for the left eye contour (p1..p6)
pub const LEFT_EYE: [usize; 6] = [33, 160, 158, 133, 153, 144];

/// MediaPipe face mesh indices for the right eye contour (p1..p6)
pub const RIGHT_EYE: [usize; 6] = [263, 387, 385, 362, 380, 373];

/// Fatigue detection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Average EAR below which the eyes count as closed
    pub ear_threshold: f64,

    /// Minimum consecutive closed frames for a blink
    pub consec_frames: u32,

    /// Frame rate assumed when converting frame counts to time.
    /// Not measured from the camera.
    pub nominal_fps: f64,

    /// Classifier probability above which the user is reported fatigued
    pub fatigue_probability_threshold: f64,

    /// No face for longer than this reports fatigue (milliseconds)
    pub eyes_absent_timeout_ms: u64,

    /// Frames required before the blink classifier is consulted
    pub min_frames_for_classifier: u64,

    /// Landmark indices of the left eye contour
    pub left_eye: [usize; 6],

    /// Landmark indices of the right eye contour
    pub right_eye: [usize; 6],

    /// Exemplars the classifier is fitted on
    pub calibration: CalibrationSet,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            ear_threshold: 0.22,
            consec_frames: 3,
            nominal_fps: 30.0,
            fatigue_probability_threshold: 0.3,
            eyes_absent_timeout_ms: 5000,
            min_frames_for_classifier: 1,
            left_eye: LEFT_EYE,
            right_eye: RIGHT_EYE,
            calibration: CalibrationSet::default(),
        }
    }
}

impl DetectionConfig {
    /// Duration of one frame at the nominal frame rate (milliseconds)
    pub fn frame_duration_ms(&self) -> f64 {
        1000.0 / self.nominal_fps
    }

    /// Eyes-absent timeout as a `Duration`
    pub fn eyes_absent_timeout(&self) -> Duration {
        Duration::from_millis(self.eyes_absent_timeout_ms)
    }

    /// Reject values the blink rate and classifier cannot work with
    pub fn validate(&self) -> Result<(), FatigueError> {
        if !self.nominal_fps.is_finite() || self.nominal_fps <= 0.0 {
            return Err(FatigueError::Config(format!(
                "nominal_fps must be positive, got {}",
                self.nominal_fps
            )));
        }
        let p = self.fatigue_probability_threshold;
        if !(p > 0.0 && p < 1.0) {
            return Err(FatigueError::Config(format!(
                "fatigue_probability_threshold must lie in (0, 1), got {}",
                p
            )));
        }
        if !self.ear_threshold.is_finite() || self.ear_threshold <= 0.0 {
            return Err(FatigueError::Config(format!(
                "ear_threshold must be positive, got {}",
                self.ear_threshold
            )));
        }
        if self.consec_frames == 0 {
            return Err(FatigueError::Config("consec_frames must be at least 1".into()));
        }
        Ok(())
    }
}
