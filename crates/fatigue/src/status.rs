//! Fatigue status evaluation

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::blink::BlinkSession;
use crate::classifier::{BlinkFeatures, FatigueClassifier};
use crate::DetectionConfig;

/// Why the user is considered fatigued
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cause", rename_all = "snake_case")]
pub enum FatigueCause {
    /// No face seen for longer than the absence timeout
    EyesAbsent,
    /// Blink pattern classified as fatigued
    BlinkPattern { probability: f64 },
}

/// Fatigue status
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum FatigueStatus {
    #[default]
    Normal,
    Fatigued(FatigueCause),
}

impl FatigueStatus {
    pub fn is_fatigued(&self) -> bool {
        matches!(self, FatigueStatus::Fatigued(_))
    }
}

impl fmt::Display for FatigueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FatigueStatus::Normal => write!(f, "Normal"),
            FatigueStatus::Fatigued(FatigueCause::EyesAbsent) => {
                write!(f, "Fatigue Detected (Eyes Closed!)")
            }
            FatigueStatus::Fatigued(FatigueCause::BlinkPattern { probability }) => {
                write!(f, "Fatigue Detected (Prob: {:.2})", probability)
            }
        }
    }
}

/// Recommendation shown alongside the status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    StartDetection,
    TakeLongBreak,
    TakeShortBreak,
    KeepItUp,
}

impl Recommendation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Recommendation::StartDetection => {
                "Recommendation: Start detection to monitor eye fatigue."
            }
            Recommendation::TakeLongBreak => {
                "Recommendation: Take a 5-minute break and rest your eyes."
            }
            Recommendation::TakeShortBreak => {
                "Recommendation: Consider taking a short break to reduce eye strain."
            }
            Recommendation::KeepItUp => "Recommendation: Keep up good eye health habits!",
        }
    }
}

/// Point-in-time fatigue assessment
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FatigueReport {
    pub status: FatigueStatus,
    pub recommendation: Recommendation,
    /// Classifier output, when the classifier was consulted
    pub probability: Option<f64>,
    /// Blinks per minute, when at least one frame was processed
    pub blink_rate: Option<f64>,
    pub avg_blink_duration_ms: f64,
    pub blink_count: u32,
}

impl FatigueReport {
    pub fn status_text(&self) -> String {
        self.status.to_string()
    }

    pub fn recommendation_text(&self) -> &'static str {
        self.recommendation.as_str()
    }
}

/// Combines the eyes-absent timeout with the blink-pattern classifier
#[derive(Debug, Clone)]
pub struct FatigueEngine {
    classifier: FatigueClassifier,
    nominal_fps: f64,
    probability_threshold: f64,
    absent_timeout: Duration,
    min_frames: u64,
}

impl FatigueEngine {
    pub fn new(config: &DetectionConfig, classifier: FatigueClassifier) -> Self {
        Self {
            classifier,
            nominal_fps: config.nominal_fps,
            probability_threshold: config.fatigue_probability_threshold,
            absent_timeout: config.eyes_absent_timeout(),
            min_frames: config.min_frames_for_classifier.max(1),
        }
    }

    /// Evaluate the session. `since_face` is the time elapsed since the
    /// last frame in which a face was detected.
    pub fn evaluate(&self, session: &BlinkSession, since_face: Duration) -> FatigueReport {
        let avg_blink_duration_ms = session.avg_blink_duration_ms();
        let blink_rate = session.blink_rate(self.nominal_fps);
        let mut report = FatigueReport {
            status: FatigueStatus::Normal,
            recommendation: Recommendation::StartDetection,
            probability: None,
            blink_rate,
            avg_blink_duration_ms,
            blink_count: session.blink_count,
        };

        let Some(rate) = blink_rate.filter(|_| session.frame_counter >= self.min_frames) else {
            return report;
        };

        let probability = self.classifier.fatigue_probability(&BlinkFeatures {
            blink_rate: rate,
            avg_blink_duration_ms,
        });
        report.probability = Some(probability);

        if since_face > self.absent_timeout {
            report.status = FatigueStatus::Fatigued(FatigueCause::EyesAbsent);
            report.recommendation = Recommendation::TakeLongBreak;
        } else if probability > self.probability_threshold {
            report.status = FatigueStatus::Fatigued(FatigueCause::BlinkPattern { probability });
            report.recommendation = Recommendation::TakeShortBreak;
        } else {
            report.recommendation = Recommendation::KeepItUp;
        }
        report
    }
}
