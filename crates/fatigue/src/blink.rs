//! Blink event detection
//!
//! A closed run of at least `consec_frames` frames below the EAR threshold,
//! followed by an open frame, counts as one blink. Durations are derived
//! from the run length at the nominal frame rate.

use serde::{Deserialize, Serialize};

use crate::DetectionConfig;

/// A completed blink
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlinkEvent {
    /// Closed frames in the run
    pub closed_frames: u32,
    /// Estimated duration (milliseconds)
    pub duration_ms: f64,
}

/// Blink counters for one detection session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlinkSession {
    /// Consecutive frames the eyes have been closed so far
    pub closed_frame_run: u32,
    /// Completed blinks
    pub blink_count: u32,
    /// Duration of every completed blink, in order (milliseconds)
    pub blink_durations_ms: Vec<f64>,
    /// Frames processed, with or without a face
    pub frame_counter: u64,
}

impl BlinkSession {
    /// Blinks per minute at the given nominal frame rate.
    /// `None` before any frame was processed.
    pub fn blink_rate(&self, nominal_fps: f64) -> Option<f64> {
        if self.frame_counter == 0 {
            return None;
        }
        let minutes = self.frame_counter as f64 / nominal_fps / 60.0;
        Some(self.blink_count as f64 / minutes)
    }

    /// Mean blink duration, 0 when no blink was recorded yet
    pub fn avg_blink_duration_ms(&self) -> f64 {
        if self.blink_durations_ms.is_empty() {
            return 0.0;
        }
        self.blink_durations_ms.iter().sum::<f64>() / self.blink_durations_ms.len() as f64
    }
}

/// Blink state machine (`Open` while the run is 0, `Closed(run)` otherwise)
#[derive(Debug, Clone)]
pub struct BlinkDetector {
    ear_threshold: f64,
    consec_frames: u32,
    frame_duration_ms: f64,
    session: BlinkSession,
}

impl BlinkDetector {
    pub fn new(config: &DetectionConfig) -> Self {
        Self {
            ear_threshold: config.ear_threshold,
            consec_frames: config.consec_frames,
            frame_duration_ms: config.frame_duration_ms(),
            session: BlinkSession::default(),
        }
    }

    /// Feed one processed frame. `average_ear` is `None` when no face was found;
    /// such frames only advance the frame counter.
    pub fn update(&mut self, average_ear: Option<f64>) -> Option<BlinkEvent> {
        self.session.frame_counter += 1;

        let ear = average_ear?;
        if ear < self.ear_threshold {
            self.session.closed_frame_run += 1;
            return None;
        }

        let run = std::mem::take(&mut self.session.closed_frame_run);
        if run < self.consec_frames {
            return None;
        }

        let event = BlinkEvent {
            closed_frames: run,
            duration_ms: run as f64 * self.frame_duration_ms,
        };
        self.session.blink_count += 1;
        self.session.blink_durations_ms.push(event.duration_ms);
        Some(event)
    }

    pub fn session(&self) -> &BlinkSession {
        &self.session
    }

    /// Clear all counters
    pub fn reset(&mut self) {
        self.session = BlinkSession::default();
    }
}
