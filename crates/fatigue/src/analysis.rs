//! Per-frame analysis results

use crate::blink::BlinkEvent;
use crate::ear::{EyeContours, EyeState};
use crate::status::FatigueReport;

/// Result of running one frame through the pipeline
#[derive(Debug, Clone)]
pub struct FrameAnalysis {
    /// Eye contours in pixel coordinates (if a face was detected)
    pub contours: Option<EyeContours>,

    /// Eye openness (if a face was detected)
    pub eye_state: Option<EyeState>,

    /// Blink completed on this frame
    pub blink: Option<BlinkEvent>,

    /// Fatigue assessment after this frame
    pub report: FatigueReport,

    /// Frames processed so far in this session
    pub frame_counter: u64,
}

impl FrameAnalysis {
    pub fn face_detected(&self) -> bool {
        self.eye_state.is_some()
    }
}

