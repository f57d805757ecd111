//! Eye Aspect Ratio
//!
//! `EAR = (|p2-p6| + |p3-p5|) / (2 * |p1-p4|)` where p1/p4 are the eye
//! corners and p2,p3 / p6,p5 the upper and lower lid points.

use serde::{Deserialize, Serialize};

use crate::landmarks::{LandmarkSet, Point};

/// Eye openness derived from one landmark set
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EyeState {
    pub left_ear: f64,
    pub right_ear: f64,
    pub average_ear: f64,
}

impl EyeState {
    pub fn new(left_ear: f64, right_ear: f64) -> Self {
        Self {
            left_ear,
            right_ear,
            average_ear: (left_ear + right_ear) / 2.0,
        }
    }
}

/// Eye contour points picked out of a landmark set
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EyeContours {
    pub left: [Point; 6],
    pub right: [Point; 6],
}

impl EyeContours {
    /// `None` if the landmark set does not cover the requested indices
    pub fn extract(landmarks: &LandmarkSet, left: &[usize; 6], right: &[usize; 6]) -> Option<Self> {
        Some(Self {
            left: landmarks.contour(left)?,
            right: landmarks.contour(right)?,
        })
    }

    pub fn eye_state(&self) -> EyeState {
        EyeState::new(eye_aspect_ratio(&self.left), eye_aspect_ratio(&self.right))
    }
}

/// EAR of one eye. A zero-width eye yields 0.
pub fn eye_aspect_ratio(eye: &[Point; 6]) -> f64 {
    let [p1, p2, p3, p4, p5, p6] = eye;
    let vertical1 = p2.distance(p6);
    let vertical2 = p3.distance(p5);
    let horizontal = p1.distance(p4);

    if horizontal <= f64::EPSILON {
        return 0.0;
    }
    (vertical1 + vertical2) / (2.0 * horizontal)
}
