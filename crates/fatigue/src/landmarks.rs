//! Facial landmark types and the provider contract

use camera_capture::VideoFrame;
use serde::{Deserialize, Serialize};

use crate::FatigueError;

/// 2D point
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point
    pub fn distance(&self, other: &Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// Facial landmarks of one face in pixel coordinates
#[derive(Debug, Clone, Default)]
pub struct LandmarkSet {
    points: Vec<Point>,
}

impl LandmarkSet {
    /// Build from pixel-space points
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    /// Scale points normalized to [0, 1] into a `width` x `height` frame
    pub fn from_normalized(points: &[Point], width: u32, height: u32) -> Self {
        let (w, h) = (width as f64, height as f64);
        Self {
            points: points.iter().map(|p| Point::new(p.x * w, p.y * h)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Point> {
        self.points.get(index).copied()
    }

    /// Pick six contour points by index. `None` if any index is out of range.
    pub fn contour(&self, indices: &[usize; 6]) -> Option<[Point; 6]> {
        let mut out = [Point::default(); 6];
        for (slot, &idx) in out.iter_mut().zip(indices) {
            *slot = self.get(idx)?;
        }
        Some(out)
    }
}

/// Facial landmark extraction capability.
///
/// Implementations return at most one face, with points normalized to the
/// frame size, or `None` when no face is visible.
pub trait LandmarkProvider: Send + Sync {
    fn detect(&self, frame: &VideoFrame) -> Result<Option<Vec<Point>>, FatigueError>;
}

/// Provider used when no landmark model is configured: never finds a face.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledLandmarks;

impl LandmarkProvider for DisabledLandmarks {
    fn detect(&self, _frame: &VideoFrame) -> Result<Option<Vec<Point>>, FatigueError> {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_normalized_scales_to_pixels() {
        let set = LandmarkSet::from_normalized(&[Point::new(0.5, 0.25)], 640, 480);
        assert_eq!(set.get(0), Some(Point::new(320.0, 120.0)));
    }

    #[test]
    fn test_contour_out_of_range() {
        let set = LandmarkSet::new(vec![Point::default(); 10]);
        assert!(set.contour(&[0, 1, 2, 3, 4, 5]).is_some());
        assert!(set.contour(&[0, 1, 2, 3, 4, 10]).is_none());
    }

    #[test]
    fn test_disabled_provider_finds_nothing() {
        let frame = VideoFrame::filled(4, 4, [0, 0, 0], 0);
        assert!(DisabledLandmarks.detect(&frame).unwrap().is_none());
    }
}
