//! Face mesh landmark provider backed by an ONNX model

use camera_capture::VideoFrame;
use image::imageops::{self, FilterType};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use tract_onnx::prelude::*;

use crate::landmarks::{LandmarkProvider, Point};
use crate::FatigueError;

type FaceMeshPlan = TypedRunnableModel<TypedModel>;

/// How input pixels are scaled before inference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputNormalization {
    /// [0, 255] -> [0, 1]
    ZeroToOne,
    /// [0, 255] -> [-1, 1]
    MinusOneToOne,
}

/// Face mesh model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FaceMeshConfig {
    /// ONNX model path; landmark detection is disabled when unset
    pub model_path: Option<String>,
    /// Square input resolution expected by the model
    pub input_size: u32,
    /// NHWC input layout (MediaPipe exports) instead of NCHW
    pub channels_last: bool,
    pub normalization: InputNormalization,
    /// Output holding flattened (x, y, z) landmarks in input pixel units
    pub landmarks_output: usize,
    /// Output holding the face presence logit, if the model has one
    pub presence_output: Option<usize>,
    /// Presence probability required to accept a face
    pub presence_threshold: f32,
}

impl Default for FaceMeshConfig {
    fn default() -> Self {
        Self {
            model_path: None,
            input_size: 192,
            channels_last: true,
            normalization: InputNormalization::ZeroToOne,
            landmarks_output: 0,
            presence_output: Some(1),
            presence_threshold: 0.5,
        }
    }
}

/// Face mesh landmark provider using tract
pub struct FaceMeshProvider {
    config: FaceMeshConfig,
    plan: FaceMeshPlan,
}

impl FaceMeshProvider {
    /// Load and optimize the configured model
    pub fn new(config: FaceMeshConfig) -> Result<Self, FatigueError> {
        let path = config
            .model_path
            .clone()
            .ok_or_else(|| FatigueError::Config("face mesh model path not set".into()))?;
        info!("Loading face mesh model from {}", path);

        let s = config.input_size as usize;
        let shape: [usize; 4] = if config.channels_last {
            [1, s, s, 3]
        } else {
            [1, 3, s, s]
        };

        let plan = tract_onnx::onnx()
            .model_for_path(&path)
            .and_then(|model| model.with_input_fact(0, f32::fact(shape).into()))
            .and_then(|model| model.into_optimized())
            .and_then(|model| model.into_runnable())
            .map_err(|e| FatigueError::ModelLoad(format!("{}: {}", path, e)))?;

        Ok(Self { config, plan })
    }

    fn preprocess(&self, frame: &VideoFrame) -> Result<Tensor, FatigueError> {
        let img = frame
            .to_rgb_image()
            .ok_or_else(|| FatigueError::ImageProcessing("Failed to create image buffer".into()))?;

        let s = self.config.input_size;
        let resized = imageops::resize(&img, s, s, FilterType::Triangle);
        let scale = |v: u8| match self.config.normalization {
            InputNormalization::ZeroToOne => v as f32 / 255.0,
            InputNormalization::MinusOneToOne => v as f32 / 127.5 - 1.0,
        };

        let s = s as usize;
        let tensor: Tensor = if self.config.channels_last {
            tract_ndarray::Array4::from_shape_fn((1, s, s, 3), |(_, y, x, c)| {
                scale(resized.get_pixel(x as u32, y as u32)[c])
            })
            .into()
        } else {
            tract_ndarray::Array4::from_shape_fn((1, 3, s, s), |(_, c, y, x)| {
                scale(resized.get_pixel(x as u32, y as u32)[c])
            })
            .into()
        };
        Ok(tensor)
    }
}

impl LandmarkProvider for FaceMeshProvider {
    fn detect(&self, frame: &VideoFrame) -> Result<Option<Vec<Point>>, FatigueError> {
        let input = self.preprocess(frame)?;
        let outputs = self
            .plan
            .run(tvec!(input.into()))
            .map_err(|e| FatigueError::Inference(e.to_string()))?;

        if let Some(idx) = self.config.presence_output {
            let logit = outputs
                .get(idx)
                .and_then(|t| t.as_slice::<f32>().ok().and_then(|s| s.first().copied()))
                .ok_or_else(|| FatigueError::Inference(format!("missing presence output {}", idx)))?;
            let presence = 1.0 / (1.0 + (-logit).exp());
            if presence < self.config.presence_threshold {
                return Ok(None);
            }
        }

        let raw = outputs
            .get(self.config.landmarks_output)
            .ok_or_else(|| {
                FatigueError::Inference(format!(
                    "missing landmarks output {}",
                    self.config.landmarks_output
                ))
            })?
            .as_slice::<f32>()
            .map_err(|e| FatigueError::Inference(e.to_string()))?;

        if raw.len() < 3 || raw.len() % 3 != 0 {
            warn!("Unexpected landmark tensor length {}", raw.len());
            return Ok(None);
        }

        let size = self.config.input_size as f64;
        let points = raw
            .chunks_exact(3)
            .map(|xyz| Point::new(xyz[0] as f64 / size, xyz[1] as f64 / size))
            .collect();
        Ok(Some(points))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_targets_mediapipe() {
        let config = FaceMeshConfig::default();
        assert_eq!(config.input_size, 192);
        assert!(config.channels_last);
        assert!(config.model_path.is_none());
    }

    #[test]
    fn test_missing_model_path_rejected() {
        let result = FaceMeshProvider::new(FaceMeshConfig::default());
        assert!(matches!(result, Err(FatigueError::Config(_))));
    }

    #[test]
    fn test_unreadable_model_rejected() {
        let config = FaceMeshConfig {
            model_path: Some("/nonexistent/face_mesh.onnx".into()),
            ..Default::default()
        };
        assert!(matches!(
            FaceMeshProvider::new(config),
            Err(FatigueError::ModelLoad(_))
        ));
    }
}
