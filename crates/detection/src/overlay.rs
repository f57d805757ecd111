//! Diagnostic overlay and JPEG encoding
//!
//! Consumes a `FrameAnalysis` read-only; never touches detector state.

use ab_glyph::{FontArc, PxScale};
use bytes::Bytes;
use camera_capture::VideoFrame;
use fatigue::FrameAnalysis;
use image::codecs::jpeg::JpegEncoder;
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::streamer::EncodedFrame;
use crate::DetectionError;

const TEXT_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const STATUS_TEXT_COLOR: Rgb<u8> = Rgb([255, 255, 255]);
const NORMAL_COLOR: Rgb<u8> = Rgb([0, 200, 0]);
const FATIGUED_COLOR: Rgb<u8> = Rgb([220, 0, 0]);
const GAUGE_COLOR: Rgb<u8> = Rgb([255, 200, 0]);
const CONTOUR_COLOR: Rgb<u8> = Rgb([0, 255, 255]);

/// EAR mapped to a full gauge
const GAUGE_FULL_EAR: f64 = 0.4;
const STATUS_BAND_HEIGHT: u32 = 8;

/// DejaVu Sans Mono, used unless `font_path` names another font
static DEFAULT_FONT: &[u8] = include_bytes!("../assets/DejaVuSansMono.ttf");

/// Overlay configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// TrueType font for text lines, replacing the bundled DejaVu Sans Mono
    pub font_path: Option<String>,
    /// Text height in pixels
    pub font_scale: f32,
    /// JPEG quality (1-100)
    pub jpeg_quality: u8,
    /// Mark eye contour landmarks
    pub draw_contours: bool,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            font_path: None,
            font_scale: 28.0,
            jpeg_quality: 80,
            draw_contours: true,
        }
    }
}

/// Frame annotator and encoder
pub struct Overlay {
    config: OverlayConfig,
    font: FontArc,
}

impl Overlay {
    pub fn new(config: OverlayConfig) -> Result<Self, DetectionError> {
        let font = match &config.font_path {
            Some(path) => {
                let data = std::fs::read(path)
                    .map_err(|e| DetectionError::Overlay(format!("{}: {}", path, e)))?;
                let font = FontArc::try_from_vec(data)
                    .map_err(|e| DetectionError::Overlay(format!("{}: {}", path, e)))?;
                info!("Overlay font loaded from {}", path);
                font
            }
            None => FontArc::try_from_slice(DEFAULT_FONT)
                .map_err(|e| DetectionError::Overlay(format!("bundled font: {}", e)))?,
        };
        Ok(Self { config, font })
    }

    /// Draw diagnostics onto `img`
    pub fn annotate(&self, img: &mut RgbImage, analysis: &FrameAnalysis) {
        let (width, height) = img.dimensions();
        if width == 0 || height == 0 {
            return;
        }

        if self.config.draw_contours {
            if let Some(contours) = &analysis.contours {
                for p in contours.left.iter().chain(contours.right.iter()) {
                    let rect = Rect::at(p.x.round() as i32 - 1, p.y.round() as i32 - 1).of_size(3, 3);
                    draw_filled_rect_mut(img, rect, CONTOUR_COLOR);
                }
            }
        }

        // EAR gauge, top right
        let gauge_w = (width / 4).max(2);
        let gauge_h = (height / 40).max(2);
        let gauge_x = width.saturating_sub(gauge_w + 10) as i32;
        let gauge = Rect::at(gauge_x, 10).of_size(gauge_w, gauge_h);
        draw_hollow_rect_mut(img, gauge, GAUGE_COLOR);
        if let Some(eyes) = analysis.eye_state {
            let fill = (eyes.average_ear / GAUGE_FULL_EAR).clamp(0.0, 1.0);
            let fill_w = (fill * gauge_w as f64) as u32;
            if fill_w > 0 {
                draw_filled_rect_mut(img, Rect::at(gauge_x, 10).of_size(fill_w, gauge_h), GAUGE_COLOR);
            }
        }

        // Status band, bottom edge
        let band_h = STATUS_BAND_HEIGHT.min(height);
        let band_color = if analysis.report.status.is_fatigued() {
            FATIGUED_COLOR
        } else {
            NORMAL_COLOR
        };
        draw_filled_rect_mut(
            img,
            Rect::at(0, (height - band_h) as i32).of_size(width, band_h),
            band_color,
        );

        let scale = PxScale::from(self.config.font_scale);
        let ear_text = match analysis.eye_state {
            Some(eyes) => format!("EAR: {:.2}", eyes.average_ear),
            None => "EAR: --".to_string(),
        };
        let blinks_text = format!("Blinks: {}", analysis.report.blink_count);
        let status_text = format!("Status: {}", analysis.report.status);
        let status_y = height as i32 - band_h as i32 - self.config.font_scale as i32 - 10;

        draw_text_mut(img, TEXT_COLOR, 30, 30, scale, &self.font, &ear_text);
        draw_text_mut(img, TEXT_COLOR, 30, 80, scale, &self.font, &blinks_text);
        draw_text_mut(img, STATUS_TEXT_COLOR, 30, status_y.max(0), scale, &self.font, &status_text);
    }

    /// Annotate and JPEG-encode a frame
    pub fn render(&self, frame: VideoFrame, analysis: &FrameAnalysis) -> Result<EncodedFrame, DetectionError> {
        let (sequence, timestamp_ns) = (frame.sequence, frame.timestamp_ns);
        let mut img = frame
            .into_rgb_image()
            .ok_or_else(|| DetectionError::Overlay("frame buffer does not match its dimensions".into()))?;

        self.annotate(&mut img, analysis);

        let mut jpeg = Vec::new();
        JpegEncoder::new_with_quality(&mut jpeg, self.config.jpeg_quality.clamp(1, 100))
            .encode_image(&img)
            .map_err(|e| DetectionError::Overlay(e.to_string()))?;

        Ok(EncodedFrame {
            jpeg: Bytes::from(jpeg),
            sequence,
            timestamp_ns,
        })
    }
}
