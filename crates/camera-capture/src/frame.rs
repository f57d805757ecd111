//! Video frame types and decoding

use image::{ImageFormat, RgbImage};
use serde::{Deserialize, Serialize};

use crate::CameraError;

/// Pixel format delivered by a capture device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelFormat {
    Rgb24,
    Mjpeg,
    Yuyv,
}

impl PixelFormat {
    /// Decode a raw device buffer in this format into an RGB frame
    pub fn decode(
        self,
        raw: &[u8],
        width: u32,
        height: u32,
        timestamp_ns: u64,
        sequence: u32,
    ) -> Result<VideoFrame, CameraError> {
        match self {
            PixelFormat::Rgb24 => {
                let expected = (width * height * 3) as usize;
                if raw.len() < expected {
                    return Err(CameraError::Decode(format!(
                        "RGB24 buffer too short: {} < {}",
                        raw.len(),
                        expected
                    )));
                }
                Ok(VideoFrame::new(raw[..expected].to_vec(), width, height, timestamp_ns, sequence))
            }
            PixelFormat::Mjpeg => decode_mjpeg(raw, timestamp_ns, sequence),
            PixelFormat::Yuyv => decode_yuyv(raw, width, height, timestamp_ns, sequence),
        }
    }
}

/// Decoded RGB video frame
#[derive(Debug, Clone)]
pub struct VideoFrame {
    /// RGB pixel data (width * height * 3)
    pub data: Vec<u8>,
    /// Frame width
    pub width: u32,
    /// Frame height
    pub height: u32,
    /// Capture timestamp (nanoseconds since the Unix epoch)
    pub timestamp_ns: u64,
    /// Frame sequence number
    pub sequence: u32,
}

impl VideoFrame {
    /// Create a new video frame from raw RGB data
    pub fn new(data: Vec<u8>, width: u32, height: u32, timestamp_ns: u64, sequence: u32) -> Self {
        Self {
            data,
            width,
            height,
            timestamp_ns,
            sequence,
        }
    }

    /// Solid-colour frame, mostly useful for fakes and tests
    pub fn filled(width: u32, height: u32, rgb: [u8; 3], sequence: u32) -> Self {
        let data = rgb.repeat((width * height) as usize);
        Self::new(data, width, height, now_ns(), sequence)
    }

    /// Wrap an `image` RGB buffer
    pub fn from_rgb_image(img: RgbImage, timestamp_ns: u64, sequence: u32) -> Self {
        let (width, height) = img.dimensions();
        Self::new(img.into_raw(), width, height, timestamp_ns, sequence)
    }

    /// Borrow-free conversion into an `image` RGB buffer.
    /// Returns `None` if the pixel buffer does not match the dimensions.
    pub fn into_rgb_image(self) -> Option<RgbImage> {
        RgbImage::from_raw(self.width, self.height, self.data)
    }

    /// Copy into an `image` RGB buffer
    pub fn to_rgb_image(&self) -> Option<RgbImage> {
        RgbImage::from_raw(self.width, self.height, self.data.clone())
    }

    /// Check that the buffer length matches the dimensions
    pub fn is_well_formed(&self) -> bool {
        self.data.len() == (self.width * self.height * 3) as usize
    }
}

/// Current wall-clock time in nanoseconds since the Unix epoch
pub fn now_ns() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

/// Decode MJPEG frame to RGB
pub fn decode_mjpeg(mjpeg_data: &[u8], timestamp_ns: u64, sequence: u32) -> Result<VideoFrame, CameraError> {
    let img = image::load_from_memory_with_format(mjpeg_data, ImageFormat::Jpeg)
        .map_err(|e| CameraError::Decode(e.to_string()))?;
    Ok(VideoFrame::from_rgb_image(img.to_rgb8(), timestamp_ns, sequence))
}

/// Decode packed YUYV 4:2:2 to RGB (BT.601)
pub fn decode_yuyv(
    raw: &[u8],
    width: u32,
    height: u32,
    timestamp_ns: u64,
    sequence: u32,
) -> Result<VideoFrame, CameraError> {
    let expected = (width * height * 2) as usize;
    if width % 2 != 0 || raw.len() < expected {
        return Err(CameraError::Decode(format!(
            "YUYV buffer mismatch: {} bytes for {}x{}",
            raw.len(),
            width,
            height
        )));
    }

    let mut rgb = Vec::with_capacity((width * height * 3) as usize);
    for chunk in raw[..expected].chunks_exact(4) {
        let (y0, u, y1, v) = (chunk[0], chunk[1], chunk[2], chunk[3]);
        rgb.extend_from_slice(&yuv_to_rgb(y0, u, v));
        rgb.extend_from_slice(&yuv_to_rgb(y1, u, v));
    }

    Ok(VideoFrame::new(rgb, width, height, timestamp_ns, sequence))
}

fn yuv_to_rgb(y: u8, u: u8, v: u8) -> [u8; 3] {
    let y = y as f32;
    let u = u as f32 - 128.0;
    let v = v as f32 - 128.0;
    let r = y + 1.402 * v;
    let g = y - 0.344_136 * u - 0.714_136 * v;
    let b = y + 1.772 * u;
    [
        r.clamp(0.0, 255.0) as u8,
        g.clamp(0.0, 255.0) as u8,
        b.clamp(0.0, 255.0) as u8,
    ]
}
