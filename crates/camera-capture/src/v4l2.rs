//! V4L2 webcam backend

use std::time::Duration;

use tracing::{info, warn};
use v4l::buffer::Type;
use v4l::io::mmap::Stream;
use v4l::io::traits::CaptureStream;
use v4l::video::capture::Parameters;
use v4l::video::Capture;
use v4l::{Device, FourCC};

use crate::frame::now_ns;
use crate::{CameraBackend, CameraConfig, CameraDevice, CameraError, PixelFormat, VideoFrame};

/// Opens `/dev/videoN` devices through V4L2 memory-mapped streaming
#[derive(Debug, Default, Clone, Copy)]
pub struct V4lBackend;

impl CameraBackend for V4lBackend {
    fn open(&self, config: &CameraConfig) -> Result<Box<dyn CameraDevice>, CameraError> {
        Ok(Box::new(V4lCamera::open(config)?))
    }

    fn name(&self) -> &'static str {
        "v4l2"
    }
}

/// An open V4L2 capture stream
pub struct V4lCamera {
    // Declared before `_device` so the stream is torn down first
    stream: Stream<'static>,
    _device: Device,
    format: PixelFormat,
    width: u32,
    height: u32,
    sequence: u32,
}

impl V4lCamera {
    /// Open and configure the device, preferring MJPEG and falling back to YUYV
    pub fn open(config: &CameraConfig) -> Result<Self, CameraError> {
        let device = Device::with_path(&config.device)
            .map_err(|e| CameraError::Unavailable(format!("{}: {}", config.device, e)))?;

        let mut fmt = device
            .format()
            .map_err(|e| CameraError::Unavailable(e.to_string()))?;
        fmt.width = config.width;
        fmt.height = config.height;
        fmt.fourcc = FourCC::new(b"MJPG");
        let fmt = device
            .set_format(&fmt)
            .map_err(|e| CameraError::Format(e.to_string()))?;

        let format = if fmt.fourcc == FourCC::new(b"MJPG") {
            PixelFormat::Mjpeg
        } else if fmt.fourcc == FourCC::new(b"YUYV") {
            PixelFormat::Yuyv
        } else if fmt.fourcc == FourCC::new(b"RGB3") {
            PixelFormat::Rgb24
        } else {
            return Err(CameraError::Format(format!("unsupported fourcc {}", fmt.fourcc)));
        };

        if let Err(e) = device.set_params(&Parameters::with_fps(config.fps)) {
            warn!("Could not set {} fps on {}: {}", config.fps, config.device, e);
        }

        let mut stream = Stream::with_buffers(&device, Type::VideoCapture, config.buffer_count)
            .map_err(|e| CameraError::Unavailable(e.to_string()))?;
        stream.set_timeout(Duration::from_millis(config.read_timeout_ms));

        info!(
            "Opened {} at {}x{} ({:?})",
            config.device, fmt.width, fmt.height, format
        );

        Ok(Self {
            stream,
            _device: device,
            format,
            width: fmt.width,
            height: fmt.height,
            sequence: 0,
        })
    }
}

impl CameraDevice for V4lCamera {
    fn read_frame(&mut self) -> Result<VideoFrame, CameraError> {
        let (buf, _meta) = self
            .stream
            .next()
            .map_err(|e| CameraError::Read(e.to_string()))?;
        self.sequence = self.sequence.wrapping_add(1);
        self.format
            .decode(buf, self.width, self.height, now_ns(), self.sequence)
    }
}
