use crate::error::{MotionCamError, Result};
use image::{GrayImage, Luma, RgbImage};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::SystemTime;

/// Pixel layout of a captured frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrameFormat {
    /// Packed 8-bit RGB
    Rgb24,
    /// Single 8-bit luminance channel
    Gray8,
}

impl FrameFormat {
    /// Get bytes per pixel for the format
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            FrameFormat::Rgb24 => 3,
            FrameFormat::Gray8 => 1,
        }
    }
}

/// Frame data structure containing raw frame data and metadata
#[derive(Debug, Clone)]
pub struct FrameData {
    /// Frame identifier assigned by the source
    pub id: u64,
    /// Timestamp when frame was captured
    pub timestamp: SystemTime,
    /// Raw pixel data (shared between the analysis loop and a recording)
    pub data: Arc<Vec<u8>>,
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Frame format
    pub format: FrameFormat,
}

impl FrameData {
    /// Create a new frame data instance
    pub fn new(
        id: u64,
        timestamp: SystemTime,
        data: Vec<u8>,
        width: u32,
        height: u32,
        format: FrameFormat,
    ) -> Self {
        Self {
            id,
            timestamp,
            data: Arc::new(data),
            width,
            height,
            format,
        }
    }

    /// Expected buffer size for the frame's dimensions and format
    pub fn expected_size(&self) -> usize {
        self.width as usize * self.height as usize * self.format.bytes_per_pixel()
    }

    /// Validate frame data size against expected size
    pub fn validate_size(&self) -> bool {
        self.data.len() == self.expected_size()
    }

    /// Convert to a grayscale image
    pub fn to_gray_image(&self) -> Result<GrayImage> {
        match self.format {
            FrameFormat::Gray8 => GrayImage::from_raw(self.width, self.height, self.data.to_vec())
                .ok_or_else(|| MotionCamError::Analyzer {
                    details: format!("Gray frame {} has an invalid buffer size", self.id),
                }),
            FrameFormat::Rgb24 => {
                let rgb = self.to_rgb_image()?;
                let mut gray = GrayImage::new(self.width, self.height);
                for (x, y, pixel) in rgb.enumerate_pixels() {
                    let value = (0.299 * pixel[0] as f32
                        + 0.587 * pixel[1] as f32
                        + 0.114 * pixel[2] as f32) as u8;
                    gray.put_pixel(x, y, Luma([value]));
                }
                Ok(gray)
            }
        }
    }

    /// Convert to an RGB image
    pub fn to_rgb_image(&self) -> Result<RgbImage> {
        match self.format {
            FrameFormat::Rgb24 => RgbImage::from_raw(self.width, self.height, self.data.to_vec())
                .ok_or_else(|| MotionCamError::Analyzer {
                    details: format!("RGB frame {} has an invalid buffer size", self.id),
                }),
            FrameFormat::Gray8 => {
                let gray = self.to_gray_image()?;
                Ok(image::DynamicImage::ImageLuma8(gray).to_rgb8())
            }
        }
    }
}

/// Result of a single read from a frame source
#[derive(Debug, Clone)]
pub enum FrameRead {
    /// A frame was captured
    Frame(FrameData),
    /// Nothing was available within the read timeout; the source is still open
    Empty,
    /// The source reached end of stream or the device went away
    Closed,
}
