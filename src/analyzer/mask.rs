use crate::config::DetectionSettings;
use crate::error::{MotionCamError, Result};
use crate::frame::FrameData;
use image::{GrayImage, Luma};
use imageproc::{contrast::threshold, filter::gaussian_blur_f32};
use tracing::{debug, info};

/// Produces a foreground mask for a frame from a running background model
pub trait MotionMask: Send {
    /// Classify the frame's pixels; 255 marks foreground, 0 background.
    /// The background model is updated as a side effect.
    fn apply(&mut self, frame: &FrameData) -> Result<GrayImage>;
}

/// Running-average background subtractor
pub struct BackgroundSubtractor {
    blur_sigma: f32,
    delta_threshold: u8,
    learning_rate: f32,
    background: Option<Vec<f32>>,
    dimensions: (u32, u32),
    frame_count: u64,
}

impl BackgroundSubtractor {
    pub fn new(blur_sigma: f32, delta_threshold: u8, learning_rate: f32) -> Self {
        Self {
            blur_sigma,
            delta_threshold,
            learning_rate,
            background: None,
            dimensions: (0, 0),
            frame_count: 0,
        }
    }

    pub fn from_settings(settings: &DetectionSettings) -> Self {
        Self::new(
            settings.blur_sigma,
            settings.delta_threshold,
            settings.learning_rate,
        )
    }

    fn preprocess(&self, frame: &FrameData) -> Result<GrayImage> {
        let gray = frame.to_gray_image()?;
        if self.blur_sigma > 0.0 {
            Ok(gaussian_blur_f32(&gray, self.blur_sigma))
        } else {
            Ok(gray)
        }
    }
}

impl MotionMask for BackgroundSubtractor {
    fn apply(&mut self, frame: &FrameData) -> Result<GrayImage> {
        if frame.width == 0 || frame.height == 0 {
            return Err(MotionCamError::Analyzer {
                details: format!("Frame {} has no pixels", frame.id),
            });
        }

        let current = self.preprocess(frame)?;
        let dimensions = current.dimensions();
        self.frame_count += 1;

        if self.background.is_none() || self.dimensions != dimensions {
            info!(
                "Initializing background model at {}x{} (frame {} of this subtractor)",
                dimensions.0, dimensions.1, self.frame_count
            );
            self.background = Some(current.pixels().map(|p| p[0] as f32).collect());
            self.dimensions = dimensions;
            return Ok(GrayImage::new(dimensions.0, dimensions.1));
        }

        let learning_rate = self.learning_rate;
        let background = self
            .background
            .as_mut()
            .ok_or_else(|| MotionCamError::Analyzer {
                details: "Background model missing".to_string(),
            })?;

        let mut diff = GrayImage::new(dimensions.0, dimensions.1);
        for ((bg, pixel), out) in background
            .iter_mut()
            .zip(current.pixels())
            .zip(diff.pixels_mut())
        {
            let value = pixel[0] as f32;
            *out = Luma([(*bg - value).abs().min(255.0) as u8]);
            *bg = *bg * (1.0 - learning_rate) + value * learning_rate;
        }

        let mask = threshold(&diff, self.delta_threshold);
        debug!("Background subtraction done for frame {}", frame.id);
        Ok(mask)
    }
}
