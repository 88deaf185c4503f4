use super::encode::{EncoderFactory, EncoderSettings, VideoEncoder};
use crate::error::{MotionCamError, Result};
use crate::frame::FrameData;
use image::codecs::jpeg::JpegEncoder;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Writes a raw Motion-JPEG stream: JPEG frames back to back in one file.
///
/// The stream has no container, so it carries no frame timing and the
/// encoder frame rate is not recorded anywhere. Players have to be told the
/// rate. Use the GStreamer backend for timed H264 output.
pub struct MjpegFileEncoder {
    writer: Option<BufWriter<File>>,
    path: PathBuf,
    quality: u8,
    dimensions: (u32, u32),
    frames_written: u64,
}

impl MjpegFileEncoder {
    pub fn create(path: &Path, dimensions: (u32, u32), quality: u8) -> Result<Self> {
        let file = File::create(path).map_err(|e| MotionCamError::EncoderOpen {
            path: path.display().to_string(),
            details: e.to_string(),
        })?;

        info!(
            "Opened MJPEG encoder at {} ({}x{})",
            path.display(),
            dimensions.0,
            dimensions.1
        );

        Ok(Self {
            writer: Some(BufWriter::new(file)),
            path: path.to_path_buf(),
            quality: quality.clamp(1, 100),
            dimensions,
            frames_written: 0,
        })
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }
}

impl VideoEncoder for MjpegFileEncoder {
    fn write_frame(&mut self, frame: &FrameData) -> Result<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| MotionCamError::encoder("MJPEG encoder already closed"))?;

        if (frame.width, frame.height) != self.dimensions {
            debug!(
                "Frame {} is {}x{}, encoder opened at {}x{}",
                frame.id, frame.width, frame.height, self.dimensions.0, self.dimensions.1
            );
        }

        let rgb = frame.to_rgb_image()?;
        let mut encoder = JpegEncoder::new_with_quality(&mut *writer, self.quality);
        encoder
            .encode_image(&rgb)
            .map_err(|e| MotionCamError::encoder(format!("JPEG encoding failed: {}", e)))?;

        self.frames_written += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
            debug!(
                "MJPEG file {} closed after {} frames",
                self.path.display(),
                self.frames_written
            );
        }
        Ok(())
    }
}

/// Factory for `MjpegFileEncoder`
pub struct MjpegEncoderFactory {
    quality: u8,
}

impl MjpegEncoderFactory {
    pub fn new(quality: u8) -> Self {
        Self { quality }
    }
}

impl EncoderFactory for MjpegEncoderFactory {
    fn open(&self, path: &Path, settings: &EncoderSettings) -> Result<Box<dyn VideoEncoder>> {
        Ok(Box::new(MjpegFileEncoder::create(
            path,
            settings.dimensions,
            self.quality,
        )?))
    }

    fn extension(&self) -> &str {
        "mjpeg"
    }
}
