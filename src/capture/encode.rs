use crate::error::{MotionCamError, Result};
use crate::frame::FrameData;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Parameters an encoder is opened with
#[derive(Debug, Clone, PartialEq)]
pub struct EncoderSettings {
    /// Codec fourcc, e.g. "H264"
    pub codec: String,
    pub frame_rate: f64,
    pub dimensions: (u32, u32),
}

impl EncoderSettings {
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.frame_rate)
    }
}

/// A video file being written
pub trait VideoEncoder: Send {
    fn write_frame(&mut self, frame: &FrameData) -> Result<()>;

    /// Flush and release the file. Called exactly once by `EncoderGuard`.
    fn close(&mut self) -> Result<()>;
}

/// Opens encoders bound to a destination path
pub trait EncoderFactory: Send + Sync {
    fn open(&self, path: &Path, settings: &EncoderSettings) -> Result<Box<dyn VideoEncoder>>;

    /// File extension of the produced container
    fn extension(&self) -> &str;
}

/// Owns an open encoder and closes it exactly once, on `finish` or on drop
pub struct EncoderGuard {
    encoder: Option<Box<dyn VideoEncoder>>,
    path: PathBuf,
}

impl EncoderGuard {
    pub fn new(encoder: Box<dyn VideoEncoder>, path: PathBuf) -> Self {
        Self {
            encoder: Some(encoder),
            path,
        }
    }

    pub fn write_frame(&mut self, frame: &FrameData) -> Result<()> {
        match self.encoder.as_mut() {
            Some(encoder) => encoder.write_frame(frame),
            None => Err(MotionCamError::encoder(format!(
                "Encoder for {} already closed",
                self.path.display()
            ))),
        }
    }

    /// Close the encoder and surface any finalization error
    pub fn finish(mut self) -> Result<()> {
        match self.encoder.take() {
            Some(mut encoder) => {
                debug!("Closing encoder for {}", self.path.display());
                encoder.close()
            }
            None => Ok(()),
        }
    }
}

impl Drop for EncoderGuard {
    fn drop(&mut self) {
        if let Some(mut encoder) = self.encoder.take() {
            if let Err(e) = encoder.close() {
                warn!("Failed to close encoder for {}: {}", self.path.display(), e);
            }
        }
    }
}
