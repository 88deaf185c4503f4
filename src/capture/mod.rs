mod encode;
#[cfg(all(feature = "video_encoding", target_os = "linux"))]
mod gst_encoder;
mod mjpeg;
mod mock;
mod recording;
#[cfg(test)]
mod tests;

pub use encode::{EncoderFactory, EncoderGuard, EncoderSettings, VideoEncoder};
#[cfg(all(feature = "video_encoding", target_os = "linux"))]
pub use gst_encoder::{GstEncoderFactory, GstVideoEncoder};
pub use mjpeg::{MjpegEncoderFactory, MjpegFileEncoder};
pub use mock::{SpyCounters, SpyEncoderFactory};
pub use recording::{
    RecordingCompletion, RecordingJob, RecordingOutcome, RecordingResult,
};

use crate::config::RecordingConfig;
use crate::error::{MotionCamError, Result};
use std::sync::Arc;

/// Build the encoder factory selected by `recording.backend`
pub fn encoder_factory(config: &RecordingConfig) -> Result<Arc<dyn EncoderFactory>> {
    match config.backend.as_str() {
        "mjpeg" => Ok(Arc::new(MjpegEncoderFactory::new(config.jpeg_quality))),
        #[cfg(all(feature = "video_encoding", target_os = "linux"))]
        "gstreamer" => Ok(Arc::new(GstEncoderFactory::new(&config.codec)?)),
        #[cfg(not(all(feature = "video_encoding", target_os = "linux")))]
        "gstreamer" => Err(MotionCamError::component(
            "video_encoder",
            "built without GStreamer encoding (enable the `video_encoding` feature)",
        )),
        other => Err(MotionCamError::component(
            "video_encoder".to_string(),
            format!("Unknown recording backend '{}'", other),
        )),
    }
}
