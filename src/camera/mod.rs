#[cfg(all(feature = "camera", target_os = "linux"))]
mod gst_source;
mod mock;
mod shared;
mod source;
#[cfg(test)]
mod tests;

#[cfg(all(feature = "camera", target_os = "linux"))]
pub use gst_source::GstFrameSource;
pub use mock::MockFrameSource;
pub use shared::SharedFrameSource;
pub use source::FrameSource;

use crate::config::MotionCamConfig;
use crate::error::Result;

/// Open the capture device described by the configuration
pub fn open_frame_source(config: &MotionCamConfig) -> Result<Box<dyn FrameSource>> {
    let (width, height) = config.resolution().dimensions();

    #[cfg(all(feature = "camera", target_os = "linux"))]
    {
        let source = GstFrameSource::open(
            config.camera.device,
            width,
            height,
            std::time::Duration::from_millis(config.camera.read_timeout_ms),
        )?;
        Ok(Box::new(source))
    }

    #[cfg(not(all(feature = "camera", target_os = "linux")))]
    {
        Err(crate::error::MotionCamError::DeviceUnavailable {
            device: format!("/dev/video{}", config.camera.device),
            details: format!(
                "built without camera support, cannot capture {}x{} (enable the `camera` feature)",
                width, height
            ),
        })
    }
}
