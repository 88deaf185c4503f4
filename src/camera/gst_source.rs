use super::source::FrameSource;
use crate::error::{MotionCamError, Result};
use crate::frame::{FrameData, FrameFormat, FrameRead};
use async_trait::async_trait;
use gstreamer::prelude::*;
use gstreamer::Pipeline;
use gstreamer_app::AppSink;
use gstreamer_video::VideoInfo;
use std::time::{Duration, SystemTime};
use tracing::{debug, error, info, trace, warn};

/// V4L2 camera read through a GStreamer pipeline, converted to packed RGB
pub struct GstFrameSource {
    device: u32,
    width: u32,
    height: u32,
    read_timeout: Duration,
    pipeline: Pipeline,
    appsink: AppSink,
    frame_counter: u64,
    open: bool,
    /// First bus error seen; the device is unusable from then on
    failed: Option<String>,
}

impl GstFrameSource {
    /// Open `/dev/video<device>` at the requested size
    pub fn open(device: u32, width: u32, height: u32, read_timeout: Duration) -> Result<Self> {
        info!(
            "Opening GStreamer camera /dev/video{} at {}x{}",
            device, width, height
        );

        let unavailable = |details: String| MotionCamError::DeviceUnavailable {
            device: format!("/dev/video{}", device),
            details,
        };

        gstreamer::init()
            .map_err(|e| unavailable(format!("Failed to initialize GStreamer: {}", e)))?;

        let pipeline_desc = format!(
            "v4l2src device=/dev/video{} ! \
             videoconvert ! videoscale ! \
             video/x-raw,format=RGB,width={},height={} ! \
             appsink name=sink sync=false max-buffers=2 drop=true",
            device, width, height
        );
        debug!("Camera pipeline: {}", pipeline_desc);

        let pipeline = gstreamer::parse::launch(&pipeline_desc)
            .map_err(|e| unavailable(format!("Failed to create pipeline: {}", e)))?
            .downcast::<Pipeline>()
            .map_err(|_| unavailable("Failed to downcast to Pipeline".to_string()))?;

        let appsink = pipeline
            .by_name("sink")
            .ok_or_else(|| unavailable("Failed to get appsink element".to_string()))?
            .downcast::<AppSink>()
            .map_err(|_| unavailable("Failed to downcast to AppSink".to_string()))?;

        pipeline
            .set_state(gstreamer::State::Playing)
            .map_err(|e| unavailable(format!("Failed to start pipeline: {}", e)))?;

        // Wait for the device to actually come up so a missing camera fails here
        let (state_change, _, _) = pipeline.state(gstreamer::ClockTime::from_seconds(5));
        if let Err(e) = state_change {
            let _ = pipeline.set_state(gstreamer::State::Null);
            return Err(unavailable(format!("Pipeline did not reach PLAYING: {}", e)));
        }

        Ok(Self {
            device,
            width,
            height,
            read_timeout,
            pipeline,
            appsink,
            frame_counter: 0,
            open: true,
            failed: None,
        })
    }

    fn pending_error(&self) -> Option<String> {
        let bus = self.pipeline.bus()?;
        bus.pop_filtered(&[gstreamer::MessageType::Error])
            .and_then(|msg| match msg.view() {
                gstreamer::MessageView::Error(err) => Some(format!(
                    "{} ({})",
                    err.error(),
                    err.debug().unwrap_or_default()
                )),
                _ => None,
            })
    }
}

fn device_failure(device: u32, error: &str) -> MotionCamError {
    MotionCamError::frame_read(format!("/dev/video{}: {}", device, error))
}

/// Decide what a read that timed out without a sample means.
///
/// A bus error is latched into `failed` because the bus hands it out only
/// once, and the source is shared between the analysis loop and recordings.
fn classify_missing_sample(
    device: u32,
    failed: &mut Option<String>,
    bus_error: Option<String>,
    eos: bool,
) -> Result<FrameRead> {
    if let Some(error) = bus_error {
        if failed.is_none() {
            error!("Camera /dev/video{} failed: {}", device, error);
            *failed = Some(error);
        }
    }
    if let Some(error) = failed.as_deref() {
        return Err(device_failure(device, error));
    }
    if eos {
        warn!("Camera /dev/video{} reached end of stream", device);
        return Ok(FrameRead::Closed);
    }
    trace!("No frame from /dev/video{} within the read timeout", device);
    Ok(FrameRead::Empty)
}

#[async_trait]
impl FrameSource for GstFrameSource {
    async fn read_frame(&mut self) -> Result<FrameRead> {
        if !self.open {
            return Ok(FrameRead::Closed);
        }
        if let Some(error) = &self.failed {
            return Err(device_failure(self.device, error));
        }

        let appsink = self.appsink.clone();
        let timeout = gstreamer::ClockTime::from_mseconds(self.read_timeout.as_millis() as u64);
        let sample = tokio::task::spawn_blocking(move || appsink.try_pull_sample(timeout))
            .await
            .map_err(|e| MotionCamError::frame_read(format!("Camera read task failed: {}", e)))?;

        let Some(sample) = sample else {
            let bus_error = self.pending_error();
            let eos = self.appsink.is_eos();
            return classify_missing_sample(self.device, &mut self.failed, bus_error, eos);
        };

        let buffer = sample
            .buffer()
            .ok_or_else(|| MotionCamError::frame_read("No buffer in sample"))?;
        let caps = sample
            .caps()
            .ok_or_else(|| MotionCamError::frame_read("No caps in sample"))?;
        let video_info = VideoInfo::from_caps(caps)
            .map_err(|e| MotionCamError::frame_read(format!("Failed to get video info: {}", e)))?;
        let map = buffer
            .map_readable()
            .map_err(|e| MotionCamError::frame_read(format!("Failed to map buffer: {}", e)))?;

        let frame_id = self.frame_counter;
        self.frame_counter += 1;

        trace!(
            "Captured frame {} ({}x{}, {} bytes)",
            frame_id,
            video_info.width(),
            video_info.height(),
            map.len()
        );

        Ok(FrameRead::Frame(FrameData::new(
            frame_id,
            SystemTime::now(),
            map.as_slice().to_vec(),
            video_info.width(),
            video_info.height(),
            FrameFormat::Rgb24,
        )))
    }

    fn is_open(&self) -> bool {
        self.open && self.failed.is_none()
    }

    fn close(&mut self) {
        if let Err(e) = self.pipeline.set_state(gstreamer::State::Null) {
            warn!("Failed to stop camera pipeline cleanly: {}", e);
        }
        self.open = false;
        info!("Camera /dev/video{} released", self.device);
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}
