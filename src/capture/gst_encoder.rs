use super::encode::{EncoderFactory, EncoderSettings, VideoEncoder};
use crate::error::{MotionCamError, Result};
use crate::frame::{FrameData, FrameFormat};
use gstreamer::prelude::*;
use gstreamer::Pipeline;
use gstreamer_app::AppSrc;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Encoder pipeline fragments for a codec fourcc: (encoder, muxer, extension)
fn codec_elements(codec: &str) -> Option<(&'static str, &'static str, &'static str)> {
    match codec.to_ascii_uppercase().as_str() {
        "H264" | "AVC1" | "X264" => Some((
            "videoconvert ! video/x-raw,format=I420 ! \
             x264enc speed-preset=veryfast tune=zerolatency key-int-max=60 ! \
             video/x-h264,profile=high ! h264parse",
            "mp4mux faststart=true",
            "mp4",
        )),
        "MJPG" => Some(("videoconvert ! jpegenc", "avimux", "avi")),
        _ => None,
    }
}

/// GStreamer video encoder fed through an appsrc
pub struct GstVideoEncoder {
    pipeline: Pipeline,
    appsrc: AppSrc,
    path: PathBuf,
    dimensions: (u32, u32),
    frame_duration_ns: u64,
    frame_index: u64,
    closed: bool,
}

impl GstVideoEncoder {
    pub fn open(path: &Path, settings: &EncoderSettings) -> Result<Self> {
        let open_error = |details: String| MotionCamError::EncoderOpen {
            path: path.display().to_string(),
            details,
        };

        gstreamer::init()
            .map_err(|e| open_error(format!("Failed to initialize GStreamer: {}", e)))?;

        let (encoder, muxer, _) = codec_elements(&settings.codec)
            .ok_or_else(|| open_error(format!("Unsupported codec '{}'", settings.codec)))?;

        let (width, height) = settings.dimensions;
        let framerate_milli = (settings.frame_rate * 1000.0).round() as u64;
        let pipeline_desc = format!(
            "appsrc name=src format=time is-live=false \
             caps=video/x-raw,format=RGB,width={},height={},framerate={}/1000 ! \
             {} ! {} ! filesink location=\"{}\"",
            width,
            height,
            framerate_milli,
            encoder,
            muxer,
            path.to_string_lossy()
        );
        debug!("Encoder pipeline: {}", pipeline_desc);

        let pipeline = gstreamer::parse::launch(&pipeline_desc)
            .map_err(|e| open_error(format!("Failed to create pipeline: {}", e)))?
            .downcast::<Pipeline>()
            .map_err(|_| open_error("Failed to downcast to Pipeline".to_string()))?;

        let appsrc = pipeline
            .by_name("src")
            .ok_or_else(|| open_error("Failed to get appsrc element".to_string()))?
            .downcast::<AppSrc>()
            .map_err(|_| open_error("Failed to downcast to AppSrc".to_string()))?;

        pipeline
            .set_state(gstreamer::State::Playing)
            .map_err(|e| open_error(format!("Failed to start pipeline: {}", e)))?;

        info!(
            "Opened {} encoder at {} ({}x{} @ {} fps)",
            settings.codec,
            path.display(),
            width,
            height,
            settings.frame_rate
        );

        Ok(Self {
            pipeline,
            appsrc,
            path: path.to_path_buf(),
            dimensions: settings.dimensions,
            frame_duration_ns: (1_000_000_000.0 / settings.frame_rate) as u64,
            frame_index: 0,
            closed: false,
        })
    }
}

impl VideoEncoder for GstVideoEncoder {
    fn write_frame(&mut self, frame: &FrameData) -> Result<()> {
        if self.closed {
            return Err(MotionCamError::encoder("GStreamer encoder already closed"));
        }

        if (frame.width, frame.height) != self.dimensions {
            return Err(MotionCamError::encoder(format!(
                "Frame {} is {}x{}, encoder expects {}x{}",
                frame.id, frame.width, frame.height, self.dimensions.0, self.dimensions.1
            )));
        }

        let data = match frame.format {
            FrameFormat::Rgb24 => frame.data.to_vec(),
            FrameFormat::Gray8 => frame.to_rgb_image()?.into_raw(),
        };

        let mut buffer = gstreamer::Buffer::from_mut_slice(data);
        if let Some(buffer_ref) = buffer.get_mut() {
            buffer_ref.set_pts(gstreamer::ClockTime::from_nseconds(
                self.frame_index * self.frame_duration_ns,
            ));
            buffer_ref.set_duration(gstreamer::ClockTime::from_nseconds(self.frame_duration_ns));
        }

        self.appsrc
            .push_buffer(buffer)
            .map_err(|e| MotionCamError::encoder(format!("Failed to push buffer: {:?}", e)))?;

        self.frame_index += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let mut result = Ok(());
        if let Err(e) = self.appsrc.end_of_stream() {
            result = Err(MotionCamError::encoder(format!("Failed to signal EOS: {:?}", e)));
        } else if let Some(bus) = self.pipeline.bus() {
            for msg in bus.iter_timed(gstreamer::ClockTime::from_seconds(10)) {
                match msg.view() {
                    gstreamer::MessageView::Eos(..) => break,
                    gstreamer::MessageView::Error(err) => {
                        result = Err(MotionCamError::encoder(format!(
                            "Encoding error: {} ({})",
                            err.error(),
                            err.debug().unwrap_or_default()
                        )));
                        break;
                    }
                    _ => {}
                }
            }
        }

        if let Err(e) = self.pipeline.set_state(gstreamer::State::Null) {
            warn!("Failed to stop encoder pipeline cleanly: {}", e);
        }

        debug!(
            "Encoder for {} closed after {} frames",
            self.path.display(),
            self.frame_index
        );
        result
    }
}

/// Factory for `GstVideoEncoder`
pub struct GstEncoderFactory {
    codec: String,
}

impl GstEncoderFactory {
    pub fn new(codec: &str) -> Result<Self> {
        if codec_elements(codec).is_none() {
            return Err(MotionCamError::component(
                "video_encoder".to_string(),
                format!("Unsupported codec '{}'", codec),
            ));
        }
        Ok(Self {
            codec: codec.to_string(),
        })
    }
}

impl EncoderFactory for GstEncoderFactory {
    fn open(&self, path: &Path, settings: &EncoderSettings) -> Result<Box<dyn VideoEncoder>> {
        let settings = EncoderSettings {
            codec: self.codec.clone(),
            ..settings.clone()
        };
        Ok(Box::new(GstVideoEncoder::open(path, &settings)?))
    }

    fn extension(&self) -> &str {
        codec_elements(&self.codec)
            .map(|(_, _, extension)| extension)
            .unwrap_or("mp4")
    }
}
