use crate::error::{MotionCamError, Result};
use crate::frame::FrameData;
use image::GrayImage;
use std::path::PathBuf;
use tracing::{debug, info};

pub const CAMERA_WINDOW: &str = "Motion Detection";
pub const MASK_WINDOW: &str = "Motion Mask";

/// Image handed to a preview sink
#[derive(Debug, Clone, Copy)]
pub enum PreviewImage<'a> {
    Frame(&'a FrameData),
    Mask(&'a GrayImage),
}

/// Displays frames and masks for a human operator
pub trait PreviewSink: Send {
    fn show(&mut self, window: &str, image: PreviewImage<'_>) -> Result<()>;
}

/// Keeps the latest image of each window as a JPEG snapshot in a directory
pub struct SnapshotPreviewSink {
    directory: PathBuf,
}

impl SnapshotPreviewSink {
    pub fn new<P: Into<PathBuf>>(directory: P) -> Result<Self> {
        let directory = directory.into();
        std::fs::create_dir_all(&directory)?;
        info!("Preview snapshots are written to {}", directory.display());
        Ok(Self { directory })
    }

    /// Snapshot path for a window name
    pub fn path_for(&self, window: &str) -> PathBuf {
        let slug: String = window
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_lowercase()
                } else {
                    '-'
                }
            })
            .collect();
        self.directory.join(format!("{}.jpg", slug))
    }
}

impl PreviewSink for SnapshotPreviewSink {
    fn show(&mut self, window: &str, image: PreviewImage<'_>) -> Result<()> {
        let path = self.path_for(window);
        let saved = match image {
            PreviewImage::Frame(frame) => frame.to_rgb_image()?.save(&path),
            PreviewImage::Mask(mask) => mask.save(&path),
        };
        saved.map_err(|e| {
            MotionCamError::component("preview".to_string(), format!("{}: {}", path.display(), e))
        })?;
        debug!("Updated preview {}", path.display());
        Ok(())
    }
}
