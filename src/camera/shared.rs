use super::source::FrameSource;
use crate::error::Result;
use crate::frame::FrameRead;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Frame source handle shared by the analysis loop and an in-flight recording.
///
/// Reads from both callers are serialized through a mutex so the underlying
/// device never sees concurrent reads. Only the lifecycle owner calls `close`.
#[derive(Clone)]
pub struct SharedFrameSource {
    inner: Arc<Mutex<Box<dyn FrameSource>>>,
    closed: Arc<AtomicBool>,
    dimensions: (u32, u32),
}

impl SharedFrameSource {
    pub fn new(source: Box<dyn FrameSource>) -> Self {
        let dimensions = source.dimensions();
        Self {
            inner: Arc::new(Mutex::new(source)),
            closed: Arc::new(AtomicBool::new(false)),
            dimensions,
        }
    }

    /// Read the next frame; a closed source reports `FrameRead::Closed`
    pub async fn read_frame(&self) -> Result<FrameRead> {
        if self.closed.load(Ordering::Acquire) {
            return Ok(FrameRead::Closed);
        }

        let mut source = self.inner.lock().await;
        if !source.is_open() {
            return Ok(FrameRead::Closed);
        }
        source.read_frame().await
    }

    pub async fn is_open(&self) -> bool {
        !self.closed.load(Ordering::Acquire) && self.inner.lock().await.is_open()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.dimensions
    }

    /// Release the underlying device. Only the first call reaches it.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            debug!("Frame source already closed");
            return;
        }

        info!("Closing frame source");
        self.inner.lock().await.close();
    }
}
