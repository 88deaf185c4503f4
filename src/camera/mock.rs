use super::source::FrameSource;
use crate::error::{MotionCamError, Result};
use crate::frame::{FrameData, FrameFormat, FrameRead};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

/// Scriptable frame source for tests and dry runs.
///
/// Produces uniform gray frames paced by `frame_interval`, and can be told to
/// fail or hit end of stream after a number of frames.
pub struct MockFrameSource {
    width: u32,
    height: u32,
    frame_interval: Duration,
    fail_after: Option<u64>,
    end_after: Option<u64>,
    empty_every: Option<u64>,
    reads: u64,
    open: bool,
    exhausted: bool,
    frames_served: Arc<AtomicU64>,
    close_calls: Arc<AtomicUsize>,
}

impl MockFrameSource {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            frame_interval: Duration::ZERO,
            fail_after: None,
            end_after: None,
            empty_every: None,
            reads: 0,
            open: true,
            exhausted: false,
            frames_served: Arc::new(AtomicU64::new(0)),
            close_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Sleep this long on every read, like a camera delivering at a fixed rate
    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = interval;
        self
    }

    /// Return a read error once `frames` frames have been served
    pub fn fail_after(mut self, frames: u64) -> Self {
        self.fail_after = Some(frames);
        self
    }

    /// Report end of stream once `frames` frames have been served
    pub fn end_after(mut self, frames: u64) -> Self {
        self.end_after = Some(frames);
        self
    }

    /// Every `n`th read yields no frame
    pub fn with_empty_reads(mut self, n: u64) -> Self {
        self.empty_every = Some(n.max(1));
        self
    }

    /// Counter of frames handed out
    pub fn frames_served(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.frames_served)
    }

    /// Counter of `close()` invocations
    pub fn close_calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.close_calls)
    }
}

#[async_trait]
impl FrameSource for MockFrameSource {
    async fn read_frame(&mut self) -> Result<FrameRead> {
        if !self.is_open() {
            return Ok(FrameRead::Closed);
        }

        if !self.frame_interval.is_zero() {
            tokio::time::sleep(self.frame_interval).await;
        }

        self.reads += 1;
        let served = self.frames_served.load(Ordering::SeqCst);

        if self.fail_after.is_some_and(|limit| served >= limit) {
            return Err(MotionCamError::frame_read("mock device unreadable"));
        }

        if self.end_after.is_some_and(|limit| served >= limit) {
            self.exhausted = true;
            return Ok(FrameRead::Closed);
        }

        if self.empty_every.is_some_and(|n| self.reads % n == 0) {
            return Ok(FrameRead::Empty);
        }

        let id = self.frames_served.fetch_add(1, Ordering::SeqCst);
        let data = vec![128u8; (self.width * self.height) as usize];
        Ok(FrameRead::Frame(FrameData::new(
            id,
            SystemTime::now(),
            data,
            self.width,
            self.height,
            FrameFormat::Gray8,
        )))
    }

    fn is_open(&self) -> bool {
        self.open && !self.exhausted
    }

    fn close(&mut self) {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        self.open = false;
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}
