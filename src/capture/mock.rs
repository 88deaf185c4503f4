use super::encode::{EncoderFactory, EncoderSettings, VideoEncoder};
use crate::error::{MotionCamError, Result};
use crate::frame::FrameData;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

/// Counters shared between a `SpyEncoderFactory` and the encoders it opens
#[derive(Debug, Default)]
pub struct SpyCounters {
    pub opened: AtomicUsize,
    pub closed: AtomicUsize,
    pub active: AtomicUsize,
    pub max_active: AtomicUsize,
    pub frames: AtomicU64,
    pub paths: Mutex<Vec<PathBuf>>,
}

impl SpyCounters {
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    pub fn frames(&self) -> u64 {
        self.frames.load(Ordering::SeqCst)
    }
}

/// Encoder factory that records calls instead of writing files
#[derive(Default)]
pub struct SpyEncoderFactory {
    counters: Arc<SpyCounters>,
    fail_open: bool,
    fail_write_after: Option<u64>,
}

impl SpyEncoderFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `open` fails
    pub fn failing_open() -> Self {
        Self {
            fail_open: true,
            ..Self::default()
        }
    }

    /// Each encoder fails its write after `frames` successful writes
    pub fn fail_write_after(mut self, frames: u64) -> Self {
        self.fail_write_after = Some(frames);
        self
    }

    pub fn counters(&self) -> Arc<SpyCounters> {
        Arc::clone(&self.counters)
    }
}

impl EncoderFactory for SpyEncoderFactory {
    fn open(&self, path: &Path, _settings: &EncoderSettings) -> Result<Box<dyn VideoEncoder>> {
        if self.fail_open {
            return Err(MotionCamError::EncoderOpen {
                path: path.display().to_string(),
                details: "spy configured to fail".to_string(),
            });
        }

        self.counters.opened.fetch_add(1, Ordering::SeqCst);
        let active = self.counters.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters.max_active.fetch_max(active, Ordering::SeqCst);
        self.counters.paths.lock().push(path.to_path_buf());

        Ok(Box::new(SpyEncoder {
            counters: Arc::clone(&self.counters),
            fail_write_after: self.fail_write_after,
            written: 0,
        }))
    }

    fn extension(&self) -> &str {
        "spy"
    }
}

struct SpyEncoder {
    counters: Arc<SpyCounters>,
    fail_write_after: Option<u64>,
    written: u64,
}

impl VideoEncoder for SpyEncoder {
    fn write_frame(&mut self, _frame: &FrameData) -> Result<()> {
        if self.fail_write_after.is_some_and(|limit| self.written >= limit) {
            return Err(MotionCamError::encoder("spy write failure"));
        }
        self.written += 1;
        self.counters.frames.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.counters.closed.fetch_add(1, Ordering::SeqCst);
        self.counters.active.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}
