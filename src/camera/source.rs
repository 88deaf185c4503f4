use crate::error::Result;
use crate::frame::FrameRead;
use async_trait::async_trait;

/// A capture device that yields frames on demand
#[async_trait]
pub trait FrameSource: Send {
    /// Read the next frame, blocking up to the source's own timeout.
    ///
    /// `Ok(FrameRead::Empty)` means nothing arrived this call and the source is
    /// still usable; `Err` means the source could not be read at all.
    async fn read_frame(&mut self) -> Result<FrameRead>;

    /// Whether the device is still open
    fn is_open(&self) -> bool;

    /// Release the device
    fn close(&mut self);

    /// Configured capture size (width, height)
    fn dimensions(&self) -> (u32, u32);
}
