use super::mask::MotionMask;
use super::noise::MotionScore;
use crate::error::Result;
use crate::frame::FrameData;
use image::{GrayImage, Luma};
use std::collections::VecDeque;

/// Motion mask that replays a fixed sequence of scores.
///
/// Each call returns a mask of the frame's size whose first `score` pixels are
/// foreground. Once the script runs out every mask is empty.
pub struct MockMotionMask {
    scores: VecDeque<MotionScore>,
    repeat_last: bool,
    last: MotionScore,
}

impl MockMotionMask {
    pub fn from_scores<I: IntoIterator<Item = MotionScore>>(scores: I) -> Self {
        Self {
            scores: scores.into_iter().collect(),
            repeat_last: false,
            last: 0,
        }
    }

    /// Keep returning the final score after the script is exhausted
    pub fn repeat_last(mut self) -> Self {
        self.repeat_last = true;
        self
    }
}

impl MotionMask for MockMotionMask {
    fn apply(&mut self, frame: &FrameData) -> Result<GrayImage> {
        let score = match self.scores.pop_front() {
            Some(score) => {
                self.last = score;
                score
            }
            None if self.repeat_last => self.last,
            None => 0,
        };

        let mut mask = GrayImage::new(frame.width, frame.height);
        for pixel in mask.pixels_mut().take(score as usize) {
            *pixel = Luma([255]);
        }
        Ok(mask)
    }
}
