mod mask;
mod mock;
mod noise;

pub use mask::{BackgroundSubtractor, MotionMask};
pub use mock::MockMotionMask;
pub use noise::{MotionScore, NoiseMeter};
