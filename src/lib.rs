pub mod analyzer;
pub mod app;
pub mod camera;
pub mod capture;
pub mod config;
pub mod detection;
pub mod engine;
pub mod error;
pub mod events;
pub mod frame;
pub mod preview;

pub use analyzer::{BackgroundSubtractor, MotionMask, MotionScore, NoiseMeter};
pub use app::{ComponentState, MotionCamApp, ShutdownReason, ShutdownSignal};
pub use camera::{FrameSource, SharedFrameSource};
pub use capture::{EncoderFactory, RecordingJob, RecordingOutcome, RecordingResult, VideoEncoder};
pub use config::{DetectionConfig, MotionCamConfig, Resolution};
pub use detection::{DetectionController, DetectionState, Phase, TriggerDecision};
pub use engine::{EngineOptions, EngineStats, MotionEngine};
pub use error::{AbortReason, MotionCamError, Result};
pub use events::{EventBus, MotionEvent};
pub use frame::{FrameData, FrameFormat, FrameRead};
pub use preview::{PreviewSink, SnapshotPreviewSink};
