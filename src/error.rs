use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MotionCamError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Camera device {device} unavailable: {details}")]
    DeviceUnavailable { device: String, details: String },

    #[error("Frame read failed: {details}")]
    FrameRead { details: String },

    #[error("Failed to open encoder for {path}: {details}")]
    EncoderOpen { path: String, details: String },

    #[error("Encoder error: {details}")]
    Encoder { details: String },

    #[error("Motion analysis error: {details}")]
    Analyzer { details: String },

    #[error("System error: {message}")]
    System { message: String },

    #[error("Component error in {component}: {message}")]
    Component { component: String, message: String },
}

impl MotionCamError {
    pub fn system<S: Into<String>>(message: S) -> Self {
        Self::System {
            message: message.into(),
        }
    }

    pub fn component<S: Into<String>>(component: S, message: S) -> Self {
        Self::Component {
            component: component.into(),
            message: message.into(),
        }
    }

    pub fn frame_read<S: Into<String>>(details: S) -> Self {
        Self::FrameRead {
            details: details.into(),
        }
    }

    pub fn encoder<S: Into<String>>(details: S) -> Self {
        Self::Encoder {
            details: details.into(),
        }
    }
}

/// Why a recording ended before its configured duration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbortReason {
    FrameReadFailure(String),
    SourceClosed,
    EncoderOpenFailure(String),
    EncoderWriteFailure(String),
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbortReason::FrameReadFailure(details) => write!(f, "frame read failed: {}", details),
            AbortReason::SourceClosed => write!(f, "frame source closed"),
            AbortReason::EncoderOpenFailure(details) => {
                write!(f, "encoder could not be opened: {}", details)
            }
            AbortReason::EncoderWriteFailure(details) => {
                write!(f, "encoder write failed: {}", details)
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, MotionCamError>;
