use config::{Config, ConfigError, Environment, File, Map};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct MotionCamConfig {
    pub camera: CameraConfig,
    pub detection: DetectionSettings,
    pub recording: RecordingConfig,
    pub preview: PreviewConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CameraConfig {
    /// Camera device index (e.g., 0 for /dev/video0)
    #[serde(default = "default_camera_device")]
    pub device: u32,

    /// Resolution label: 480p, 720p, 1080p or 4k
    #[serde(default = "default_camera_resolution")]
    pub resolution: String,

    /// How long a single frame read may block
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DetectionSettings {
    /// Number of foreground pixels a frame must exceed to trigger
    #[serde(default = "default_threshold")]
    pub threshold: u64,

    /// Minimum seconds between the end of one recording and the next trigger
    #[serde(default = "default_time_interval_seconds")]
    pub time_interval_seconds: u64,

    /// Length of each recorded clip in seconds
    #[serde(default = "default_recording_duration_seconds")]
    pub recording_duration_seconds: u64,

    /// Delay between analysis iterations
    #[serde(default = "default_poll_delay_ms")]
    pub poll_delay_ms: u64,

    /// Gaussian blur sigma applied before background subtraction
    #[serde(default = "default_blur_sigma")]
    pub blur_sigma: f32,

    /// Per-pixel difference from the background that counts as foreground
    #[serde(default = "default_delta_threshold")]
    pub delta_threshold: u8,

    /// Background model learning rate (0, 1]
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RecordingConfig {
    /// Directory recorded clips are written to
    #[serde(default = "default_recording_path")]
    pub path: String,

    /// Encoder frame rate
    #[serde(default = "default_frame_rate")]
    pub frame_rate: f64,

    /// Codec fourcc passed to the encoder
    #[serde(default = "default_codec")]
    pub codec: String,

    /// Encoder backend: "gstreamer" or the untimed "mjpeg" fallback
    #[serde(default = "default_backend")]
    pub backend: String,

    /// JPEG quality for the mjpeg backend
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PreviewConfig {
    #[serde(default)]
    pub show_camera: bool,

    #[serde(default)]
    pub show_mask: bool,

    /// Report threshold and noise for every analysed frame
    #[serde(default)]
    pub debug: bool,

    /// Directory preview snapshots are written to
    #[serde(default = "default_preview_directory")]
    pub directory: String,
}

/// Standard capture resolutions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Resolution {
    P480,
    P720,
    P1080,
    K4,
}

impl Resolution {
    pub const DEFAULT: Resolution = Resolution::P480;

    /// Parse a resolution label, `None` when it is not one of the standard sizes
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "480p" => Some(Resolution::P480),
            "720p" => Some(Resolution::P720),
            "1080p" => Some(Resolution::P1080),
            "4k" => Some(Resolution::K4),
            _ => None,
        }
    }

    /// Parse a resolution label, falling back to 480p for unknown labels
    pub fn from_label_or_default(label: &str) -> Self {
        match Self::from_label(label) {
            Some(resolution) => resolution,
            None => {
                warn!(
                    "Unrecognized resolution '{}', falling back to {}",
                    label,
                    Self::DEFAULT.label()
                );
                Self::DEFAULT
            }
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Resolution::P480 => "480p",
            Resolution::P720 => "720p",
            Resolution::P1080 => "1080p",
            Resolution::K4 => "4k",
        }
    }

    /// Width and height in pixels
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            Resolution::P480 => (640, 480),
            Resolution::P720 => (1280, 720),
            Resolution::P1080 => (1920, 1080),
            Resolution::K4 => (3840, 2160),
        }
    }
}

/// Resolved, immutable view of the settings the detection core runs on
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionConfig {
    pub threshold: u64,
    pub time_interval: Duration,
    pub recording_duration: Duration,
    pub dimensions: (u32, u32),
    pub frame_rate: f64,
    pub poll_delay: Duration,
}

impl MotionCamConfig {
    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Self::load_with_env(path, None)
    }

    /// Load from `path`, overridden by `MOTIONCAM_` variables taken from
    /// `env_vars`, or from the process environment when `None`
    fn load_with_env<P: AsRef<Path>>(
        path: P,
        env_vars: Option<Map<String, String>>,
    ) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let settings = Config::builder()
            .set_default("camera.device", default_camera_device())?
            .set_default("camera.resolution", default_camera_resolution())?
            .set_default("camera.read_timeout_ms", default_read_timeout_ms() as i64)?
            .set_default("detection.threshold", default_threshold() as i64)?
            .set_default(
                "detection.time_interval_seconds",
                default_time_interval_seconds() as i64,
            )?
            .set_default(
                "detection.recording_duration_seconds",
                default_recording_duration_seconds() as i64,
            )?
            .set_default("detection.poll_delay_ms", default_poll_delay_ms() as i64)?
            .set_default("detection.blur_sigma", default_blur_sigma() as f64)?
            .set_default("detection.delta_threshold", default_delta_threshold() as i64)?
            .set_default("detection.learning_rate", default_learning_rate() as f64)?
            .set_default("recording.path", default_recording_path())?
            .set_default("recording.frame_rate", default_frame_rate())?
            .set_default("recording.codec", default_codec())?
            .set_default("recording.backend", default_backend())?
            .set_default("recording.jpeg_quality", default_jpeg_quality() as i64)?
            .set_default("preview.show_camera", false)?
            .set_default("preview.show_mask", false)?
            .set_default("preview.debug", false)?
            .set_default("preview.directory", default_preview_directory())?
            .add_source(File::with_name(&path_str).required(false))
            // Environment variables with MOTIONCAM_ prefix, e.g. MOTIONCAM_DETECTION__POLL_DELAY_MS
            .add_source(
                Environment::with_prefix("MOTIONCAM")
                    .prefix_separator("_")
                    .separator("__")
                    .source(env_vars),
            )
            .build()?;

        let config: MotionCamConfig = settings.try_deserialize()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config);

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.detection.recording_duration_seconds == 0 {
            return Err(ConfigError::Message(
                "Recording duration must be greater than 0".to_string(),
            ));
        }

        if self.detection.poll_delay_ms == 0 {
            return Err(ConfigError::Message(
                "Poll delay must be greater than 0".to_string(),
            ));
        }

        if !(self.detection.learning_rate > 0.0 && self.detection.learning_rate <= 1.0) {
            return Err(ConfigError::Message(
                "Learning rate must be within (0, 1]".to_string(),
            ));
        }

        if !(self.recording.frame_rate.is_finite() && self.recording.frame_rate > 0.0) {
            return Err(ConfigError::Message(
                "Recording frame rate must be greater than 0".to_string(),
            ));
        }

        if self.recording.path.trim().is_empty() {
            return Err(ConfigError::Message(
                "Recording path must not be empty".to_string(),
            ));
        }

        match self.recording.backend.as_str() {
            "mjpeg" | "gstreamer" => {}
            other => {
                return Err(ConfigError::Message(format!(
                    "Unknown recording backend '{}' (expected mjpeg or gstreamer)",
                    other
                )))
            }
        }

        // Unknown resolution labels are not an error; see Resolution::from_label_or_default
        Ok(())
    }

    /// Effective capture resolution after fallback
    pub fn resolution(&self) -> Resolution {
        Resolution::from_label_or_default(&self.camera.resolution)
    }

    pub fn recording_dir(&self) -> PathBuf {
        PathBuf::from(&self.recording.path)
    }

    /// Render the effective configuration as TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Message(e.to_string()))
    }

    /// Resolve the settings the detection core needs
    pub fn detection_config(&self) -> DetectionConfig {
        DetectionConfig {
            threshold: self.detection.threshold,
            time_interval: Duration::from_secs(self.detection.time_interval_seconds),
            recording_duration: Duration::from_secs(self.detection.recording_duration_seconds),
            dimensions: self.resolution().dimensions(),
            frame_rate: self.recording.frame_rate,
            poll_delay: Duration::from_millis(self.detection.poll_delay_ms),
        }
    }
}

impl Default for MotionCamConfig {
    fn default() -> Self {
        Self {
            camera: CameraConfig {
                device: default_camera_device(),
                resolution: default_camera_resolution(),
                read_timeout_ms: default_read_timeout_ms(),
            },
            detection: DetectionSettings {
                threshold: default_threshold(),
                time_interval_seconds: default_time_interval_seconds(),
                recording_duration_seconds: default_recording_duration_seconds(),
                poll_delay_ms: default_poll_delay_ms(),
                blur_sigma: default_blur_sigma(),
                delta_threshold: default_delta_threshold(),
                learning_rate: default_learning_rate(),
            },
            recording: RecordingConfig {
                path: default_recording_path(),
                frame_rate: default_frame_rate(),
                codec: default_codec(),
                backend: default_backend(),
                jpeg_quality: default_jpeg_quality(),
            },
            preview: PreviewConfig {
                show_camera: false,
                show_mask: false,
                debug: false,
                directory: default_preview_directory(),
            },
        }
    }
}

fn default_camera_device() -> u32 {
    0
}
fn default_camera_resolution() -> String {
    "480p".to_string()
}
fn default_read_timeout_ms() -> u64 {
    1000
}

fn default_threshold() -> u64 {
    15000
}
fn default_time_interval_seconds() -> u64 {
    5
}
fn default_recording_duration_seconds() -> u64 {
    1
}
fn default_poll_delay_ms() -> u64 {
    100
}
fn default_blur_sigma() -> f32 {
    3.0
}
fn default_delta_threshold() -> u8 {
    25
}
fn default_learning_rate() -> f32 {
    0.05
}

fn default_recording_path() -> String {
    "./recordings".to_string()
}
fn default_frame_rate() -> f64 {
    29.0
}
fn default_codec() -> String {
    "H264".to_string()
}
fn default_backend() -> String {
    "gstreamer".to_string()
}
fn default_jpeg_quality() -> u8 {
    85
}

fn default_preview_directory() -> String {
    "./preview".to_string()
}

/// Commented configuration file with every option at its default
pub const DEFAULT_CONFIG_TEMPLATE: &str = r#"[camera]
# Camera device index (e.g., 0 for /dev/video0)
device = 0
# Capture size: 480p, 720p, 1080p or 4k (anything else falls back to 480p)
resolution = "480p"
# How long a single frame read may block, in milliseconds
read_timeout_ms = 1000

[detection]
# Number of foreground pixels a frame needs to trigger a recording
threshold = 15000
# Minimum seconds between the end of one recording and the next trigger
time_interval_seconds = 5
# Length of each recording in seconds
recording_duration_seconds = 1
# Pause between analysed frames, in milliseconds
poll_delay_ms = 100
# Gaussian blur applied before background subtraction (0 disables)
blur_sigma = 3.0
# Difference from the background that marks a pixel as foreground
delta_threshold = 25
# Background model update rate, within (0, 1]
learning_rate = 0.05

[recording]
# Directory recordings are written to
path = "./recordings"
# Encoder frame rate
frame_rate = 29.0
# Codec fourcc used by the gstreamer backend: H264 or MJPG
codec = "H264"
# Encoder backend: gstreamer (H264/MP4) or mjpeg (JPEG frames only, no timing)
backend = "gstreamer"
# JPEG quality of the mjpeg backend
jpeg_quality = 85

[preview]
# Keep a snapshot of the latest camera frame
show_camera = false
# Keep a snapshot of the latest motion mask
show_mask = false
# Log threshold and noise for every analysed frame
debug = false
# Directory preview snapshots are written to
directory = "./preview"
"#;
