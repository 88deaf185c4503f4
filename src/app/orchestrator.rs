use super::keyboard_input::KeyboardInputHandler;
use super::types::{ComponentState, ShutdownSignal};
use crate::analyzer::{BackgroundSubtractor, MotionMask};
use crate::camera::{open_frame_source, FrameSource, SharedFrameSource};
use crate::capture::{encoder_factory, EncoderFactory};
use crate::config::MotionCamConfig;
use crate::engine::{EngineOptions, MotionEngine};
use crate::error::Result;
use crate::events::EventBus;
use crate::preview::SnapshotPreviewSink;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info};

/// Owns the frame source, the analysis engine and the stop signal, and runs
/// them through a new / run / shutdown lifecycle
pub struct MotionCamApp {
    pub(super) config: MotionCamConfig,
    pub(super) event_bus: EventBus,
    pub(super) source: SharedFrameSource,
    pub(super) engine: Option<MotionEngine>,
    pub(super) keyboard_handler: Option<KeyboardInputHandler>,
    pub(super) keyboard_enabled: bool,
    pub(super) component_states: Arc<Mutex<HashMap<String, ComponentState>>>,
    pub(super) shutdown: ShutdownSignal,
}

impl MotionCamApp {
    /// Open the camera and build the analysis pipeline from the configuration.
    /// Fails with `DeviceUnavailable` when the camera cannot be opened.
    pub async fn new(config: MotionCamConfig) -> Result<Self> {
        let source = open_frame_source(&config).map_err(|e| {
            error!("Failed to open camera: {}", e);
            e
        })?;
        let analyzer = Box::new(BackgroundSubtractor::from_settings(&config.detection));
        let encoders = encoder_factory(&config.recording)?;

        Self::with_collaborators(config, source, analyzer, encoders).await
    }

    /// Build the app around already constructed collaborators
    pub async fn with_collaborators(
        config: MotionCamConfig,
        source: Box<dyn FrameSource>,
        analyzer: Box<dyn MotionMask>,
        encoders: Arc<dyn EncoderFactory>,
    ) -> Result<Self> {
        let recording_dir = config.recording_dir();
        tokio::fs::create_dir_all(&recording_dir).await?;
        info!("Recordings are written to {}", recording_dir.display());

        let event_bus = EventBus::default();
        let source = SharedFrameSource::new(source);

        let mut engine = MotionEngine::new(
            config.detection_config(),
            EngineOptions::from_config(&config),
            source.clone(),
            analyzer,
            encoders,
            event_bus.clone(),
        );
        if config.preview.show_camera || config.preview.show_mask {
            engine = engine.with_preview(Box::new(SnapshotPreviewSink::new(
                &config.preview.directory,
            )?));
        }

        let shutdown = ShutdownSignal::new();
        let keyboard_handler = Some(KeyboardInputHandler::new(shutdown.clone()));

        Ok(Self {
            config,
            event_bus,
            source,
            engine: Some(engine),
            keyboard_handler,
            keyboard_enabled: false,
            component_states: Arc::new(Mutex::new(HashMap::new())),
            shutdown,
        })
    }

    /// Enable or disable the keyboard stop handler
    pub fn set_keyboard_enabled(&mut self, enabled: bool) {
        self.keyboard_enabled = enabled;
    }

    pub fn config(&self) -> &MotionCamConfig {
        &self.config
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Handle for stopping the app from outside, e.g. a test harness
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }
}
