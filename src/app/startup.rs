use super::{ComponentState, MotionCamApp};
use crate::error::Result;
use tracing::{info, warn};

impl MotionCamApp {
    /// Register components and report the effective capture setup
    pub async fn initialize(&mut self) -> Result<()> {
        let mut states = self.component_states.lock().await;
        states.insert("camera".to_string(), ComponentState::Running);
        states.insert("engine".to_string(), ComponentState::Stopped);
        if self.keyboard_enabled {
            states.insert("keyboard".to_string(), ComponentState::Stopped);
        }
        drop(states);

        let (width, height) = self.source.dimensions();
        let detection = self.config.detection_config();
        info!(
            "Camera /dev/video{} started at {}x{} ({})",
            self.config.camera.device,
            width,
            height,
            self.config.resolution().label()
        );
        if (width, height) != detection.dimensions {
            warn!(
                "Camera delivers {}x{}, requested {}x{}",
                width, height, detection.dimensions.0, detection.dimensions.1
            );
        }
        info!(
            "Recording {}s clips at {} fps, at most one every {}s after the last one ends",
            detection.recording_duration.as_secs(),
            detection.frame_rate,
            detection.time_interval.as_secs()
        );

        Ok(())
    }

    /// Start the optional keyboard handler
    pub(super) async fn start_inputs(&mut self) -> Result<()> {
        if !self.keyboard_enabled {
            return Ok(());
        }

        self.set_component_state("keyboard", ComponentState::Starting)
            .await;
        if let Some(handler) = self.keyboard_handler.as_mut() {
            handler.start()?;
        }
        self.set_component_state("keyboard", ComponentState::Running)
            .await;
        Ok(())
    }
}
