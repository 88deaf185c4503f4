use super::{ComponentState, MotionCamApp, ShutdownReason};
use crate::engine::EngineStats;
use crate::error::Result;
use crate::events::MotionEvent;
use std::time::SystemTime;
use tracing::{error, info};

impl MotionCamApp {
    /// Release everything the app owns after the analysis loop stopped.
    ///
    /// The engine has already awaited any in-flight recording, so closing the
    /// frame source here cannot cut a recording short. Returns 0 for a clean
    /// stop and 1 when the loop ended on an error.
    pub async fn shutdown(&mut self, outcome: Result<EngineStats>) -> Result<i32> {
        info!("Beginning graceful shutdown");

        let reason = self
            .shutdown_reason()
            .unwrap_or(ShutdownReason::Signal("shutdown".to_string()));
        self.event_bus.publish(MotionEvent::ShutdownRequested {
            reason: reason.to_string(),
            timestamp: SystemTime::now(),
        });
        self.shutdown.request(reason);

        let mut exit_code = match &outcome {
            Ok(stats) => {
                info!(
                    "Analyzed {} frames, recorded {} videos ({} aborted)",
                    stats.frames_analyzed, stats.recordings_completed, stats.recordings_aborted
                );
                0
            }
            Err(e) => {
                error!("Motion detection failed: {}", e);
                1
            }
        };

        if self.keyboard_enabled {
            if let Some(mut handler) = self.keyboard_handler.take() {
                self.set_component_state("keyboard", ComponentState::Stopping)
                    .await;
                if let Err(e) = handler.stop().await {
                    error!("Error stopping keyboard: {}", e);
                    exit_code = 1;
                }
                self.set_component_state("keyboard", ComponentState::Stopped)
                    .await;
            }
        }

        self.set_component_state("camera", ComponentState::Stopping)
            .await;
        self.source.close().await;
        self.set_component_state("camera", ComponentState::Stopped)
            .await;

        info!("Graceful shutdown completed with exit code: {}", exit_code);
        Ok(exit_code)
    }
}
