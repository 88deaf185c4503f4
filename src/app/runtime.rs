use super::{ComponentState, MotionCamApp, ShutdownReason, ShutdownSignal};
use crate::error::{MotionCamError, Result};
use tokio::signal;
use tracing::{error, info};

impl MotionCamApp {
    /// Run the analysis loop until a stop signal or a fatal source failure,
    /// then shut down. Returns the process exit code.
    pub async fn run(&mut self) -> Result<i32> {
        self.initialize().await?;
        Self::setup_signal_handlers(self.shutdown.clone());
        self.start_inputs().await?;

        let mut engine = self.engine.take().ok_or_else(|| {
            MotionCamError::system("Motion engine already consumed")
        })?;

        info!("Waiting for motion");
        self.set_component_state("engine", ComponentState::Running)
            .await;

        let outcome = engine.run(self.shutdown.token()).await;
        if let Err(e) = &outcome {
            self.set_component_state("engine", ComponentState::Failed)
                .await;
            self.request_shutdown(ShutdownReason::Error(e.to_string()));
        } else {
            self.set_component_state("engine", ComponentState::Stopped)
                .await;
        }

        if let Some(reason) = self.shutdown_reason() {
            info!("Shutdown initiated: {}", reason);
        }

        self.shutdown(outcome).await
    }

    /// Cancel the stop signal on SIGINT or SIGTERM
    fn setup_signal_handlers(shutdown: ShutdownSignal) {
        #[cfg(unix)]
        {
            let shutdown_sigterm = shutdown.clone();
            tokio::spawn(async move {
                let mut sigterm =
                    match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                        Ok(sigterm) => sigterm,
                        Err(e) => {
                            error!("Failed to register SIGTERM handler: {}", e);
                            return;
                        }
                    };
                if sigterm.recv().await.is_some() {
                    info!("Received SIGTERM signal");
                    shutdown_sigterm.request(ShutdownReason::Signal("SIGTERM".to_string()));
                }
            });
        }

        tokio::spawn(async move {
            if let Ok(()) = signal::ctrl_c().await {
                info!("Received SIGINT signal (Ctrl+C)");
                shutdown.request(ShutdownReason::Signal("SIGINT".to_string()));
            }
        });
    }
}
