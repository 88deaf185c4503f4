use super::types::{ShutdownReason, ShutdownSignal};
use crate::error::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use std::time::Duration;
use tokio::task::{self, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Keys that stop the analysis loop
pub fn is_stop_key(code: KeyCode) -> bool {
    matches!(code, KeyCode::Enter | KeyCode::Char('q') | KeyCode::Esc)
}

/// Stops the application when Enter, `q` or Esc is pressed on the terminal
pub struct KeyboardInputHandler {
    shutdown: ShutdownSignal,
    cancellation_token: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl KeyboardInputHandler {
    pub fn new(shutdown: ShutdownSignal) -> Self {
        // Stops on its own `stop()` or when the app shuts down for any reason
        let cancellation_token = shutdown.token().child_token();
        Self {
            shutdown,
            cancellation_token,
            task: None,
        }
    }

    /// Start listening for keyboard input
    pub fn start(&mut self) -> Result<()> {
        info!("Press Enter, q or Esc to stop");

        let shutdown = self.shutdown.clone();
        let cancellation_token = self.cancellation_token.clone();

        // crossterm polling blocks, keep it off the runtime workers
        self.task = Some(task::spawn_blocking(move || {
            if let Err(e) = enable_raw_mode() {
                error!("Failed to enable raw mode for keyboard input: {}", e);
                return;
            }
            debug!("Raw mode enabled - keyboard handler active");

            while !cancellation_token.is_cancelled() {
                match event::poll(Duration::from_millis(100)) {
                    Ok(true) => {
                        let Ok(Event::Key(key_event)) = event::read() else {
                            continue;
                        };
                        if key_event.kind != KeyEventKind::Press {
                            continue;
                        }

                        if is_stop_key(key_event.code) {
                            info!("Stop key pressed - requesting shutdown");
                            shutdown.request(ShutdownReason::UserRequest);
                            break;
                        }
                        debug!("Key pressed: {:?}", key_event.code);
                    }
                    Ok(false) => {}
                    Err(e) => {
                        warn!("Error polling for keyboard events: {}", e);
                    }
                }
            }

            if let Err(e) = disable_raw_mode() {
                error!("Failed to disable raw mode: {}", e);
            } else {
                debug!("Raw mode disabled");
            }
        }));

        Ok(())
    }

    /// Stop the keyboard input handler and restore the terminal
    pub async fn stop(&mut self) -> Result<()> {
        info!("Stopping keyboard input handler");
        self.cancellation_token.cancel();

        if let Some(task) = self.task.take() {
            if tokio::time::timeout(Duration::from_millis(500), task)
                .await
                .is_err()
            {
                warn!("Keyboard handler did not exit in time");
            }
        }

        // The task may not have reached its own cleanup
        let _ = disable_raw_mode();
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}
