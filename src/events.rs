use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::SystemTime;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Events published by the motion engine for observers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MotionEvent {
    /// A frame's motion score exceeded the threshold and a recording was triggered
    MotionDetected {
        score: u64,
        threshold: u64,
        timestamp: SystemTime,
    },
    /// A recording task was spawned
    RecordingStarted { path: PathBuf, timestamp: SystemTime },
    /// A recording task ended, successfully or not
    RecordingFinished {
        path: PathBuf,
        frames_written: u64,
        completed: bool,
        reason: Option<String>,
    },
    /// The analysis loop was asked to stop
    ShutdownRequested { reason: String, timestamp: SystemTime },
}

impl MotionEvent {
    /// Get a human-readable description of the event
    pub fn description(&self) -> String {
        match self {
            MotionEvent::MotionDetected {
                score, threshold, ..
            } => format!("Motion detected: noise {} > threshold {}", score, threshold),
            MotionEvent::RecordingStarted { path, .. } => {
                format!("Recording started: {}", path.display())
            }
            MotionEvent::RecordingFinished {
                path,
                frames_written,
                completed,
                reason,
            } => {
                if *completed {
                    format!("Video recorded: {} ({} frames)", path.display(), frames_written)
                } else {
                    format!(
                        "Recording aborted: {} ({} frames, {})",
                        path.display(),
                        frames_written,
                        reason.as_deref().unwrap_or("unknown reason")
                    )
                }
            }
            MotionEvent::ShutdownRequested { reason, .. } => {
                format!("Shutdown requested: {}", reason)
            }
        }
    }

    /// Get the event type as a string for filtering
    pub fn event_type(&self) -> &'static str {
        match self {
            MotionEvent::MotionDetected { .. } => "motion_detected",
            MotionEvent::RecordingStarted { .. } => "recording_started",
            MotionEvent::RecordingFinished { .. } => "recording_finished",
            MotionEvent::ShutdownRequested { .. } => "shutdown_requested",
        }
    }
}

/// Broadcast event bus; events are fire-and-forget and never persisted
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<MotionEvent>,
}

impl EventBus {
    /// Create a new event bus with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to events and get a receiver
    pub fn subscribe(&self) -> broadcast::Receiver<MotionEvent> {
        self.sender.subscribe()
    }

    /// Publish an event, returning the number of receivers it reached
    pub fn publish(&self, event: MotionEvent) -> usize {
        match &event {
            MotionEvent::RecordingFinished {
                completed: false, ..
            } => warn!("{}", event.description()),
            MotionEvent::ShutdownRequested { .. } => info!("{}", event.description()),
            _ => debug!("Publishing event: {}", event.description()),
        }

        // No subscribers is not an error
        self.sender.send(event).unwrap_or(0)
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_and_receive() {
        let bus = EventBus::new(8);
        let mut receiver = bus.subscribe();

        let delivered = bus.publish(MotionEvent::MotionDetected {
            score: 150,
            threshold: 100,
            timestamp: SystemTime::now(),
        });
        assert_eq!(delivered, 1);

        let event = receiver.recv().await.unwrap();
        assert_eq!(event.event_type(), "motion_detected");
        assert!(event.description().contains("150"));
    }

    #[test]
    fn test_publish_without_subscribers() {
        let bus = EventBus::new(8);
        assert_eq!(bus.subscriber_count(), 0);

        let delivered = bus.publish(MotionEvent::ShutdownRequested {
            reason: "test".to_string(),
            timestamp: SystemTime::now(),
        });
        assert_eq!(delivered, 0);
    }

    #[test]
    fn test_aborted_description_includes_reason() {
        let event = MotionEvent::RecordingFinished {
            path: PathBuf::from("/tmp/clip.mjpeg"),
            frames_written: 3,
            completed: false,
            reason: Some("frame source closed".to_string()),
        };
        assert!(event.description().contains("frame source closed"));
    }
}
