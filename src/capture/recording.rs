use super::encode::{EncoderFactory, EncoderGuard, EncoderSettings};
use crate::camera::SharedFrameSource;
use crate::error::AbortReason;
use crate::frame::FrameRead;
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info, trace, warn};

/// How a recording ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordingOutcome {
    Completed,
    Aborted(AbortReason),
}

/// Summary returned by a finished recording
#[derive(Debug, Clone)]
pub struct RecordingResult {
    pub job_id: u64,
    pub path: PathBuf,
    pub frames_written: u64,
    pub elapsed: Duration,
    pub outcome: RecordingOutcome,
}

impl RecordingResult {
    pub fn is_completed(&self) -> bool {
        self.outcome == RecordingOutcome::Completed
    }
}

/// Completion signal sent back to the analysis loop
#[derive(Debug, Clone)]
pub struct RecordingCompletion {
    pub result: RecordingResult,
    /// When the encoder was released
    pub finished_at: Instant,
}

/// One fixed-length recording triggered by motion
#[derive(Debug, Clone)]
pub struct RecordingJob {
    pub id: u64,
    pub triggered_at: DateTime<Local>,
    pub destination: PathBuf,
    pub duration: Duration,
    pub settings: EncoderSettings,
}

impl RecordingJob {
    pub fn new(
        id: u64,
        directory: &Path,
        extension: &str,
        triggered_at: DateTime<Local>,
        duration: Duration,
        settings: EncoderSettings,
    ) -> Self {
        Self {
            id,
            destination: Self::destination_for(directory, extension, &triggered_at),
            triggered_at,
            duration,
            settings,
        }
    }

    /// `<directory>/<YYYY-MM-DD-HH-MM-SS>.<extension>`
    pub fn destination_for(
        directory: &Path,
        extension: &str,
        triggered_at: &DateTime<Local>,
    ) -> PathBuf {
        directory.join(format!(
            "{}.{}",
            triggered_at.format("%Y-%m-%d-%H-%M-%S"),
            extension
        ))
    }

    /// Pull frames from the shared source into a new video file until the
    /// duration elapses or the source gives out. The encoder is released on
    /// every path before this returns.
    pub async fn run(
        self,
        source: SharedFrameSource,
        encoders: Arc<dyn EncoderFactory>,
    ) -> RecordingResult {
        let started = Instant::now();

        let encoder = match encoders.open(&self.destination, &self.settings) {
            Ok(encoder) => encoder,
            Err(e) => {
                error!(
                    "Recording {} could not open encoder for {}: {}",
                    self.id,
                    self.destination.display(),
                    e
                );
                return self.result(
                    0,
                    started.elapsed(),
                    RecordingOutcome::Aborted(AbortReason::EncoderOpenFailure(e.to_string())),
                );
            }
        };

        info!(
            "Recording {} started: {} for {:?}",
            self.id,
            self.destination.display(),
            self.duration
        );

        let mut guard = EncoderGuard::new(encoder, self.destination.clone());
        let empty_read_backoff = self.settings.frame_interval();
        let mut frames_written = 0u64;

        let mut outcome = loop {
            if started.elapsed() >= self.duration {
                break RecordingOutcome::Completed;
            }

            match source.read_frame().await {
                Ok(FrameRead::Frame(frame)) => {
                    if let Err(e) = guard.write_frame(&frame) {
                        break RecordingOutcome::Aborted(AbortReason::EncoderWriteFailure(
                            e.to_string(),
                        ));
                    }
                    frames_written += 1;
                    trace!("Recording {} wrote frame {}", self.id, frame.id);
                }
                Ok(FrameRead::Empty) => {
                    trace!("Recording {} got no frame this read", self.id);
                    tokio::time::sleep(empty_read_backoff).await;
                }
                Ok(FrameRead::Closed) => {
                    break RecordingOutcome::Aborted(AbortReason::SourceClosed);
                }
                Err(e) => {
                    let reason = AbortReason::FrameReadFailure(e.to_string());
                    break RecordingOutcome::Aborted(reason);
                }
            }
        };

        if let Err(e) = guard.finish() {
            warn!("Failed to finalize {}: {}", self.destination.display(), e);
            if outcome == RecordingOutcome::Completed {
                let reason = AbortReason::EncoderWriteFailure(e.to_string());
                outcome = RecordingOutcome::Aborted(reason);
            }
        }

        match &outcome {
            RecordingOutcome::Completed => info!(
                "Video recorded: {} ({} frames)",
                self.destination.display(),
                frames_written
            ),
            RecordingOutcome::Aborted(reason) => warn!(
                "Recording {} aborted after {} frames: {}",
                self.id, frames_written, reason
            ),
        }
        debug!("Recording {} ran for {:?}", self.id, started.elapsed());

        self.result(frames_written, started.elapsed(), outcome)
    }

    fn result(
        &self,
        frames_written: u64,
        elapsed: Duration,
        outcome: RecordingOutcome,
    ) -> RecordingResult {
        RecordingResult {
            job_id: self.id,
            path: self.destination.clone(),
            frames_written,
            elapsed,
            outcome,
        }
    }
}
