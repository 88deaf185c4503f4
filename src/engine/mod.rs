use crate::analyzer::{MotionMask, MotionScore, NoiseMeter};
use crate::camera::SharedFrameSource;
use crate::capture::{
    EncoderFactory, EncoderSettings, RecordingCompletion, RecordingJob, RecordingOutcome,
};
use crate::config::{DetectionConfig, MotionCamConfig};
use crate::detection::{DetectionController, TriggerDecision};
use crate::error::{MotionCamError, Result};
use crate::events::{EventBus, MotionEvent};
use crate::frame::{FrameData, FrameRead};
use crate::preview::{PreviewImage, PreviewSink, CAMERA_WINDOW, MASK_WINDOW};
use chrono::Local;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};


/// Settings of the analysis loop that do not affect the trigger policy
#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub recording_dir: PathBuf,
    pub codec: String,
    pub show_camera: bool,
    pub show_mask: bool,
    /// Log every frame's noise value at info level
    pub debug: bool,
}

impl EngineOptions {
    pub fn from_config(config: &MotionCamConfig) -> Self {
        Self {
            recording_dir: config.recording_dir(),
            codec: config.recording.codec.clone(),
            show_camera: config.preview.show_camera,
            show_mask: config.preview.show_mask,
            debug: config.preview.debug,
        }
    }
}

/// Counters reported when the analysis loop stops
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineStats {
    pub frames_analyzed: u64,
    pub empty_reads: u64,
    pub recordings_started: u64,
    pub recordings_completed: u64,
    pub recordings_aborted: u64,
}

/// The analysis loop: reads frames, scores motion and hands recordings off to
/// background tasks while it keeps analyzing.
///
/// At most one recording task exists at a time. The loop owns the detection
/// controller, so every state transition happens on this task.
pub struct MotionEngine {
    config: DetectionConfig,
    options: EngineOptions,
    source: SharedFrameSource,
    analyzer: Box<dyn MotionMask>,
    encoders: Arc<dyn EncoderFactory>,
    preview: Option<Box<dyn PreviewSink>>,
    event_bus: EventBus,
    controller: DetectionController,
    completion_tx: mpsc::UnboundedSender<RecordingCompletion>,
    completion_rx: mpsc::UnboundedReceiver<RecordingCompletion>,
    active: Option<JoinHandle<()>>,
    next_job_id: u64,
    stats: EngineStats,
}

impl MotionEngine {
    pub fn new(
        config: DetectionConfig,
        options: EngineOptions,
        source: SharedFrameSource,
        analyzer: Box<dyn MotionMask>,
        encoders: Arc<dyn EncoderFactory>,
        event_bus: EventBus,
    ) -> Self {
        let controller = DetectionController::from_config(&config, Instant::now());
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();

        Self {
            config,
            options,
            source,
            analyzer,
            encoders,
            preview: None,
            event_bus,
            controller,
            completion_tx,
            completion_rx,
            active: None,
            next_job_id: 1,
            stats: EngineStats::default(),
        }
    }

    /// Attach a preview sink for the camera and mask windows
    pub fn with_preview(mut self, preview: Box<dyn PreviewSink>) -> Self {
        self.preview = Some(preview);
        self
    }

    /// Replace the trigger policy, e.g. to start with an open interval gate
    pub fn with_controller(mut self, controller: DetectionController) -> Self {
        self.controller = controller;
        self
    }

    pub fn controller(&self) -> &DetectionController {
        &self.controller
    }

    pub fn stats(&self) -> &EngineStats {
        &self.stats
    }

    /// Whether a recording task is in flight
    pub fn is_recording(&self) -> bool {
        self.active.is_some()
    }

    /// Analyze frames until `cancel` fires or the frame source fails.
    ///
    /// A recording still in flight when the loop stops is awaited before this
    /// returns, so its file is always finalized.
    pub async fn run(&mut self, cancel: CancellationToken) -> Result<EngineStats> {
        info!(
            "Motion detection running: threshold {}, interval {:?}, recording {:?}",
            self.config.threshold, self.config.time_interval, self.config.recording_duration
        );

        let outcome = self.analysis_loop(&cancel).await;
        self.await_in_flight().await;

        match outcome {
            Ok(()) => {
                info!(
                    "Motion detection stopped after {} frames, {} recordings",
                    self.stats.frames_analyzed, self.stats.recordings_started
                );
                Ok(self.stats.clone())
            }
            Err(e) => {
                error!("Motion detection stopped: {}", e);
                Err(e)
            }
        }
    }

    async fn analysis_loop(&mut self, cancel: &CancellationToken) -> Result<()> {
        loop {
            if cancel.is_cancelled() {
                debug!("Analysis loop cancelled");
                return Ok(());
            }

            self.collect_completions().await;

            match self.source.read_frame().await? {
                FrameRead::Frame(frame) => self.analyze(&frame),
                FrameRead::Empty => {
                    self.stats.empty_reads += 1;
                    trace!("No frame available");
                }
                FrameRead::Closed => {
                    return Err(MotionCamError::frame_read("frame source closed"));
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Analysis loop cancelled during poll delay");
                    return Ok(());
                }
                _ = tokio::time::sleep(self.config.poll_delay) => {}
            }
        }
    }

    fn analyze(&mut self, frame: &FrameData) {
        self.stats.frames_analyzed += 1;

        if self.options.show_camera {
            self.show(CAMERA_WINDOW, PreviewImage::Frame(frame));
        }

        let mask = match self.analyzer.apply(frame) {
            Ok(mask) => mask,
            Err(e) => {
                warn!("Skipping frame {}: {}", frame.id, e);
                return;
            }
        };

        if self.options.show_mask {
            self.show(MASK_WINDOW, PreviewImage::Mask(&mask));
        }

        let score = NoiseMeter::score(&mask);
        if self.options.debug {
            info!("Threshold: {} Noise: {}", self.controller.threshold(), score);
        } else {
            trace!("Frame {} noise {}", frame.id, score);
        }

        if self.controller.on_score_sample(score, Instant::now()) == TriggerDecision::Trigger {
            self.start_recording(score);
        }
    }

    fn show(&mut self, window: &str, image: PreviewImage<'_>) {
        if let Some(preview) = self.preview.as_mut() {
            if let Err(e) = preview.show(window, image) {
                warn!("Preview '{}' failed: {}", window, e);
            }
        }
    }

    fn start_recording(&mut self, score: MotionScore) {
        let job_id = self.next_job_id;
        self.next_job_id += 1;

        let settings = EncoderSettings {
            codec: self.options.codec.clone(),
            frame_rate: self.config.frame_rate,
            dimensions: self.source.dimensions(),
        };
        let job = RecordingJob::new(
            job_id,
            &self.options.recording_dir,
            self.encoders.extension(),
            Local::now(),
            self.config.recording_duration,
            settings,
        );

        self.event_bus.publish(MotionEvent::MotionDetected {
            score,
            threshold: self.controller.threshold(),
            timestamp: SystemTime::now(),
        });
        self.event_bus.publish(MotionEvent::RecordingStarted {
            path: job.destination.clone(),
            timestamp: SystemTime::now(),
        });

        let source = self.source.clone();
        let encoders = Arc::clone(&self.encoders);
        let completion_tx = self.completion_tx.clone();

        self.stats.recordings_started += 1;
        self.active = Some(tokio::spawn(async move {
            let result = job.run(source, encoders).await;
            let completion = RecordingCompletion {
                result,
                finished_at: Instant::now(),
            };
            if completion_tx.send(completion).is_err() {
                warn!("Recording finished after the analysis loop went away");
            }
        }));
    }

    /// Apply completions of recordings that finished since the last check
    async fn collect_completions(&mut self) {
        // Checked before draining: a finished task has always sent its completion
        let finished = self.active.as_ref().is_some_and(|task| task.is_finished());

        while let Ok(completion) = self.completion_rx.try_recv() {
            self.complete(completion);
        }

        // Still set means the task ended without reporting
        if finished {
            if let Some(task) = self.active.take() {
                self.join_task(task).await;
            }
        }
    }

    async fn await_in_flight(&mut self) {
        if let Some(task) = self.active.take() {
            info!("Waiting for the in-flight recording to finish");
            self.join_task(task).await;
        }
    }

    async fn join_task(&mut self, task: JoinHandle<()>) {
        match task.await {
            Ok(()) => {
                while let Ok(completion) = self.completion_rx.try_recv() {
                    self.complete(completion);
                }
            }
            Err(e) => self.abandon_task(e),
        }
    }

    fn abandon_task(&mut self, e: tokio::task::JoinError) {
        error!("Recording task failed: {}", e);
        self.stats.recordings_aborted += 1;
        self.controller.on_recording_complete(Instant::now());
    }

    fn complete(&mut self, completion: RecordingCompletion) {
        let RecordingCompletion {
            result,
            finished_at,
        } = completion;

        self.active = None;
        self.controller.on_recording_complete(finished_at);

        if result.is_completed() {
            self.stats.recordings_completed += 1;
        } else {
            self.stats.recordings_aborted += 1;
        }

        let reason = match &result.outcome {
            RecordingOutcome::Completed => None,
            RecordingOutcome::Aborted(reason) => Some(reason.to_string()),
        };
        self.event_bus.publish(MotionEvent::RecordingFinished {
            path: result.path,
            frames_written: result.frames_written,
            completed: reason.is_none(),
            reason,
        });
    }
}
