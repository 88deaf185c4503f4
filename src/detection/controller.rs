use super::state::{DetectionState, Phase};
use crate::analyzer::MotionScore;
use crate::config::DetectionConfig;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Outcome of feeding one motion score to the controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerDecision {
    /// Start a recording; the controller is now in `Recording`
    Trigger,
    /// Score did not exceed the threshold
    BelowThreshold,
    /// A recording is in flight; the sample is dropped
    AlreadyRecording,
    /// The interval gate is still closed
    Cooldown { remaining: Duration },
}

/// Threshold and cooldown policy deciding when to record.
///
/// All state changes go through `on_score_sample` and
/// `on_recording_complete`, called from the analysis loop only.
pub struct DetectionController {
    threshold: MotionScore,
    time_interval: Duration,
    state: DetectionState,
    triggers: u64,
    completions: u64,
}

impl DetectionController {
    /// Create an idle controller whose interval gate starts counting at `now`
    pub fn new(threshold: MotionScore, time_interval: Duration, now: Instant) -> Self {
        Self {
            threshold,
            time_interval,
            state: DetectionState::new(now),
            triggers: 0,
            completions: 0,
        }
    }

    pub fn from_config(config: &DetectionConfig, now: Instant) -> Self {
        Self::new(config.threshold, config.time_interval, now)
    }

    /// Evaluate a score sample taken at `now`
    pub fn on_score_sample(&mut self, score: MotionScore, now: Instant) -> TriggerDecision {
        if score <= self.threshold {
            return TriggerDecision::BelowThreshold;
        }

        if self.state.phase == Phase::Recording {
            debug!(
                "Noise {} above threshold {} while recording; ignored",
                score, self.threshold
            );
            return TriggerDecision::AlreadyRecording;
        }

        let elapsed = now.saturating_duration_since(self.state.last_trigger_time);
        if elapsed <= self.time_interval {
            let remaining = self.time_interval - elapsed;
            debug!(
                "Noise {} above threshold {} but gate closed for another {:?}",
                score, self.threshold, remaining
            );
            return TriggerDecision::Cooldown { remaining };
        }

        info!(
            "Motion detected! Noise {} > threshold {}; recording video",
            score, self.threshold
        );
        self.state.phase = Phase::Recording;
        self.triggers += 1;
        TriggerDecision::Trigger
    }

    /// Return to `Idle` after the active recording finished at `finished_at`.
    /// Returns false when no recording was active.
    pub fn on_recording_complete(&mut self, finished_at: Instant) -> bool {
        if self.state.phase != Phase::Recording {
            warn!("Recording completion received while idle; ignored");
            return false;
        }

        self.state.phase = Phase::Idle;
        self.state.last_trigger_time = finished_at;
        self.completions += 1;
        debug!("Detection controller idle, interval gate restarted");
        true
    }

    pub fn state(&self) -> &DetectionState {
        &self.state
    }

    pub fn is_recording(&self) -> bool {
        self.state.is_recording()
    }

    pub fn threshold(&self) -> MotionScore {
        self.threshold
    }

    /// Number of `Idle -> Recording` transitions so far
    pub fn trigger_count(&self) -> u64 {
        self.triggers
    }

    /// Number of `Recording -> Idle` transitions so far
    pub fn completion_count(&self) -> u64 {
        self.completions
    }
}
