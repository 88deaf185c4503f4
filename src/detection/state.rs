use tokio::time::Instant;

/// Controller phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Recording,
}

/// Mutable detection state, owned by a single `DetectionController`
#[derive(Debug, Clone)]
pub struct DetectionState {
    pub phase: Phase,
    /// Reset when a recording completes, not when it starts
    pub last_trigger_time: Instant,
}

impl DetectionState {
    pub fn new(now: Instant) -> Self {
        Self {
            phase: Phase::Idle,
            last_trigger_time: now,
        }
    }

    pub fn is_recording(&self) -> bool {
        self.phase == Phase::Recording
    }
}
