mod controller;
mod state;

pub use controller::{DetectionController, TriggerDecision};
pub use state::{DetectionState, Phase};
