use super::{ComponentState, MotionCamApp, ShutdownReason};
use tracing::debug;

impl MotionCamApp {
    /// Update component state
    pub async fn set_component_state(&self, component: &str, state: ComponentState) {
        let mut states = self.component_states.lock().await;
        states.insert(component.to_string(), state.clone());
        debug!("Component '{}' state changed to: {:?}", component, state);
    }

    pub async fn get_component_state(&self, component: &str) -> Option<ComponentState> {
        let states = self.component_states.lock().await;
        states.get(component).cloned()
    }

    /// Stop the analysis loop; the first recorded reason wins
    pub fn request_shutdown(&self, reason: ShutdownReason) {
        self.shutdown.request(reason);
    }

    pub fn shutdown_reason(&self) -> Option<ShutdownReason> {
        self.shutdown.reason()
    }
}
