//! Application state shared by the request handlers.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::{
    actuator::{DisplayActuator, ProcessRunner, XorgActuator},
    config::Config,
    controller::DisplayController,
    display_state::{DisplayState, DisplayStateStore},
};

/// Shared application state.
///
/// Owns the display state store and the controller built on top of it.
/// Cloning is cheap; every field is reference counted.
#[derive(Clone)]
pub struct AppState {
    /// Immutable daemon configuration.
    pub config: Arc<Config>,
    /// Orchestration layer used by the HTTP interface.
    pub controller: DisplayController,
    /// Parent of every per-request cancellation token.
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Builds the state with the real X11 actuator.
    pub fn new(config: Arc<Config>, shutdown: CancellationToken) -> Self {
        let runner = ProcessRunner::new(config.command_timeout());
        let actuator = XorgActuator::new(config.clone(), runner);
        Self::with_actuator(config, Arc::new(actuator), shutdown)
    }

    /// Builds the state around an arbitrary actuator.
    pub fn with_actuator(
        config: Arc<Config>,
        actuator: Arc<dyn DisplayActuator>,
        shutdown: CancellationToken,
    ) -> Self {
        // The real display state is never queried; assume it is on.
        let store = Arc::new(DisplayStateStore::new(DisplayState::default()));

        Self {
            config,
            controller: DisplayController::new(store, actuator),
            shutdown,
        }
    }

    /// Token for a single request; fires on daemon shutdown or when dropped
    /// through its guard.
    pub fn request_token(&self) -> CancellationToken {
        self.shutdown.child_token()
    }
}
