//! Last known display power state.

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// Power state of the controlled display.
///
/// Serialized as `{"on": <bool>}` on the HTTP interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayState {
    pub on: bool,
}

impl DisplayState {
    pub const ON: Self = Self { on: true };
    pub const OFF: Self = Self { on: false };
}

impl Default for DisplayState {
    /// The display is assumed to be on at startup; querying the real
    /// hardware state is not attempted.
    fn default() -> Self {
        Self::ON
    }
}

/// Lock-guarded record of the last committed [`DisplayState`].
///
/// Readers share the lock, a writer excludes everyone else. The lock is
/// only held while copying the value in or out.
#[derive(Debug, Default)]
pub struct DisplayStateStore {
    state: RwLock<DisplayState>,
}

impl DisplayStateStore {
    /// Creates a store holding `initial`.
    pub fn new(initial: DisplayState) -> Self {
        Self {
            state: RwLock::new(initial),
        }
    }

    /// Returns the current value.
    pub async fn read(&self) -> DisplayState {
        *self.state.read().await
    }

    /// Replaces the current value.
    pub async fn write(&self, new_state: DisplayState) {
        *self.state.write().await = new_state;
    }
}
