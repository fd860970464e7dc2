//! Application state provider for dependency injection.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::{app_context::AppState, config::Config, providers::traits::AsyncProvider};

/// Provider for creating the application state.
///
/// Wires the X11 actuator, the display state store and the controller
/// from the loaded configuration.
pub struct AppStateProvider {
    config: Arc<Config>,
    shutdown: CancellationToken,
}

impl AppStateProvider {
    /// Creates a new AppStateProvider.
    ///
    /// `shutdown` becomes the parent of every per-request token.
    pub const fn new(config: Arc<Config>, shutdown: CancellationToken) -> Self {
        Self { config, shutdown }
    }
}

#[async_trait]
impl AsyncProvider<Arc<AppState>> for AppStateProvider {
    async fn provide(&self) -> Result<Arc<AppState>> {
        self.config.validate()?;
        Ok(Arc::new(AppState::new(
            self.config.clone(),
            self.shutdown.clone(),
        )))
    }
}
