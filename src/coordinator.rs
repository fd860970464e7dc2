//! System coordinator for managing service lifecycle and dependency injection.

use std::sync::Arc;

use anyhow::{Context, Result};
use log::{info, warn};

use crate::{
    app_context::AppState,
    config::Config,
    providers::{AppStateProvider, AsyncProvider, HttpServiceProvider, ServiceProvider},
    task_manager::TaskManager,
};

/// Manages the lifecycle of the daemon's services.
///
/// Builds the shared state, registers the service providers, starts them in
/// priority order and runs until a shutdown signal or a task failure.
pub struct SystemCoordinator {
    task_manager: TaskManager,
    shared_state: Option<Arc<AppState>>,
    service_providers: Vec<Box<dyn ServiceProvider>>,
}

impl Default for SystemCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemCoordinator {
    pub fn new() -> Self {
        Self {
            task_manager: TaskManager::new(),
            shared_state: None,
            service_providers: Vec::new(),
        }
    }

    /// Builds application state and registers all service providers.
    ///
    /// Fails when the HTTP listener cannot be bound.
    pub async fn initialize(&mut self, config: Arc<Config>) -> Result<()> {
        info!("Initializing SystemCoordinator...");

        let app_state_provider =
            AppStateProvider::new(config, self.task_manager.global_token.clone());
        let state = app_state_provider
            .provide()
            .await
            .context("Failed to initialize application state")?;
        self.shared_state = Some(state.clone());

        self.register_service_providers(state)
            .await
            .context("Failed to register service providers")?;

        info!("SystemCoordinator initialization completed");
        Ok(())
    }

    async fn register_service_providers(&mut self, state: Arc<AppState>) -> Result<()> {
        let mut providers: Vec<Box<dyn ServiceProvider>> =
            vec![Box::new(HttpServiceProvider::new(state).await?)];

        providers.sort_by_key(|b| std::cmp::Reverse(b.priority()));
        self.service_providers = providers;

        info!(
            "Registered {} service providers in priority order",
            self.service_providers.len()
        );
        Ok(())
    }

    /// Starts all registered services in priority order.
    ///
    /// Critical services must start successfully, while non-critical services
    /// can fail without stopping the system.
    pub async fn start_all_services(&mut self) -> Result<()> {
        for provider in &self.service_providers {
            let is_critical = provider.is_critical();

            match provider.start(&mut self.task_manager).await {
                Ok(()) => {
                    info!(
                        "Service '{}' started successfully (priority: {}, critical: {})",
                        provider.name(),
                        provider.priority(),
                        is_critical
                    );
                }
                Err(e) if is_critical => {
                    return Err(e).with_context(|| {
                        format!("Critical service '{}' failed to start", provider.name())
                    });
                }
                Err(e) => {
                    warn!(
                        "Non-critical service '{}' failed to start: {}",
                        provider.name(),
                        e
                    );
                }
            }
        }

        info!("All critical services started successfully");
        Ok(())
    }

    /// Waits for Ctrl+C, SIGTERM or a failed task, then shuts down.
    pub async fn run_main_loop(&mut self) -> Result<()> {
        let failure = self.task_manager.failure_token();
        info!("Starting main loop");

        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result.context("Failed to listen for shutdown signal")?;
                info!("Received Ctrl+C, initiating graceful shutdown...");
            }
            () = terminate_signal() => {
                info!("Received SIGTERM, initiating graceful shutdown...");
            }
            () = failure.cancelled() => {
                warn!("A service task failed, initiating shutdown...");
            }
        }

        self.shutdown().await
    }

    /// Performs graceful shutdown of all components.
    pub async fn shutdown(&mut self) -> Result<()> {
        info!("Initiating graceful shutdown...");

        let result = self.task_manager.shutdown_all().await;
        if let Err(e) = &result {
            log::error!("Error during task shutdown: {:#}", e);
        }

        info!("Shutdown complete");
        result
    }

    /// Shared state built during initialization.
    pub fn state(&self) -> Option<&Arc<AppState>> {
        self.shared_state.as_ref()
    }

    pub fn running_services(&self) -> Vec<&'static str> {
        self.service_providers.iter().map(|p| p.name()).collect()
    }
}

#[cfg(unix)]
async fn terminate_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            warn!("Failed to install SIGTERM handler: {e}");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate_signal() {
    std::future::pending::<()>().await;
}
