//! Application entry point and builder pattern implementation.

use std::sync::Arc;

use crate::{config::Config, coordinator::SystemCoordinator};
use anyhow::Result;

/// Main application structure that owns the daemon's lifecycle.
///
/// # Example
///
/// ```no_run
/// use mirror_displayd::application::Application;
/// use mirror_displayd::config::Config;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::load(None)?;
/// let mut app = Application::builder()
///     .with_config(config)
///     .build()?;
///
/// app.run().await?;
/// # Ok(())
/// # }
/// ```
pub struct Application {
    pub coordinator: SystemCoordinator,
    config: Arc<Config>,
}

impl Application {
    /// Creates a new ApplicationBuilder for constructing Application instances.
    pub fn builder() -> ApplicationBuilder {
        ApplicationBuilder::new()
    }

    /// Runs the complete daemon lifecycle: initialize, start services, and run main loop.
    pub async fn run(&mut self) -> Result<()> {
        self.coordinator.initialize(self.config.clone()).await?;

        self.coordinator.start_all_services().await?;

        self.coordinator.run_main_loop().await?;

        Ok(())
    }
}

/// Builder for [`Application`].
pub struct ApplicationBuilder {
    config: Option<Config>,
}

impl ApplicationBuilder {
    fn new() -> Self {
        Self { config: None }
    }

    /// Sets the configuration for the application.
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Builds the Application instance with the provided configuration.
    pub fn build(self) -> Result<Application> {
        let config = self
            .config
            .ok_or_else(|| anyhow::anyhow!("Configuration is required"))?;

        Ok(Application {
            coordinator: SystemCoordinator::new(),
            config: Arc::new(config),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;

    #[test]
    fn build_requires_config() {
        assert!(Application::builder().build().is_err());
    }

    #[test]
    fn build_with_config() {
        let app = Application::builder()
            .with_config(test_config())
            .build()
            .unwrap();
        assert!(app.coordinator.running_services().is_empty());
    }
}
