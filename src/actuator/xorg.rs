//! X11 display actuator driving `xrandr` and `xdotool`.

use std::sync::Arc;

use async_trait::async_trait;
use log::info;
use tokio_util::sync::CancellationToken;

use super::{ActuatorError, CommandRunner, CommandSpec, DisplayActuator};
use crate::config::Config;

const XRANDR: &str = "xrandr";
const XDOTOOL: &str = "xdotool";

/// Power/rotation through `xrandr`, window refresh through `xdotool`.
pub struct XorgActuator<R> {
    config: Arc<Config>,
    runner: R,
}

impl<R: CommandRunner> XorgActuator<R> {
    pub fn new(config: Arc<Config>, runner: R) -> Self {
        Self { config, runner }
    }

    fn xrandr(&self) -> CommandSpec {
        CommandSpec::new(XRANDR)
            .arg("--display")
            .arg(&self.config.display.display)
            .arg("--output")
            .arg(&self.config.display.output)
    }

    fn xdotool(&self) -> CommandSpec {
        CommandSpec::new(XDOTOOL).env("DISPLAY", &self.config.display.display)
    }

    /// Looks up the id of the one window matching the configured name.
    async fn find_target_window(
        &self,
        cancel: &CancellationToken,
    ) -> Result<String, ActuatorError> {
        let window_name = &self.config.refresh.window_name;
        let search = self.xdotool().arg("search").arg("--name").arg(window_name);

        let stdout = match self.runner.output(&search, cancel).await {
            Ok(stdout) => stdout,
            // xdotool reports "nothing found" as a bare exit status of 1.
            Err(ActuatorError::ExecutionFailed {
                code: Some(1),
                stderr,
                ..
            }) if stderr.is_empty() => String::new(),
            Err(e) => return Err(e),
        };

        let mut matches: Vec<String> = stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();

        if matches.len() != 1 {
            return Err(ActuatorError::AmbiguousTarget {
                window_name: window_name.clone(),
                matches,
            });
        }

        let window = matches.remove(0);
        if !window.chars().all(|c| c.is_ascii_digit()) {
            return Err(ActuatorError::InvalidOutput {
                program: XDOTOOL.to_string(),
                output: window,
            });
        }

        Ok(window)
    }
}

#[async_trait]
impl<R: CommandRunner> DisplayActuator for XorgActuator<R> {
    async fn turn_on(&self, cancel: &CancellationToken) -> Result<(), ActuatorError> {
        let spec = self
            .xrandr()
            .arg("--auto")
            .arg("--rotate")
            .arg(self.config.display.rotation.as_str());
        self.runner.run(&spec, cancel).await?;

        info!("Turned on display.");
        Ok(())
    }

    async fn turn_off(&self, cancel: &CancellationToken) -> Result<(), ActuatorError> {
        let spec = self.xrandr().arg("--off");
        self.runner.run(&spec, cancel).await?;

        info!("Turned off display.");
        Ok(())
    }

    async fn refresh(&self, cancel: &CancellationToken) -> Result<(), ActuatorError> {
        let window = self.find_target_window(cancel).await?;

        let key = self
            .xdotool()
            .arg("key")
            .arg("--window")
            .arg(window)
            .arg(&self.config.refresh.key);
        self.runner.run(&key, cancel).await?;

        info!("Refreshed {:?} window.", self.config.refresh.window_name);
        Ok(())
    }
}
