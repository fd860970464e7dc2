//! External actuators: out-of-process tools that change the display.
//!
//! Two seams live here. [`CommandRunner`] runs one external program under a
//! cancellation token and reports a typed [`ActuatorError`]. The
//! [`DisplayActuator`] trait is the set of display operations the
//! orchestration layer needs; [`XorgActuator`] implements it on top of a
//! `CommandRunner` with `xrandr` and `xdotool`.

pub mod process;
pub mod xorg;

use std::{fmt, time::Duration};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

pub use process::ProcessRunner;
pub use xorg::XorgActuator;

/// Failure of an external actuator invocation.
#[derive(Debug, thiserror::Error)]
pub enum ActuatorError {
    #[error("failed to start `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{program}` failed ({status}): {stderr}")]
    ExecutionFailed {
        program: String,
        /// Exit code, `None` when the process was killed by a signal.
        code: Option<i32>,
        status: String,
        stderr: String,
    },

    #[error("`{program}` was cancelled")]
    Cancelled { program: String },

    #[error("`{program}` timed out after {timeout:?}")]
    TimedOut { program: String, timeout: Duration },

    #[error(
        "expected exactly one window named {window_name:?}, found {}",
        .matches.len()
    )]
    AmbiguousTarget {
        window_name: String,
        matches: Vec<String>,
    },

    #[error("unexpected output from `{program}`: {output:?}")]
    InvalidOutput { program: String, output: String },
}

/// An external program invocation.
///
/// Built only from configuration and fixed verbs; request data never ends
/// up in here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    program: String,
    args: Vec<String>,
    envs: Vec<(String, String)>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            envs: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn envs(&self) -> &[(String, String)] {
        &self.envs
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, value) in &self.envs {
            write!(f, "{key}={value} ")?;
        }
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Runs a single external program.
///
/// Implementations must stop waiting as soon as `cancel` fires and report
/// [`ActuatorError::Cancelled`]; a non-zero exit is
/// [`ActuatorError::ExecutionFailed`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Runs `spec` to completion and returns its standard output.
    async fn output(
        &self,
        spec: &CommandSpec,
        cancel: &CancellationToken,
    ) -> Result<String, ActuatorError>;

    /// Runs `spec` to completion, discarding its standard output.
    async fn run(
        &self,
        spec: &CommandSpec,
        cancel: &CancellationToken,
    ) -> Result<(), ActuatorError> {
        self.output(spec, cancel).await.map(|_| ())
    }
}

/// Display operations used by the orchestration layer.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DisplayActuator: Send + Sync {
    /// Powers the output on with automatic mode and configured rotation.
    async fn turn_on(&self, cancel: &CancellationToken) -> Result<(), ActuatorError>;

    /// Powers the output off.
    async fn turn_off(&self, cancel: &CancellationToken) -> Result<(), ActuatorError>;

    /// Sends the refresh key to the single window matching the configured name.
    async fn refresh(&self, cancel: &CancellationToken) -> Result<(), ActuatorError>;
}
