//! [`CommandRunner`] backed by real child processes.

use std::{io, process::Stdio, time::Duration};

use async_trait::async_trait;
use log::{debug, warn};
use tokio::{
    io::{AsyncRead, AsyncReadExt},
    process::{Child, Command},
};
use tokio_util::sync::CancellationToken;

use super::{ActuatorError, CommandRunner, CommandSpec};

/// How long a killed child gets to be reaped before we stop waiting.
const KILL_GRACE: Duration = Duration::from_secs(2);

/// Spawns external programs with `tokio::process`.
///
/// Every invocation is bounded by the runner's timeout as well as the
/// caller's cancellation token.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    timeout: Duration,
}

enum Outcome {
    Exited(io::Result<(std::process::ExitStatus, Vec<u8>, Vec<u8>)>),
    Cancelled,
    TimedOut,
}

impl ProcessRunner {
    pub const fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn output(
        &self,
        spec: &CommandSpec,
        cancel: &CancellationToken,
    ) -> Result<String, ActuatorError> {
        let program = spec.program().to_string();

        if cancel.is_cancelled() {
            return Err(ActuatorError::Cancelled { program });
        }

        debug!("Running: {spec}");

        let mut child = Command::new(spec.program())
            .args(spec.args())
            .envs(spec.envs().iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ActuatorError::Spawn {
                program: program.clone(),
                source,
            })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let outcome = tokio::select! {
            result = collect(&mut child, stdout, stderr) => Outcome::Exited(result),
            () = cancel.cancelled() => Outcome::Cancelled,
            () = tokio::time::sleep(self.timeout) => Outcome::TimedOut,
        };

        match outcome {
            Outcome::Exited(Ok((status, stdout, stderr))) => {
                if status.success() {
                    Ok(String::from_utf8_lossy(&stdout).into_owned())
                } else {
                    Err(ActuatorError::ExecutionFailed {
                        program,
                        code: status.code(),
                        status: status.to_string(),
                        stderr: String::from_utf8_lossy(&stderr).trim().to_string(),
                    })
                }
            }
            Outcome::Exited(Err(source)) => Err(ActuatorError::Spawn { program, source }),
            Outcome::Cancelled => {
                terminate(&mut child, &program).await;
                Err(ActuatorError::Cancelled { program })
            }
            Outcome::TimedOut => {
                terminate(&mut child, &program).await;
                Err(ActuatorError::TimedOut {
                    program,
                    timeout: self.timeout,
                })
            }
        }
    }
}

async fn collect(
    child: &mut Child,
    stdout: Option<impl AsyncRead + Unpin>,
    stderr: Option<impl AsyncRead + Unpin>,
) -> io::Result<(std::process::ExitStatus, Vec<u8>, Vec<u8>)> {
    let (status, stdout, stderr) = tokio::join!(child.wait(), drain(stdout), drain(stderr));
    Ok((status?, stdout?, stderr?))
}

async fn drain(pipe: Option<impl AsyncRead + Unpin>) -> io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        pipe.read_to_end(&mut buf).await?;
    }
    Ok(buf)
}

/// Best-effort kill and reap. Anything left over is killed again on drop.
async fn terminate(child: &mut Child, program: &str) {
    if let Err(e) = child.start_kill() {
        warn!("Failed to kill `{program}`: {e}");
        return;
    }

    match tokio::time::timeout(KILL_GRACE, child.wait()).await {
        Ok(Ok(status)) => debug!("`{program}` terminated ({status})"),
        Ok(Err(e)) => warn!("Failed to reap `{program}`: {e}"),
        Err(_) => warn!("`{program}` did not exit within {KILL_GRACE:?} after kill"),
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::time::Instant;

    fn runner() -> ProcessRunner {
        ProcessRunner::new(Duration::from_secs(5))
    }

    #[tokio::test]
    async fn output_returns_stdout() {
        let spec = CommandSpec::new("sh").arg("-c").arg("echo 12345");

        let out = runner()
            .output(&spec, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(out, "12345\n");
    }

    #[tokio::test]
    async fn output_passes_environment() {
        let spec = CommandSpec::new("sh")
            .arg("-c")
            .arg("printf %s \"$DISPLAY\"")
            .env("DISPLAY", ":7.0");

        let out = runner()
            .output(&spec, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(out, ":7.0");
    }

    #[tokio::test]
    async fn non_zero_exit_is_execution_failure() {
        let spec = CommandSpec::new("sh")
            .arg("-c")
            .arg("echo 'no such output' >&2; exit 3");

        let err = runner()
            .output(&spec, &CancellationToken::new())
            .await
            .unwrap_err();

        match err {
            ActuatorError::ExecutionFailed { code, stderr, .. } => {
                assert_eq!(code, Some(3));
                assert_eq!(stderr, "no such output");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn run_discards_stdout_and_keeps_failures() {
        let cancel = CancellationToken::new();
        let ok = CommandSpec::new("sh").arg("-c").arg("echo ignored");
        let failing = CommandSpec::new("sh").arg("-c").arg("exit 2");

        tokio_test::assert_ok!(runner().run(&ok, &cancel).await);
        let err = runner().run(&failing, &cancel).await.unwrap_err();
        assert!(matches!(
            err,
            ActuatorError::ExecutionFailed { code: Some(2), .. }
        ));
    }

    #[tokio::test]
    async fn missing_program_is_spawn_failure() {
        let spec = CommandSpec::new("/nonexistent/xrandr");

        let err = runner()
            .output(&spec, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ActuatorError::Spawn { .. }));
    }

    #[tokio::test]
    async fn cancellation_stops_long_running_process() {
        let spec = CommandSpec::new("sleep").arg("30");
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let start = Instant::now();
        let err = runner().output(&spec, &cancel).await.unwrap_err();

        assert!(matches!(err, ActuatorError::Cancelled { .. }));
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn already_cancelled_token_never_spawns() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = runner()
            .output(&CommandSpec::new("/nonexistent/xrandr"), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, ActuatorError::Cancelled { .. }));
    }

    #[tokio::test]
    async fn timeout_stops_long_running_process() {
        let runner = ProcessRunner::new(Duration::from_millis(50));
        let spec = CommandSpec::new("sleep").arg("30");

        let start = Instant::now();
        let err = runner
            .output(&spec, &CancellationToken::new())
            .await
            .unwrap_err();

        match err {
            ActuatorError::TimedOut { timeout, .. } => {
                assert_eq!(timeout, Duration::from_millis(50))
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(start.elapsed() < Duration::from_secs(5));
    }
}
