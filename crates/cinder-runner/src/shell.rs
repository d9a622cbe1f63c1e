//! Shell-based step execution on the host.

use crate::runner::{RunnerConfig, StepContext, StepResult, StepRunner};
use async_trait::async_trait;
use cinder_core::run::{OutputLine, OutputStream};
use cinder_core::{Error, Result};
use std::collections::HashMap;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Shell runner for executing commands on the host.
pub struct ShellRunner {
    config: RunnerConfig,
}

impl ShellRunner {
    pub fn new(config: RunnerConfig) -> Self {
        Self { config }
    }
}

impl Default for ShellRunner {
    fn default() -> Self {
        Self::new(RunnerConfig::default())
    }
}

#[async_trait]
impl StepRunner for ShellRunner {
    async fn execute(
        &self,
        ctx: &StepContext,
        output_tx: mpsc::Sender<OutputLine>,
        cancel: &CancellationToken,
    ) -> Result<StepResult> {
        let start = std::time::Instant::now();

        info!(command = %ctx.command, workdir = %ctx.workdir.display(), "Executing shell command");

        // Resolved overlay on top of the inherited process environment
        let mut env_vars: HashMap<String, String> = std::env::vars().collect();
        env_vars.extend(ctx.env.clone());

        // Spawn the process
        let mut child = Command::new("sh")
            .arg("-c")
            .arg(&ctx.command)
            .current_dir(&ctx.workdir)
            .envs(&env_vars)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => Error::CommandNotFound(ctx.command.clone()),
                _ => Error::Io(e),
            })?;

        let stdout = child.stdout.take().ok_or_else(|| {
            Error::Internal("Failed to capture stdout of spawned process".to_string())
        })?;
        let stderr = child.stderr.take().ok_or_else(|| {
            Error::Internal("Failed to capture stderr of spawned process".to_string())
        })?;

        // Stream stdout
        let stdout_tx = output_tx.clone();
        let stdout_handle = tokio::spawn(async move {
            let reader = BufReader::new(stdout);
            let mut lines = reader.lines();
            let mut line_num = 0u32;

            while let Ok(Some(line)) = lines.next_line().await {
                line_num += 1;
                let output = OutputLine {
                    stream: OutputStream::Stdout,
                    content: line,
                    line_number: line_num,
                    timestamp: chrono::Utc::now(),
                };
                if stdout_tx.send(output).await.is_err() {
                    break;
                }
            }
        });

        // Stream stderr
        let stderr_tx = output_tx;
        let stderr_handle = tokio::spawn(async move {
            let reader = BufReader::new(stderr);
            let mut lines = reader.lines();
            let mut line_num = 0u32;

            while let Ok(Some(line)) = lines.next_line().await {
                line_num += 1;
                let output = OutputLine {
                    stream: OutputStream::Stderr,
                    content: line,
                    line_number: line_num,
                    timestamp: chrono::Utc::now(),
                };
                if stderr_tx.send(output).await.is_err() {
                    break;
                }
            }
        });

        let limit = ctx.timeout.or(self.config.default_timeout);
        let deadline = async {
            match limit {
                Some(duration) => tokio::time::sleep(duration).await,
                None => std::future::pending().await,
            }
        };

        // Wait for the process, reacting to timeout and cancellation
        let wait_result = tokio::select! {
            status = child.wait() => status,
            _ = deadline => {
                let seconds = limit.unwrap_or_default().as_secs();
                warn!(timeout_secs = seconds, "Command timed out, killing process");
                let _ = child.kill().await;
                let _ = stdout_handle.await;
                let _ = stderr_handle.await;
                return Err(Error::ExecutionTimeout { seconds });
            }
            _ = cancel.cancelled() => {
                info!("Cancellation requested, allowing process a grace period");
                if timeout(self.config.grace_period, child.wait()).await.is_err() {
                    warn!("Grace period elapsed, killing process");
                    let _ = child.kill().await;
                }
                let _ = stdout_handle.await;
                let _ = stderr_handle.await;
                return Err(Error::CancelledByRequest);
            }
        };

        // Wait for output streaming to complete
        let _ = stdout_handle.await;
        let _ = stderr_handle.await;

        let status = wait_result
            .map_err(|e| Error::Internal(format!("Failed to wait for process: {}", e)))?;

        let exit_code = match status.code() {
            Some(code) => code,
            None => {
                #[cfg(unix)]
                let reason = {
                    use std::os::unix::process::ExitStatusExt;
                    match status.signal() {
                        Some(signal) => format!("killed by signal {}", signal),
                        None => "terminated without exit code".to_string(),
                    }
                };
                #[cfg(not(unix))]
                let reason = "terminated without exit code".to_string();

                return Err(Error::AbnormalTermination { reason });
            }
        };

        let duration_ms = start.elapsed().as_millis() as u64;

        debug!(exit_code, duration_ms, "Command completed");

        Ok(StepResult {
            exit_code,
            success: exit_code == 0,
            duration_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::Duration;

    fn make_ctx(cmd: &str) -> StepContext {
        StepContext {
            command: cmd.to_string(),
            env: HashMap::new(),
            workdir: PathBuf::from("/tmp"),
            timeout: None,
        }
    }

    #[tokio::test]
    async fn test_shell_runner_success() {
        let runner = ShellRunner::default();
        let (tx, mut rx) = mpsc::channel(100);
        let cancel = CancellationToken::new();

        let result = runner
            .execute(&make_ctx("echo hello"), tx, &cancel)
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.exit_code, 0);

        let line = rx.recv().await.unwrap();
        assert_eq!(line.content, "hello");
        assert_eq!(line.stream, OutputStream::Stdout);
    }

    #[tokio::test]
    async fn test_shell_runner_failure() {
        let runner = ShellRunner::default();
        let (tx, _rx) = mpsc::channel(100);
        let cancel = CancellationToken::new();

        let result = runner
            .execute(&make_ctx("exit 3"), tx, &cancel)
            .await
            .unwrap();
        assert!(!result.success);
        assert_eq!(result.exit_code, 3);
    }

    #[tokio::test]
    async fn test_shell_runner_env_overlay() {
        let runner = ShellRunner::default();
        let (tx, mut rx) = mpsc::channel(100);
        let cancel = CancellationToken::new();

        let mut ctx = make_ctx("echo \"$CINDER_TEST_VAR\"");
        ctx.env
            .insert("CINDER_TEST_VAR".to_string(), "overlaid".to_string());

        let result = runner.execute(&ctx, tx, &cancel).await.unwrap();
        assert!(result.success);

        let line = rx.recv().await.unwrap();
        assert_eq!(line.content, "overlaid");
    }

    #[tokio::test]
    async fn test_shell_runner_timeout() {
        let runner = ShellRunner::new(RunnerConfig {
            default_timeout: None,
            grace_period: Duration::from_millis(100),
        });
        let (tx, _rx) = mpsc::channel(100);
        let cancel = CancellationToken::new();

        let mut ctx = make_ctx("sleep 30");
        ctx.timeout = Some(Duration::from_millis(200));

        let err = runner.execute(&ctx, tx, &cancel).await.unwrap_err();
        assert!(matches!(err, Error::ExecutionTimeout { .. }));
    }

    #[tokio::test]
    async fn test_shell_runner_cancellation() {
        let runner = ShellRunner::new(RunnerConfig {
            default_timeout: None,
            grace_period: Duration::from_millis(100),
        });
        let (tx, _rx) = mpsc::channel(100);
        let cancel = CancellationToken::new();

        let token = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            token.cancel();
        });

        let err = runner
            .execute(&make_ctx("sleep 30"), tx, &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::CancelledByRequest));
    }

    #[tokio::test]
    async fn test_missing_command_is_failed_step_not_error() {
        // `sh` reports a missing command as exit 127 from a process that
        // did run; spawn-level NotFound is the only CommandNotFound.
        let runner = ShellRunner::default();
        let (tx, _rx) = mpsc::channel(100);
        let cancel = CancellationToken::new();

        let result = runner
            .execute(&make_ctx("definitely-not-a-real-command-xyz"), tx, &cancel)
            .await
            .unwrap();
        assert!(!result.success);
        assert_eq!(result.exit_code, 127);
    }
}
