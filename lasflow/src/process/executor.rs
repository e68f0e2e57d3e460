//! Running external tools.

use super::CommandLine;
use crate::cancellation::CancellationToken;
use crate::errors::LasflowError;
use crate::events::EventSink;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, warn};

/// What a finished process left behind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessOutput {
    /// Exit code; `None` if the process was terminated by a signal.
    pub exit_code: Option<i32>,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

impl ProcessOutput {
    /// Creates an output with the given exit code and no captured text.
    #[must_use]
    pub fn with_exit_code(exit_code: i32) -> Self {
        Self {
            exit_code: Some(exit_code),
            ..Self::default()
        }
    }

    /// Returns true if the process exited with status 0.
    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Runs one external command to completion.
///
/// Implementations must return [`LasflowError::Cancelled`] when the token
/// fires while the command is running, after making a best effort to stop
/// the process. Output lines may be forwarded to `sink` as `stage.output`
/// events while the process runs.
#[async_trait]
pub trait ProcessExecutor: Send + Sync {
    /// Executes the command.
    async fn execute(
        &self,
        command: &CommandLine,
        token: &CancellationToken,
        sink: &dyn EventSink,
    ) -> Result<ProcessOutput, LasflowError>;
}

/// Executor backed by `tokio::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioProcessExecutor;

impl TokioProcessExecutor {
    /// Creates a new executor.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ProcessExecutor for TokioProcessExecutor {
    async fn execute(
        &self,
        command: &CommandLine,
        token: &CancellationToken,
        sink: &dyn EventSink,
    ) -> Result<ProcessOutput, LasflowError> {
        if token.is_cancelled() {
            return Err(LasflowError::cancelled(token.reason().unwrap_or_default()));
        }

        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(ref dir) = command.current_dir {
            cmd.current_dir(dir);
        }

        debug!(command = %command, "Spawning process");
        let mut child = cmd.spawn()?;
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let finished = {
            let collect = async {
                tokio::join!(
                    drain(stdout, "stdout", sink),
                    drain(stderr, "stderr", sink),
                    child.wait(),
                )
            };
            until_cancelled(collect, token).await
        };

        match finished {
            Some((stdout, stderr, status)) => Ok(ProcessOutput {
                exit_code: status?.code(),
                stdout: stdout?,
                stderr: stderr?,
            }),
            None => {
                if let Err(e) = child.kill().await {
                    warn!(error = %e, command = %command, "Failed to kill cancelled process");
                }
                Err(LasflowError::cancelled(token.reason().unwrap_or_default()))
            }
        }
    }
}

/// Runs `work` unless the token fires first. A result that is ready when
/// the token fires still wins.
async fn until_cancelled<F: Future>(work: F, token: &CancellationToken) -> Option<F::Output> {
    tokio::select! {
        biased;
        outcome = work => Some(outcome),
        () = token.cancelled() => None,
    }
}

/// Reads a child stream line by line, forwarding each line to the sink.
async fn drain<R>(
    reader: Option<R>,
    stream: &'static str,
    sink: &dyn EventSink,
) -> std::io::Result<String>
where
    R: AsyncRead + Unpin,
{
    let Some(reader) = reader else {
        return Ok(String::new());
    };

    let mut reader = BufReader::new(reader);
    let mut captured = String::new();
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }
        let line = String::from_utf8_lossy(&buf);
        let line = line.trim_end_matches(['\r', '\n']);
        sink.emit(
            "stage.output",
            Some(serde_json::json!({"stream": stream, "line": line})),
        );
        captured.push_str(line);
        captured.push('\n');
    }
    Ok(captured)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::events::CollectingEventSink;
    use std::sync::Arc;
    use std::time::Duration;

    fn sh(script: &str) -> CommandLine {
        CommandLine::new("/bin/sh").args(["-c", script])
    }

    #[tokio::test]
    async fn test_captures_output_and_exit_code() {
        let sink = CollectingEventSink::new();
        let token = CancellationToken::new();

        let output = TokioProcessExecutor::new()
            .execute(&sh("echo tiling; echo 'WARNING: empty' >&2; exit 3"), &token, &sink)
            .await
            .unwrap();

        assert_eq!(output.exit_code, Some(3));
        assert!(!output.success());
        assert_eq!(output.stdout, "tiling\n");
        assert_eq!(output.stderr, "WARNING: empty\n");
        assert_eq!(sink.events_of_type("stage.output").len(), 2);
    }

    #[tokio::test]
    async fn test_runs_in_current_dir() {
        let dir = tempfile::tempdir().unwrap();
        let command = sh("pwd").with_current_dir(dir.path());

        let output = TokioProcessExecutor::new()
            .execute(&command, &CancellationToken::new(), &CollectingEventSink::new())
            .await
            .unwrap();

        assert!(output.success());
        let reported = std::fs::canonicalize(output.stdout.trim()).unwrap();
        assert_eq!(reported, std::fs::canonicalize(dir.path()).unwrap());
    }

    #[tokio::test]
    async fn test_missing_program_is_io_error() {
        let result = TokioProcessExecutor::new()
            .execute(
                &CommandLine::new("/nonexistent/lastile"),
                &CancellationToken::new(),
                &CollectingEventSink::new(),
            )
            .await;

        assert!(matches!(result, Err(LasflowError::Io(_))));
    }

    #[tokio::test]
    async fn test_finished_work_wins_over_cancellation() {
        let token = CancellationToken::new();
        token.cancel("late abort");

        assert_eq!(until_cancelled(std::future::ready(0), &token).await, Some(0));
        assert_eq!(
            until_cancelled(std::future::pending::<i32>(), &token).await,
            None
        );
    }

    #[tokio::test]
    async fn test_cancellation_kills_running_process() {
        let token = Arc::new(CancellationToken::new());
        let canceller = {
            let token = token.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                token.cancel("user abort");
            })
        };

        let started = std::time::Instant::now();
        let result = TokioProcessExecutor::new()
            .execute(&sh("sleep 30"), &token, &CollectingEventSink::new())
            .await;
        canceller.await.unwrap();

        assert!(matches!(result, Err(LasflowError::Cancelled(ref r)) if r == "user abort"));
        assert!(started.elapsed() < Duration::from_secs(10));
    }
}
