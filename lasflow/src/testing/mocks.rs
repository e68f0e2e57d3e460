//! Scripted collaborators for running pipelines without the tool suite.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use crate::cancellation::CancellationToken;
use crate::errors::LasflowError;
use crate::events::EventSink;
use crate::process::{CommandLine, FileMatcher, ProcessExecutor, ProcessOutput};

#[derive(Debug, Clone)]
enum Script {
    Exit { code: i32, stdout: String, stderr: String },
    Hang,
    LaunchError(String),
}

/// An executor that records every command and answers from a script.
///
/// Calls are numbered from 1. Unscripted calls exit with status 0 and no
/// output.
#[derive(Debug, Default)]
pub struct ScriptedExecutor {
    script: Mutex<HashMap<usize, Script>>,
    cancel_after: Mutex<Option<usize>>,
    calls: Mutex<Vec<CommandLine>>,
}

impl ScriptedExecutor {
    /// Creates an executor where every call succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes call `call` exit with `code`.
    #[must_use]
    pub fn fail_at(self, call: usize, code: i32) -> Self {
        self.respond_at(call, code, "", format!("ERROR: scripted failure {code}"))
    }

    /// Scripts the exit code and output of call `call`.
    #[must_use]
    pub fn respond_at(
        self,
        call: usize,
        code: i32,
        stdout: impl Into<String>,
        stderr: impl Into<String>,
    ) -> Self {
        self.script.lock().insert(
            call,
            Script::Exit {
                code,
                stdout: stdout.into(),
                stderr: stderr.into(),
            },
        );
        self
    }

    /// Makes call `call` block until the token is cancelled.
    #[must_use]
    pub fn hang_at(self, call: usize) -> Self {
        self.script.lock().insert(call, Script::Hang);
        self
    }

    /// Makes call `call` fail to launch.
    #[must_use]
    pub fn launch_error_at(self, call: usize, message: impl Into<String>) -> Self {
        self.script.lock().insert(call, Script::LaunchError(message.into()));
        self
    }

    /// Cancels the token once call `call` has finished.
    #[must_use]
    pub fn cancel_after(self, call: usize) -> Self {
        *self.cancel_after.lock() = Some(call);
        self
    }

    /// Returns the number of calls made.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Returns every command received, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<CommandLine> {
        self.calls.lock().clone()
    }

    /// Returns the tool name of every command received, in order.
    #[must_use]
    pub fn invoked_tools(&self) -> Vec<String> {
        self.calls.lock().iter().map(CommandLine::tool_name).collect()
    }
}

#[async_trait]
impl ProcessExecutor for ScriptedExecutor {
    async fn execute(
        &self,
        command: &CommandLine,
        token: &CancellationToken,
        sink: &dyn EventSink,
    ) -> Result<ProcessOutput, LasflowError> {
        let call = {
            let mut calls = self.calls.lock();
            calls.push(command.clone());
            calls.len()
        };
        let script = self.script.lock().get(&call).cloned();

        let output = match script {
            Some(Script::Hang) => {
                token.cancelled().await;
                return Err(LasflowError::cancelled(
                    token.reason().unwrap_or_default(),
                ));
            }
            Some(Script::LaunchError(message)) => {
                return Err(LasflowError::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    message,
                )));
            }
            Some(Script::Exit {
                code,
                stdout,
                stderr,
            }) => ProcessOutput {
                exit_code: Some(code),
                stdout,
                stderr,
            },
            None => ProcessOutput::with_exit_code(0),
        };

        for line in output.stdout.lines() {
            sink.emit(
                "stage.output",
                Some(serde_json::json!({"stream": "stdout", "line": line})),
            );
        }

        if *self.cancel_after.lock() == Some(call) {
            token.cancel("scripted cancellation");
        }
        Ok(output)
    }
}

/// A matcher that pretends every pattern matches one file.
///
/// The file is the pattern with wildcards replaced, inside the directory.
/// Patterns registered with [`StubFileMatcher::empty`] match nothing.
#[derive(Debug, Default)]
pub struct StubFileMatcher {
    empty_patterns: Mutex<HashSet<String>>,
    queries: Mutex<Vec<String>>,
}

impl StubFileMatcher {
    /// Creates a matcher where every pattern matches.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `pattern` match no files.
    #[must_use]
    pub fn empty(self, pattern: impl Into<String>) -> Self {
        self.empty_patterns.lock().insert(pattern.into());
        self
    }

    /// Returns every pattern queried, in order.
    #[must_use]
    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().clone()
    }
}

impl FileMatcher for StubFileMatcher {
    fn matches(&self, directory: &Path, pattern: &str) -> Result<Vec<PathBuf>, LasflowError> {
        self.queries.lock().push(pattern.to_string());
        if self.empty_patterns.lock().contains(pattern) {
            return Ok(Vec::new());
        }
        Ok(vec![directory.join(pattern.replace(['*', '?'], "0"))])
    }
}
