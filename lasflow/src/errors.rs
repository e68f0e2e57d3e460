//! Error types for lasflow.
//!
//! Four terminal conditions stop a pipeline: a bad configuration detected
//! before any process starts, an input pattern that selects nothing, an
//! external tool that reports failure, and a caller-requested cancellation.
//! None of them is retried.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;

/// Convenience alias used across the crate.
pub type Result<T, E = LasflowError> = std::result::Result<T, E>;

/// The main error type for lasflow operations.
#[derive(Debug, Error)]
pub enum LasflowError {
    /// The pipeline could not be built from the given options.
    #[error("{0}")]
    Configuration(#[from] ConfigurationError),

    /// A stage input pattern matched no files.
    #[error("{0}")]
    NoInputFiles(#[from] NoInputFilesError),

    /// An external tool exited unsuccessfully.
    #[error("{0}")]
    StageFailed(#[from] StageFailedError),

    /// The caller cancelled the run.
    #[error("Pipeline cancelled: {0}")]
    Cancelled(String),

    /// IO error raised by a collaborator.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl LasflowError {
    /// Creates a cancellation error.
    #[must_use]
    pub fn cancelled(reason: impl Into<String>) -> Self {
        Self::Cancelled(reason.into())
    }

    /// Returns a stable code identifying the error kind.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "PIPELINE-CONFIG",
            Self::NoInputFiles(_) => "PIPELINE-NO-INPUT",
            Self::StageFailed(_) => "PIPELINE-STAGE-FAILED",
            Self::Cancelled(_) => "PIPELINE-CANCELLED",
            Self::Io(_) => "PIPELINE-IO",
            Self::Serialization(_) => "PIPELINE-SERIALIZATION",
        }
    }

    /// Returns true for the cancellation variant.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }

    /// Maps the error to a process exit status.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Configuration(_) | Self::Serialization(_) => 2,
            Self::Cancelled(_) => 130,
            Self::NoInputFiles(_) | Self::StageFailed(_) | Self::Io(_) => 1,
        }
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = match self {
            Self::Configuration(err) => err.to_dict(),
            Self::NoInputFiles(err) => err.to_dict(),
            Self::StageFailed(err) => err.to_dict(),
            Self::Cancelled(reason) => {
                let mut map = HashMap::new();
                map.insert("reason".to_string(), serde_json::json!(reason));
                map
            }
            Self::Io(_) | Self::Serialization(_) => HashMap::new(),
        };
        map.insert("code".to_string(), serde_json::json!(self.code()));
        map.insert("message".to_string(), serde_json::json!(self.to_string()));
        map
    }
}

impl From<serde_json::Error> for LasflowError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Extra diagnostics attached to a configuration error.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ErrorInfo {
    /// Error code (e.g., "PIPELINE-CONFIG-GLOB").
    pub code: String,
    /// Short summary of the error.
    pub summary: String,
    /// Hint for fixing the error.
    pub fix_hint: Option<String>,
    /// Additional context key-value pairs.
    #[serde(default)]
    pub context: HashMap<String, String>,
}

impl ErrorInfo {
    /// Creates a new error info.
    #[must_use]
    pub fn new(code: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            summary: summary.into(),
            fix_hint: None,
            context: HashMap::new(),
        }
    }

    /// Sets the fix hint.
    #[must_use]
    pub fn with_fix_hint(mut self, hint: impl Into<String>) -> Self {
        self.fix_hint = Some(hint.into());
        self
    }

    /// Adds a single context entry.
    #[must_use]
    pub fn with_context_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("code".to_string(), serde_json::json!(self.code));
        map.insert("summary".to_string(), serde_json::json!(self.summary));
        if let Some(ref hint) = self.fix_hint {
            map.insert("fix_hint".to_string(), serde_json::json!(hint));
        }
        if !self.context.is_empty() {
            map.insert("context".to_string(), serde_json::json!(self.context));
        }
        map
    }
}

/// Raised when options are invalid, before any process starts.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("Configuration error: {message}")]
pub struct ConfigurationError {
    /// The error message.
    pub message: String,
    /// The option involved, if any.
    pub option: Option<String>,
    /// The stage involved, if any.
    pub stage: Option<String>,
    /// Optional structured diagnostics.
    pub error_info: Option<ErrorInfo>,
}

impl ConfigurationError {
    /// Creates a new configuration error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            option: None,
            stage: None,
            error_info: None,
        }
    }

    /// Creates an error for a specific option.
    #[must_use]
    pub fn for_option(option: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(message).with_option(option)
    }

    /// Sets the option involved.
    #[must_use]
    pub fn with_option(mut self, option: impl Into<String>) -> Self {
        self.option = Some(option.into());
        self
    }

    /// Sets the stage involved.
    #[must_use]
    pub fn with_stage(mut self, stage: impl Into<String>) -> Self {
        self.stage = Some(stage.into());
        self
    }

    /// Sets the structured diagnostics.
    #[must_use]
    pub fn with_error_info(mut self, info: ErrorInfo) -> Self {
        self.error_info = Some(info);
        self
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("message".to_string(), serde_json::json!(self.message));
        if let Some(ref option) = self.option {
            map.insert("option".to_string(), serde_json::json!(option));
        }
        if let Some(ref stage) = self.stage {
            map.insert("stage".to_string(), serde_json::json!(stage));
        }
        if let Some(ref info) = self.error_info {
            map.insert("error_info".to_string(), serde_json::json!(info.to_dict()));
        }
        map
    }
}

/// Raised when a stage's input pattern selects no files.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("No input files for stage {stage_number} '{stage}': pattern '{pattern}' matched nothing in {}", .directory.display())]
pub struct NoInputFilesError {
    /// 1-based position of the stage in the pipeline.
    pub stage_number: usize,
    /// The stage name.
    pub stage: String,
    /// The glob pattern that was resolved.
    pub pattern: String,
    /// The directory the pattern was resolved in.
    pub directory: PathBuf,
}

impl NoInputFilesError {
    /// Creates a new no-input-files error.
    #[must_use]
    pub fn new(
        stage_number: usize,
        stage: impl Into<String>,
        pattern: impl Into<String>,
        directory: impl Into<PathBuf>,
    ) -> Self {
        Self {
            stage_number,
            stage: stage.into(),
            pattern: pattern.into(),
            directory: directory.into(),
        }
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("stage_number".to_string(), serde_json::json!(self.stage_number));
        map.insert("stage".to_string(), serde_json::json!(self.stage));
        map.insert("pattern".to_string(), serde_json::json!(self.pattern));
        map.insert(
            "directory".to_string(),
            serde_json::json!(self.directory.display().to_string()),
        );
        map
    }
}

/// Raised when an external tool exits unsuccessfully.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Stage {stage_number} '{stage}' failed ({}): {command_line}", failure_summary(*.exit_code, .warnings))]
pub struct StageFailedError {
    /// 1-based position of the stage in the pipeline.
    pub stage_number: usize,
    /// The stage name.
    pub stage: String,
    /// The full command line that was run.
    pub command_line: String,
    /// Exit code, `None` when the process never started or was killed.
    pub exit_code: Option<i32>,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
    /// Warnings that caused the failure under an escalating policy.
    pub warnings: Vec<String>,
}

fn failure_summary(exit_code: Option<i32>, warnings: &[String]) -> String {
    match exit_code {
        Some(0) if !warnings.is_empty() => format!("{} warning(s) escalated", warnings.len()),
        Some(code) => format!("exit code {code}"),
        None => "no exit code".to_string(),
    }
}

impl StageFailedError {
    /// Creates a new stage failure.
    #[must_use]
    pub fn new(
        stage_number: usize,
        stage: impl Into<String>,
        command_line: impl Into<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self {
            stage_number,
            stage: stage.into(),
            command_line: command_line.into(),
            exit_code,
            stdout: String::new(),
            stderr: String::new(),
            warnings: Vec::new(),
        }
    }

    /// Attaches captured output.
    #[must_use]
    pub fn with_output(mut self, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        self.stdout = stdout.into();
        self.stderr = stderr.into();
        self
    }

    /// Attaches escalated warnings.
    #[must_use]
    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings = warnings;
        self
    }

    /// Returns the most useful diagnostic text: stderr if present, else stdout.
    #[must_use]
    pub fn diagnostics(&self) -> &str {
        if self.stderr.trim().is_empty() {
            &self.stdout
        } else {
            &self.stderr
        }
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("stage_number".to_string(), serde_json::json!(self.stage_number));
        map.insert("stage".to_string(), serde_json::json!(self.stage));
        map.insert("command_line".to_string(), serde_json::json!(self.command_line));
        map.insert("exit_code".to_string(), serde_json::json!(self.exit_code));
        map.insert("stderr".to_string(), serde_json::json!(self.stderr));
        if !self.warnings.is_empty() {
            map.insert("warnings".to_string(), serde_json::json!(self.warnings));
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_error_builder() {
        let err = ConfigurationError::for_option("tile_size", "tile size must be positive")
            .with_stage("tile")
            .with_error_info(
                ErrorInfo::new("CONFIG-RANGE", "value out of range").with_fix_hint("use 1000"),
            );

        assert_eq!(err.option.as_deref(), Some("tile_size"));
        assert_eq!(err.stage.as_deref(), Some("tile"));
        assert!(err.to_string().contains("tile size must be positive"));
        assert!(err.to_dict().contains_key("error_info"));
    }

    #[test]
    fn test_no_input_files_message() {
        let err = NoInputFilesError::new(2, "ground", "tile*.laz", "/tmp/work");
        let msg = err.to_string();

        assert!(msg.contains("stage 2 'ground'"));
        assert!(msg.contains("tile*.laz"));
    }

    #[test]
    fn test_stage_failed_message_and_diagnostics() {
        let err = StageFailedError::new(3, "height", "lasheight -i x", Some(1))
            .with_output("", "ERROR: cannot open file");

        assert!(err.to_string().contains("exit code 1"));
        assert_eq!(err.diagnostics(), "ERROR: cannot open file");

        let escalated = StageFailedError::new(1, "tile", "lastile", Some(0))
            .with_warnings(vec!["WARNING: empty tile".to_string()]);
        assert!(escalated.to_string().contains("1 warning(s) escalated"));
    }

    #[test]
    fn test_error_codes_and_exit_codes() {
        let config: LasflowError = ConfigurationError::new("bad").into();
        let cancelled = LasflowError::cancelled("user");
        let failed: LasflowError = StageFailedError::new(1, "tile", "lastile", Some(3)).into();

        assert_eq!(config.code(), "PIPELINE-CONFIG");
        assert_eq!(config.exit_code(), 2);
        assert!(cancelled.is_cancelled());
        assert_eq!(cancelled.exit_code(), 130);
        assert_eq!(failed.exit_code(), 1);
        assert_eq!(failed.to_dict().get("code").unwrap(), "PIPELINE-STAGE-FAILED");
    }
}
