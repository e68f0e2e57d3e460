//! Per-stage results and run records.

use crate::core::StageStatus;
use crate::errors::LasflowError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// What happened when one stage ran.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// 1-based stage number.
    pub stage_number: usize,
    /// Stage name.
    pub stage: String,
    /// Tool name.
    pub tool: String,
    /// The command line that was launched.
    pub command_line: String,
    /// Files the input glob resolved to.
    pub inputs: Vec<PathBuf>,
    /// Final status.
    pub status: StageStatus,
    /// Exit code, `None` if the process was killed or never started.
    pub exit_code: Option<i32>,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
    /// Warning lines found in the output.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: f64,
}

impl ExecutionResult {
    /// Returns true if the stage succeeded.
    #[must_use]
    pub fn success(&self) -> bool {
        self.status.is_success()
    }
}

/// How a run ended.
#[derive(Debug)]
pub enum RunOutcome {
    /// Every stage succeeded.
    Completed,
    /// The run halted; no further stages were started.
    Failed(LasflowError),
}

impl RunOutcome {
    /// Returns true if every stage succeeded.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Returns true if the run was cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Failed(e) if e.is_cancelled())
    }

    /// Returns the error that halted the run.
    #[must_use]
    pub fn error(&self) -> Option<&LasflowError> {
        match self {
            Self::Completed => None,
            Self::Failed(e) => Some(e),
        }
    }

    /// Returns the process exit status for this outcome.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        self.error().map_or(0, LasflowError::exit_code)
    }
}

/// Record of one pipeline run.
#[derive(Debug)]
pub struct PipelineRun {
    /// Unique run identifier.
    pub run_id: Uuid,
    /// Pipeline name.
    pub pipeline: String,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// Total duration in milliseconds.
    pub duration_ms: f64,
    /// Results of the stages that were started, in order.
    pub results: Vec<ExecutionResult>,
    /// How the run ended.
    pub outcome: RunOutcome,
}

impl PipelineRun {
    /// Returns true if every stage succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.outcome.is_completed()
    }

    /// Returns the error that halted the run.
    #[must_use]
    pub fn error(&self) -> Option<&LasflowError> {
        self.outcome.error()
    }

    /// Returns the number of stages that finished successfully.
    #[must_use]
    pub fn completed_stages(&self) -> usize {
        self.results.iter().filter(|r| r.success()).count()
    }

    /// Returns the process exit status for this run.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        self.outcome.exit_code()
    }

    /// Converts the run into the stage results or the halting error.
    pub fn into_result(self) -> Result<Vec<ExecutionResult>, LasflowError> {
        match self.outcome {
            RunOutcome::Completed => Ok(self.results),
            RunOutcome::Failed(e) => Err(e),
        }
    }

    /// Converts to a JSON summary.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "run_id": self.run_id.to_string(),
            "pipeline": self.pipeline,
            "started_at": self.started_at.to_rfc3339(),
            "duration_ms": self.duration_ms,
            "success": self.is_success(),
            "error": self.error().map(LasflowError::to_dict),
            "results": self.results,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(status: StageStatus) -> ExecutionResult {
        ExecutionResult {
            stage_number: 1,
            stage: "tile".to_string(),
            tool: "lastile".to_string(),
            command_line: "lastile -i a.laz".to_string(),
            inputs: vec![PathBuf::from("a.laz")],
            status,
            exit_code: Some(0),
            stdout: String::new(),
            stderr: String::new(),
            warnings: Vec::new(),
            duration_ms: 1.0,
        }
    }

    #[test]
    fn test_outcome_exit_codes() {
        assert_eq!(RunOutcome::Completed.exit_code(), 0);
        let cancelled = RunOutcome::Failed(LasflowError::cancelled("ctrl-c"));
        assert!(cancelled.is_cancelled());
        assert_eq!(cancelled.exit_code(), 130);
    }

    #[test]
    fn test_run_summary() {
        let run = PipelineRun {
            run_id: Uuid::new_v4(),
            pipeline: "demo".to_string(),
            started_at: Utc::now(),
            duration_ms: 2.0,
            results: vec![result(StageStatus::Ok), result(StageStatus::Fail)],
            outcome: RunOutcome::Completed,
        };

        assert_eq!(run.completed_stages(), 1);
        let json = run.to_json();
        assert_eq!(json["pipeline"], "demo");
        assert_eq!(json["results"].as_array().unwrap().len(), 2);
        assert!(json["error"].is_null());
        assert_eq!(run.into_result().unwrap().len(), 2);
    }
}
