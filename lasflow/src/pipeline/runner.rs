//! Sequential pipeline runner.

use super::plan::{Pipeline, PlannedStage};
use super::result::{ExecutionResult, PipelineRun, RunOutcome};
use crate::cancellation::CancellationToken;
use crate::config::WarningPolicy;
use crate::core::StageStatus;
use crate::errors::{LasflowError, NoInputFilesError, StageFailedError};
use crate::events::{percent_complete, EventSink, NoOpEventSink};
use crate::process::{
    scan_warnings, FileMatcher, GlobFileMatcher, ProcessExecutor, ProcessOutput,
    TokioProcessExecutor,
};
use chrono::Utc;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Runs built pipelines one stage at a time.
///
/// Before each stage the input glob is resolved; an empty match halts the
/// run without launching the tool. A non-zero exit, a cancelled token, or an
/// escalated warning halts the run as well. Nothing in the working
/// directory is cleaned up.
#[derive(Clone)]
pub struct PipelineRunner {
    executor: Arc<dyn ProcessExecutor>,
    matcher: Arc<dyn FileMatcher>,
    sink: Arc<dyn EventSink>,
    warning_policy: WarningPolicy,
}

impl std::fmt::Debug for PipelineRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineRunner")
            .field("warning_policy", &self.warning_policy)
            .finish_non_exhaustive()
    }
}

impl Default for PipelineRunner {
    fn default() -> Self {
        Self::new(
            Arc::new(TokioProcessExecutor::new()),
            Arc::new(GlobFileMatcher::new()),
        )
    }
}

impl PipelineRunner {
    /// Creates a runner with the given collaborators.
    #[must_use]
    pub fn new(executor: Arc<dyn ProcessExecutor>, matcher: Arc<dyn FileMatcher>) -> Self {
        Self {
            executor,
            matcher,
            sink: Arc::new(NoOpEventSink),
            warning_policy: WarningPolicy::default(),
        }
    }

    /// Sets the progress sink.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Sets how warnings in successful tool output are treated.
    #[must_use]
    pub fn with_warning_policy(mut self, policy: WarningPolicy) -> Self {
        self.warning_policy = policy;
        self
    }

    /// Runs every stage in order.
    pub async fn run(&self, pipeline: &Pipeline, token: &CancellationToken) -> PipelineRun {
        let run_id = Uuid::now_v7();
        let started_at = Utc::now();
        let start = Instant::now();
        let total = pipeline.stage_count();
        let mut results = Vec::with_capacity(total);

        info!(
            run_id = %run_id,
            pipeline = %pipeline.name(),
            stages = total,
            "Pipeline started"
        );
        self.sink.emit(
            "pipeline.started",
            Some(serde_json::json!({
                "run_id": run_id.to_string(),
                "pipeline": pipeline.name(),
                "stages": total,
                "working_dir": pipeline.working_dir().display().to_string(),
            })),
        );

        let mut outcome = RunOutcome::Completed;
        for stage in pipeline.stages() {
            if let Err(e) = self.run_stage(stage, total, token, &mut results).await {
                outcome = RunOutcome::Failed(e);
                break;
            }
        }

        let duration_ms = start.elapsed().as_secs_f64() * 1000.0;
        match &outcome {
            RunOutcome::Completed => {
                info!(run_id = %run_id, duration_ms, "Pipeline completed");
                self.sink.emit(
                    "pipeline.completed",
                    Some(serde_json::json!({
                        "run_id": run_id.to_string(),
                        "stages": results.len(),
                        "duration_ms": duration_ms,
                    })),
                );
            }
            RunOutcome::Failed(e) if e.is_cancelled() => {
                warn!(run_id = %run_id, error = %e, "Pipeline cancelled");
                self.sink.emit(
                    "pipeline.cancelled",
                    Some(serde_json::json!({
                        "run_id": run_id.to_string(),
                        "reason": token.reason(),
                        "completed_stages": results.iter().filter(|r| r.success()).count(),
                    })),
                );
            }
            RunOutcome::Failed(e) => {
                warn!(run_id = %run_id, error = %e, code = e.code(), "Pipeline failed");
                self.sink.emit(
                    "pipeline.failed",
                    Some(serde_json::json!({
                        "run_id": run_id.to_string(),
                        "error": e.to_dict(),
                    })),
                );
            }
        }

        PipelineRun {
            run_id,
            pipeline: pipeline.name().to_string(),
            started_at,
            duration_ms,
            results,
            outcome,
        }
    }

    async fn run_stage(
        &self,
        stage: &PlannedStage,
        total: usize,
        token: &CancellationToken,
        results: &mut Vec<ExecutionResult>,
    ) -> Result<(), LasflowError> {
        if token.is_cancelled() {
            return Err(LasflowError::cancelled(
                token.reason().unwrap_or_else(|| "cancelled".to_string()),
            ));
        }

        let inputs = self
            .matcher
            .matches(&stage.input_directory, &stage.input_pattern)?;
        if inputs.is_empty() {
            return Err(NoInputFilesError::new(
                stage.number,
                stage.name(),
                stage.input_pattern.clone(),
                stage.input_directory.clone(),
            )
            .into());
        }

        let command_line = stage.command_line();
        info!(
            stage = %stage.name(),
            number = stage.number,
            total,
            inputs = inputs.len(),
            "Stage started"
        );
        debug!(stage = %stage.name(), command = %command_line, "Launching tool");
        self.sink.emit(
            "stage.started",
            Some(serde_json::json!({
                "stage": stage.name(),
                "index": stage.number,
                "total": total,
                "percent": percent_complete(stage.number - 1, total),
                "command": command_line,
                "inputs": inputs.len(),
            })),
        );

        let start = Instant::now();
        let executed = self.executor.execute(&stage.command, token, self.sink.as_ref()).await;
        let duration_ms = start.elapsed().as_secs_f64() * 1000.0;

        let output = match executed {
            Ok(output) => output,
            Err(e) if e.is_cancelled() => {
                results.push(stage_result(
                    stage,
                    inputs,
                    ProcessOutput::default(),
                    Vec::new(),
                    StageStatus::Cancel,
                    duration_ms,
                ));
                return Err(e);
            }
            Err(e) => {
                let failure = StageFailedError::new(stage.number, stage.name(), &command_line, None)
                    .with_output("", e.to_string());
                results.push(stage_result(
                    stage,
                    inputs,
                    ProcessOutput {
                        exit_code: None,
                        stdout: String::new(),
                        stderr: e.to_string(),
                    },
                    Vec::new(),
                    StageStatus::Fail,
                    duration_ms,
                ));
                self.emit_failed(&failure);
                return Err(failure.into());
            }
        };

        let warnings = scan_warnings(&output.stdout, &output.stderr);
        if self.warning_policy != WarningPolicy::Ignore {
            for warning in &warnings {
                warn!(stage = %stage.name(), warning = %warning, "Tool reported a warning");
                self.sink.emit(
                    "stage.warning",
                    Some(serde_json::json!({
                        "stage": stage.name(),
                        "warning": warning,
                    })),
                );
            }
        }

        let escalated = output.success()
            && !warnings.is_empty()
            && self.warning_policy == WarningPolicy::Escalate;

        if !output.success() || escalated {
            let failure = StageFailedError::new(
                stage.number,
                stage.name(),
                &command_line,
                output.exit_code,
            )
            .with_output(output.stdout.clone(), output.stderr.clone())
            .with_warnings(if escalated { warnings.clone() } else { Vec::new() });
            results.push(stage_result(
                stage,
                inputs,
                output,
                warnings,
                StageStatus::Fail,
                duration_ms,
            ));
            self.emit_failed(&failure);
            return Err(failure.into());
        }

        info!(stage = %stage.name(), duration_ms, "Stage completed");
        self.sink.emit(
            "stage.completed",
            Some(serde_json::json!({
                "stage": stage.name(),
                "index": stage.number,
                "total": total,
                "percent": percent_complete(stage.number, total),
                "duration_ms": duration_ms,
                "warnings": warnings.len(),
            })),
        );
        results.push(stage_result(
            stage,
            inputs,
            output,
            warnings,
            StageStatus::Ok,
            duration_ms,
        ));
        Ok(())
    }

    fn emit_failed(&self, failure: &StageFailedError) {
        warn!(
            stage = %failure.stage,
            number = failure.stage_number,
            exit_code = ?failure.exit_code,
            "Stage failed"
        );
        self.sink.emit(
            "stage.failed",
            Some(serde_json::Value::Object(failure.to_dict().into_iter().collect())),
        );
    }
}

fn stage_result(
    stage: &PlannedStage,
    inputs: Vec<PathBuf>,
    output: ProcessOutput,
    warnings: Vec<String>,
    status: StageStatus,
    duration_ms: f64,
) -> ExecutionResult {
    ExecutionResult {
        stage_number: stage.number,
        stage: stage.name().to_string(),
        tool: stage.tool().to_string(),
        command_line: stage.command_line(),
        inputs,
        status,
        exit_code: output.exit_code,
        stdout: output.stdout,
        stderr: output.stderr,
        warnings,
        duration_ms,
    }
}
