//! Assertions over pipeline runs.

use crate::core::StageStatus;
use crate::pipeline::PipelineRun;
use crate::process::CommandLine;

/// Asserts that every stage ran and succeeded.
pub fn assert_run_succeeded(run: &PipelineRun) {
    assert!(
        run.is_success(),
        "Expected success, got error: {:?}",
        run.error()
    );
}

/// Asserts that the run halted with the given error code.
pub fn assert_run_failed_with(run: &PipelineRun, code: &str) {
    let error = run.error().unwrap_or_else(|| panic!("Expected {code}, but the run succeeded"));
    assert_eq!(error.code(), code, "Unexpected error: {error}");
}

/// Asserts the status of every recorded stage, in order.
pub fn assert_statuses(run: &PipelineRun, expected: &[StageStatus]) {
    let statuses: Vec<StageStatus> = run.results.iter().map(|r| r.status).collect();
    assert_eq!(statuses, expected, "Unexpected stage statuses");
}

/// Asserts that a command line does not contain `flag`.
pub fn assert_arg_absent(command: &CommandLine, flag: &str) {
    assert!(
        !command.has_arg(flag),
        "Expected '{flag}' to be absent from: {command}"
    );
}
