//! Testing utilities for lasflow pipelines.
//!
//! This module provides:
//! - A scripted process executor and a stub file matcher
//! - Assertions over pipeline runs
//! - Settings and configuration fixtures

mod assertions;
mod fixtures;
mod mocks;

pub use assertions::{
    assert_arg_absent, assert_run_failed_with, assert_run_succeeded, assert_statuses,
};
pub use fixtures::{flightlines_config, huge_file_config, test_settings};
pub use mocks::{ScriptedExecutor, StubFileMatcher};
