//! Collaborators for running external tools and selecting their inputs.
//!
//! This module provides:
//! - [`CommandLine`], the argument vector of one tool invocation
//! - [`ProcessExecutor`] and its tokio implementation
//! - [`FileMatcher`] and its glob implementation
//! - warning detection in captured tool output

mod command;
mod executor;
mod matcher;
mod warnings;

pub use command::CommandLine;
pub use executor::{ProcessExecutor, ProcessOutput, TokioProcessExecutor};
pub use matcher::{is_pattern, split_input_path, FileMatcher, GlobFileMatcher};
pub use warnings::scan_warnings;
