//! Pipeline building and sequential execution.
//!
//! This module provides:
//! - [`PipelineBuilder`] for turning stage templates into a validated [`Pipeline`]
//! - [`PipelineRunner`] for running a pipeline stage by stage
//! - [`ExecutionResult`] and [`PipelineRun`] for what happened

mod builder;
mod chain;
mod plan;
mod result;
mod runner;


pub use builder::PipelineBuilder;
pub use plan::{Pipeline, PlannedStage};
pub use result::{ExecutionResult, PipelineRun, RunOutcome};
pub use runner::PipelineRunner;
