//! # Lasflow
//!
//! Staged runner for LAStools point-cloud processing pipelines.
//!
//! A pipeline is an ordered list of tool invocations that hand their
//! products to each other through a working directory, chained by file-name
//! suffix (`tile*.laz` -> `tile*_g.laz` -> `tile*_gh.laz` ...). Lasflow
//! provides:
//!
//! - **Recipes**: ready-made pipelines such as flightlines to a merged canopy
//!   height model, or classifying a single huge file through reversible tiling
//! - **Validated building**: typed argument vectors and a suffix-chain check
//!   before any tool starts
//! - **Sequential execution**: input globs resolved before each stage, fail-fast
//!   on missing inputs and non-zero exits
//! - **Cancellation**: a token checked between stages and forwarded to the
//!   running tool, which is killed
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use lasflow::prelude::*;
//!
//! let config = Configuration::new()
//!     .with(keys::INPUT, "/data/strips")
//!     .with(keys::OUTPUT, "/data/chm.tif")
//!     .with(keys::STEP, 2.0);
//! let settings = ToolSettings::load(None)?;
//!
//! let pipeline = Recipe::FlightlinesToMergedChm.build(&config, &settings, "/tmp/run".as_ref())?;
//! let run = PipelineRunner::default().run(&pipeline, &CancellationToken::new()).await;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod cancellation;
pub mod config;
pub mod core;
pub mod errors;
pub mod events;
pub mod pipeline;
pub mod process;
pub mod recipes;
pub mod stages;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cancellation::CancellationToken;
    pub use crate::config::{Configuration, OptionValue, ToolSettings, WarningPolicy};
    pub use crate::core::StageStatus;
    pub use crate::errors::{
        ConfigurationError, LasflowError, NoInputFilesError, StageFailedError,
    };
    pub use crate::events::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::pipeline::{
        ExecutionResult, Pipeline, PipelineBuilder, PipelineRun, PipelineRunner, PlannedStage,
        RunOutcome,
    };
    pub use crate::process::{
        CommandLine, FileMatcher, GlobFileMatcher, ProcessExecutor, ProcessOutput,
        TokioProcessExecutor,
    };
    pub use crate::recipes::{keys, Granularity, Recipe, Terrain};
    pub use crate::stages::{ArgBuilder, InputSelection, ProductNaming, StageSpec};
}
