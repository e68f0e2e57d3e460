//! Built pipelines: concrete, ordered command lines.

use crate::process::CommandLine;
use crate::stages::StageSpec;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

/// One stage with everything resolved except its input files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedStage {
    /// 1-based position in the pipeline.
    pub number: usize,
    /// The template this stage was built from.
    pub spec: StageSpec,
    /// The full command line.
    pub command: CommandLine,
    /// Directory the input glob is resolved in.
    pub input_directory: PathBuf,
    /// File-name glob resolved before the stage runs.
    pub input_pattern: String,
    /// Predicted name of one product, for working-directory products.
    pub sample_product: Option<String>,
}

impl PlannedStage {
    /// Returns the stage name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.spec.name
    }

    /// Returns the tool name.
    #[must_use]
    pub fn tool(&self) -> &str {
        &self.spec.tool
    }

    /// Returns the printable command line.
    #[must_use]
    pub fn command_line(&self) -> String {
        self.command.to_string()
    }
}

/// A validated, ready-to-run pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    name: String,
    working_dir: PathBuf,
    stages: Vec<PlannedStage>,
}

impl Pipeline {
    pub(crate) fn new(name: String, working_dir: PathBuf, stages: Vec<PlannedStage>) -> Self {
        Self {
            name,
            working_dir,
            stages,
        }
    }

    /// Returns the pipeline name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the working directory for intermediate products.
    #[must_use]
    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// Returns the stages in execution order.
    #[must_use]
    pub fn stages(&self) -> &[PlannedStage] {
        &self.stages
    }

    /// Returns the number of stages.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Looks up a stage by name.
    #[must_use]
    pub fn stage(&self, name: &str) -> Option<&PlannedStage> {
        self.stages.iter().find(|s| s.name() == name)
    }

    /// Returns the tool of every stage, in order.
    #[must_use]
    pub fn tools(&self) -> Vec<&str> {
        self.stages.iter().map(PlannedStage::tool).collect()
    }

    /// Renders a numbered plan, one stage per line.
    #[must_use]
    pub fn describe(&self) -> String {
        let mut out = format!(
            "{} ({} stages, working directory {})\n",
            self.name,
            self.stages.len(),
            self.working_dir.display()
        );
        for stage in &self.stages {
            let _ = writeln!(out, "{:>2}. {:<10} {}", stage.number, stage.name(), stage.command);
        }
        out
    }
}
