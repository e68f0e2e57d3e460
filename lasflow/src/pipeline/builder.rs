//! Pipeline builder with validation.

use super::chain;
use super::plan::{Pipeline, PlannedStage};
use crate::config::ToolSettings;
use crate::errors::{ConfigurationError, ErrorInfo};
use crate::process::split_input_path;
use crate::stages::{ArgBuilder, InputSelection, StageSpec};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Builder for creating validated pipelines.
#[derive(Debug, Clone)]
pub struct PipelineBuilder {
    /// The pipeline name.
    name: String,
    /// Tool location and shared flags.
    settings: ToolSettings,
    /// Directory for intermediate products.
    working_dir: PathBuf,
    /// Stage templates in execution order.
    stages: Vec<StageSpec>,
}

impl PipelineBuilder {
    /// Creates a new pipeline builder.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        settings: ToolSettings,
        working_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            settings,
            working_dir: working_dir.into(),
            stages: Vec::new(),
        }
    }

    /// Adds a stage to the pipeline.
    ///
    /// # Errors
    ///
    /// Returns an error if the stage is invalid or reads from a stage that
    /// has not been added yet.
    pub fn stage(mut self, spec: StageSpec) -> Result<Self, ConfigurationError> {
        self.add_stage_spec(spec)?;
        Ok(self)
    }

    /// Adds a stage template.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails.
    pub fn add_stage_spec(&mut self, spec: StageSpec) -> Result<(), ConfigurationError> {
        spec.validate()?;

        if self.stages.iter().any(|s| s.name == spec.name) {
            return Err(ConfigurationError::new(format!(
                "Stage '{}' is defined twice",
                spec.name
            ))
            .with_stage(spec.name.clone())
            .with_error_info(ErrorInfo::new(
                "PIPELINE-CONFIG-DUPLICATE",
                format!("Duplicate stage '{}'", spec.name),
            )));
        }

        if let InputSelection::Upstream { sources, .. } = &spec.input {
            if sources.is_empty() {
                return Err(ConfigurationError::new(format!(
                    "Stage '{}' reads upstream products but names no source stage",
                    spec.name
                ))
                .with_stage(spec.name.clone()));
            }
        }

        for source in spec.input.sources() {
            if !self.stages.iter().any(|s| &s.name == source) {
                return Err(ConfigurationError::new(format!(
                    "Stage '{}' reads from unknown stage '{}'",
                    spec.name, source
                ))
                .with_stage(spec.name.clone())
                .with_error_info(
                    ErrorInfo::new(
                        "PIPELINE-CONFIG-MISSING-SOURCE",
                        format!("Source stage '{source}' not found"),
                    )
                    .with_fix_hint("Add the source stage before the stage that reads its products.")
                    .with_context_entry("source", source.clone()),
                ));
            }
        }

        self.stages.push(spec);
        Ok(())
    }

    /// Builds the pipeline.
    ///
    /// # Errors
    ///
    /// Returns an error if the builder has no stages, the settings are
    /// invalid, or an input glob breaks the suffix chain.
    pub fn build(self) -> Result<Pipeline, ConfigurationError> {
        if self.stages.is_empty() {
            return Err(ConfigurationError::new("Pipeline has no stages").with_error_info(
                ErrorInfo::new("PIPELINE-CONFIG-EMPTY", "Cannot build an empty pipeline")
                    .with_fix_hint("Add at least one stage to the pipeline before building."),
            ));
        }
        self.settings.validate()?;
        if self.working_dir.as_os_str().is_empty() {
            return Err(ConfigurationError::new("working directory must not be empty"));
        }

        let samples = chain::sample_products(&self.stages)?;
        chain::check_globs(&self.stages, &samples)?;

        let planned = self
            .stages
            .iter()
            .zip(samples)
            .enumerate()
            .map(|(index, (spec, sample))| self.plan_stage(index + 1, spec, sample))
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            pipeline = %self.name,
            stages = planned.len(),
            working_dir = %self.working_dir.display(),
            "Pipeline built"
        );

        Ok(Pipeline::new(self.name, self.working_dir, planned))
    }

    /// Returns the pipeline name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the number of stages.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Returns the working directory.
    #[must_use]
    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// Assembles `[-v] -i <input> <tool args> <output args> [-cores n]`.
    fn plan_stage(
        &self,
        number: usize,
        spec: &StageSpec,
        sample_product: Option<String>,
    ) -> Result<PlannedStage, ConfigurationError> {
        let (input_directory, input_pattern, input_arg) = match &spec.input {
            InputSelection::External { path } => {
                let (directory, pattern) = split_input_path(path);
                (directory, pattern, path.display().to_string())
            }
            InputSelection::Upstream { pattern, .. } => (
                self.working_dir.clone(),
                pattern.clone(),
                self.working_dir.join(pattern).display().to_string(),
            ),
        };

        let args = ArgBuilder::new()
            .flag_if(self.settings.verbose, "-v")
            .option("-i", input_arg)
            .extra(spec.args.iter().cloned())
            .append(spec.output.args(&self.working_dir))
            .option_if(
                spec.multi_core && self.settings.uses_multiple_cores(),
                "-cores",
                self.settings.cores.to_string(),
            )
            .finish()
            .map_err(|e| e.with_stage(spec.name.clone()))?;

        Ok(PlannedStage {
            number,
            spec: spec.clone(),
            command: self.settings.tool_command(&spec.tool).args(args),
            input_directory,
            input_pattern,
            sample_product,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::ProductNaming;
    use pretty_assertions::assert_eq;

    fn settings() -> ToolSettings {
        ToolSettings::default()
            .with_lastools_dir("/opt/LAStools")
            .with_cores(4)
    }

    fn tile() -> StageSpec {
        StageSpec::new(
            "tile",
            "lastile",
            InputSelection::external("/data/strips/*.laz"),
            ProductNaming::tiles("tile", "laz"),
        )
        .with_args(ArgBuilder::new().flag("-files_are_flightlines"))
        .unwrap()
    }

    fn ground() -> StageSpec {
        StageSpec::new(
            "ground",
            "lasground",
            InputSelection::upstream("tile*.laz", ["tile"]),
            ProductNaming::derived("_g", "laz"),
        )
        .multi_core()
    }

    #[test]
    fn test_builder_creation() {
        let builder = PipelineBuilder::new("test", settings(), "/tmp/wd");
        assert_eq!(builder.name(), "test");
        assert_eq!(builder.stage_count(), 0);
        assert_eq!(builder.working_dir(), Path::new("/tmp/wd"));
    }

    #[test]
    fn test_builder_missing_source() {
        let err = PipelineBuilder::new("test", settings(), "/tmp/wd")
            .stage(ground())
            .unwrap_err();

        let info = err.error_info.unwrap();
        assert_eq!(info.code, "PIPELINE-CONFIG-MISSING-SOURCE");
        assert_eq!(info.context.get("source").map(String::as_str), Some("tile"));
    }

    #[test]
    fn test_builder_duplicate_stage() {
        let err = PipelineBuilder::new("test", settings(), "/tmp/wd")
            .stage(tile())
            .unwrap()
            .stage(tile())
            .unwrap_err();

        assert_eq!(err.error_info.unwrap().code, "PIPELINE-CONFIG-DUPLICATE");
    }

    #[test]
    fn test_builder_empty_build() {
        let err = PipelineBuilder::new("test", settings(), "/tmp/wd")
            .build()
            .unwrap_err();

        assert_eq!(err.error_info.unwrap().code, "PIPELINE-CONFIG-EMPTY");
    }

    #[cfg(unix)]
    #[test]
    fn test_builder_assembles_command_lines() {
        let pipeline = PipelineBuilder::new("test", settings().with_verbose(true), "/tmp/wd")
            .stage(tile())
            .unwrap()
            .stage(ground())
            .unwrap()
            .build()
            .unwrap();

        let tile = &pipeline.stages()[0];
        assert_eq!(tile.number, 1);
        assert_eq!(tile.command.program, PathBuf::from("/opt/LAStools/bin/lastile"));
        assert_eq!(
            tile.command.args,
            vec![
                "-v",
                "-i",
                "/data/strips/*.laz",
                "-files_are_flightlines",
                "-odir",
                "/tmp/wd",
                "-o",
                "tile.laz"
            ]
        );
        assert_eq!(tile.input_directory, PathBuf::from("/data/strips"));
        assert_eq!(tile.input_pattern, "*.laz");

        let ground = &pipeline.stages()[1];
        assert_eq!(
            ground.command.args,
            vec![
                "-v",
                "-i",
                "/tmp/wd/tile*.laz",
                "-odir",
                "/tmp/wd",
                "-odix",
                "_g",
                "-olaz",
                "-cores",
                "4"
            ]
        );
        assert_eq!(ground.input_directory, PathBuf::from("/tmp/wd"));
        assert_eq!(ground.sample_product.as_deref(), Some("tile_630000_4834000_g.laz"));
        assert_eq!(pipeline.tools(), vec!["lastile", "lasground"]);
    }

    #[test]
    fn test_single_core_drops_cores_flag() {
        let pipeline = PipelineBuilder::new("test", settings().with_cores(1), "/tmp/wd")
            .stage(tile())
            .unwrap()
            .stage(ground())
            .unwrap()
            .build()
            .unwrap();

        assert!(!pipeline.stages()[1].command.has_arg("-cores"));
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let err = PipelineBuilder::new("test", settings().with_cores(0), "/tmp/wd")
            .stage(tile())
            .unwrap()
            .build();
        assert!(err.is_err());
    }

    #[test]
    fn test_describe_lists_stages() {
        let pipeline = PipelineBuilder::new("demo", settings(), "/tmp/wd")
            .stage(tile())
            .unwrap()
            .build()
            .unwrap();

        let text = pipeline.describe();
        assert!(text.starts_with("demo (1 stages"));
        assert!(text.contains(" 1. tile"));
        assert!(pipeline.stage("tile").is_some());
        assert!(pipeline.stage("nope").is_none());
    }
}
