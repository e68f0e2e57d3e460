//! Single-tool recipes over a folder of point clouds.

use super::common::{additional_args, folder_input, keys, point_format, positive};
use crate::config::{Configuration, ToolSettings};
use crate::errors::ConfigurationError;
use crate::pipeline::{Pipeline, PipelineBuilder};
use crate::stages::{ArgBuilder, InputSelection, ProductNaming, StageSpec};
use std::path::Path;

/// Sort points for better compression and faster access.
pub const LASSORT: &str = "lassort";
/// Remove duplicate points.
pub const LASDUPLICATE: &str = "lasduplicate";

/// Sort keys for `lassort`.
pub mod sort_keys {
    /// Sort by GPS time.
    pub const GPS_TIME: &str = "gps_time";
    /// Sort by return number.
    pub const RETURN_NUMBER: &str = "return_number";
    /// Sort by point source id.
    pub const POINT_SOURCE: &str = "point_source";
}

/// Duplicate handling keys for `lasduplicate`.
pub mod duplicate_keys {
    /// Keep the duplicate with the lowest z.
    pub const LOWEST_Z: &str = "lowest_z";
    /// Keep the duplicate with the highest z.
    pub const HIGHEST_Z: &str = "highest_z";
    /// Only points identical in x, y and z are duplicates.
    pub const UNIQUE_XYZ: &str = "unique_xyz";
    /// Mark the surviving duplicate as a single return.
    pub const SINGLE_RETURNS: &str = "single_returns";
    /// Keep only one point within a tolerance.
    pub const NEARBY: &str = "nearby";
    /// Tolerance for `nearby`.
    pub const NEARBY_TOLERANCE: &str = "nearby_tolerance";
    /// Write removed points to a separate file.
    pub const RECORD_REMOVED: &str = "record_removed";
}

const DEFAULT_NEARBY_TOLERANCE: f64 = 0.02;
const MIN_NEARBY_TOLERANCE: f64 = 0.001;

/// `lassort` over every file of the input folder.
pub fn lassort(
    config: &Configuration,
    settings: &ToolSettings,
    working_dir: &Path,
) -> Result<Pipeline, ConfigurationError> {
    let args = ArgBuilder::new()
        .flag_if(config.bool_or(sort_keys::GPS_TIME, false)?, "-gps_time")
        .flag_if(config.bool_or(sort_keys::RETURN_NUMBER, false)?, "-return_number")
        .flag_if(config.bool_or(sort_keys::POINT_SOURCE, false)?, "-point_source")
        .append(additional_args(config)?);

    single_stage(LASSORT, "Sort points", config, settings, working_dir, args)
}

/// `lasduplicate` over every file of the input folder.
pub fn lasduplicate(
    config: &Configuration,
    settings: &ToolSettings,
    working_dir: &Path,
) -> Result<Pipeline, ConfigurationError> {
    use duplicate_keys as k;

    let nearby = config.bool_or(k::NEARBY, false)?;
    let tolerance = positive(config, k::NEARBY_TOLERANCE, DEFAULT_NEARBY_TOLERANCE)?;
    if nearby && tolerance < MIN_NEARBY_TOLERANCE {
        return Err(ConfigurationError::for_option(
            k::NEARBY_TOLERANCE,
            format!("nearby tolerance must be at least {MIN_NEARBY_TOLERANCE}, got {tolerance}"),
        ));
    }

    let args = ArgBuilder::new()
        .flag_if(config.bool_or(k::LOWEST_Z, false)?, "-lowest_z")
        .flag_if(config.bool_or(k::HIGHEST_Z, false)?, "-highest_z")
        .flag_if(config.bool_or(k::UNIQUE_XYZ, false)?, "-unique_xyz")
        .flag_if(config.bool_or(k::SINGLE_RETURNS, false)?, "-single_returns")
        .option_if(nearby, "-nearby", crate::stages::format_number(tolerance))
        .flag_if(config.bool_or(k::RECORD_REMOVED, false)?, "-record_removed")
        .append(additional_args(config)?);

    single_stage(LASDUPLICATE, "Remove duplicate points", config, settings, working_dir, args)
}

fn single_stage(
    tool: &str,
    description: &str,
    config: &Configuration,
    settings: &ToolSettings,
    working_dir: &Path,
    args: ArgBuilder,
) -> Result<Pipeline, ConfigurationError> {
    let output = ProductNaming::Directory {
        directory: config.path_opt(keys::OUTPUT_DIRECTORY)?,
        appendix: config.text_opt(keys::OUTPUT_APPENDIX)?.map(str::to_string),
        format: point_format(config)?,
    };

    PipelineBuilder::new(tool, settings.clone(), working_dir)
        .stage(
            StageSpec::new(tool, tool, InputSelection::external(folder_input(config)?), output)
                .with_description(description)
                .with_args(args)?
                .multi_core(),
        )?
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn settings() -> ToolSettings {
        ToolSettings::default().with_lastools_dir("/opt/LAStools").with_cores(8)
    }

    #[cfg(unix)]
    #[test]
    fn test_lassort_arguments() {
        let config = Configuration::new()
            .with(keys::INPUT, "/data/tiles")
            .with(sort_keys::GPS_TIME, true)
            .with(sort_keys::POINT_SOURCE, true)
            .with(keys::OUTPUT_DIRECTORY, "/data/sorted")
            .with(keys::OUTPUT_FORMAT, "laz")
            .with(keys::ADDITIONAL, "-bucket_size 10");
        let pipeline = lassort(&config, &settings(), Path::new("/tmp/wd")).unwrap();

        assert_eq!(pipeline.stage_count(), 1);
        assert_eq!(
            pipeline.stages()[0].command.args,
            vec![
                "-i",
                "/data/tiles/*.laz",
                "-gps_time",
                "-point_source",
                "-bucket_size",
                "10",
                "-odir",
                "/data/sorted",
                "-olaz",
                "-cores",
                "8"
            ]
        );
    }

    #[test]
    fn test_lasduplicate_arguments() {
        let config = Configuration::new()
            .with(keys::INPUT, "/data/tiles")
            .with(duplicate_keys::LOWEST_Z, true)
            .with(duplicate_keys::NEARBY, true)
            .with(duplicate_keys::NEARBY_TOLERANCE, 0.05)
            .with(keys::OUTPUT_APPENDIX, "_dedup");
        let pipeline = lasduplicate(&config, &settings(), Path::new("/tmp/wd")).unwrap();
        let stage = &pipeline.stages()[0];

        assert_eq!(stage.spec.args, vec!["-lowest_z", "-nearby", "0.05"]);
        assert_eq!(stage.command.value_of("-odix"), Some("_dedup"));
        assert!(!stage.command.has_arg("-odir"));
    }

    #[test]
    fn test_lasduplicate_tolerance_floor() {
        let config = Configuration::new()
            .with(keys::INPUT, "/data/tiles")
            .with(duplicate_keys::NEARBY, true)
            .with(duplicate_keys::NEARBY_TOLERANCE, 0.0001);
        let err = lasduplicate(&config, &settings(), Path::new("/tmp/wd")).unwrap_err();
        assert_eq!(err.option.as_deref(), Some(duplicate_keys::NEARBY_TOLERANCE));
    }
}
