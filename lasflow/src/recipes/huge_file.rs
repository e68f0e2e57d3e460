//! Processing one file too large to handle in a single pass.
//!
//! The file is cut into reversible buffered tiles, processed tile by tile,
//! and then reassembled with `-reverse_tiling` into a single output file.

use super::common::{
    keys, non_negative, point_output, positive, Granularity, Terrain, DEFAULT_BUFFER,
    DEFAULT_TILE_SIZE,
};
use crate::config::{Configuration, ToolSettings};
use crate::errors::ConfigurationError;
use crate::pipeline::{Pipeline, PipelineBuilder};
use crate::stages::{ArgBuilder, InputSelection, ProductNaming, StageSpec};
use std::path::{Path, PathBuf};

/// Classify ground, buildings and vegetation.
pub const CLASSIFY: &str = "huge-file-classify";
/// Classify ground only.
pub const GROUND_CLASSIFY: &str = "huge-file-ground-classify";
/// Replace elevations with heights above ground.
pub const NORMALIZE: &str = "huge-file-normalize";

/// Validated options of the huge-file recipes.
#[derive(Debug, Clone, PartialEq)]
pub struct HugeFileOptions {
    /// The input file.
    pub input: PathBuf,
    /// Tile side length.
    pub tile_size: f64,
    /// Tile buffer, 0 disables.
    pub buffer: f64,
    /// Airborne scan.
    pub airborne: bool,
    /// Terrain type.
    pub terrain: Terrain,
    /// Preprocessing granularity.
    pub granularity: Granularity,
    /// Reassembled output file.
    pub output: PathBuf,
}

impl HugeFileOptions {
    /// Reads and validates the options.
    pub fn from_config(config: &Configuration) -> Result<Self, ConfigurationError> {
        Ok(Self {
            input: config.path(keys::INPUT)?,
            tile_size: positive(config, keys::TILE_SIZE, DEFAULT_TILE_SIZE)?,
            buffer: non_negative(config, keys::BUFFER, DEFAULT_BUFFER)?,
            airborne: config.bool_or(keys::AIRBORNE, true)?,
            terrain: config.parsed_or(keys::TERRAIN, Terrain::default())?,
            granularity: config.parsed_or(keys::GRANULARITY, Granularity::default())?,
            output: point_output(config)?,
        })
    }
}

/// Tile, ground, height, classify, reverse tiling.
pub fn classify(
    config: &Configuration,
    settings: &ToolSettings,
    working_dir: &Path,
) -> Result<Pipeline, ConfigurationError> {
    let options = HugeFileOptions::from_config(config)?;
    let base = "hugeFileClassify";

    ground_tiles(CLASSIFY, base, settings, working_dir, &options)?
        .stage(
            StageSpec::new(
                "height",
                "lasheight",
                InputSelection::upstream(format!("{base}*_g.laz"), ["ground"]),
                ProductNaming::derived("h", "laz"),
            )
            .with_description("Compute heights above ground")
            .multi_core(),
        )?
        .stage(
            StageSpec::new(
                "classify",
                "lasclassify",
                InputSelection::upstream(format!("{base}*_gh.laz"), ["height"]),
                ProductNaming::derived("c", "laz"),
            )
            .with_description("Classify buildings and vegetation")
            .multi_core(),
        )?
        .stage(reverse_stage(format!("{base}*_ghc.laz"), "classify", &options)?)?
        .build()
}

/// Tile, ground, reverse tiling.
pub fn ground_classify(
    config: &Configuration,
    settings: &ToolSettings,
    working_dir: &Path,
) -> Result<Pipeline, ConfigurationError> {
    let options = HugeFileOptions::from_config(config)?;
    let base = "hugeFileGroundClassify";

    ground_tiles(GROUND_CLASSIFY, base, settings, working_dir, &options)?
        .stage(reverse_stage(format!("{base}*_g.laz"), "ground", &options)?)?
        .build()
}

/// Tile, ground, height with `-replace_z`, reverse tiling.
pub fn normalize(
    config: &Configuration,
    settings: &ToolSettings,
    working_dir: &Path,
) -> Result<Pipeline, ConfigurationError> {
    let options = HugeFileOptions::from_config(config)?;
    let base = "hugeFileNormalize";

    ground_tiles(NORMALIZE, base, settings, working_dir, &options)?
        .stage(
            StageSpec::new(
                "height",
                "lasheight",
                InputSelection::upstream(format!("{base}*_g.laz"), ["ground"]),
                ProductNaming::derived("h", "laz"),
            )
            .with_description("Replace elevations with heights above ground")
            .with_args(ArgBuilder::new().flag("-replace_z"))?
            .multi_core(),
        )?
        .stage(reverse_stage(format!("{base}*_gh.laz"), "height", &options)?)?
        .build()
}

fn ground_tiles(
    name: &str,
    base: &str,
    settings: &ToolSettings,
    working_dir: &Path,
    options: &HugeFileOptions,
) -> Result<PipelineBuilder, ConfigurationError> {
    let mut ground_args = ArgBuilder::new().flag_if(!options.airborne, "-not_airborne");
    if let Some(flag) = options.terrain.flag() {
        ground_args = ground_args.flag(&flag);
    }
    if let Some(flag) = options.granularity.flag() {
        ground_args = ground_args.flag(&flag);
    }

    PipelineBuilder::new(name, settings.clone(), working_dir)
        .stage(
            StageSpec::new(
                "tile",
                "lastile",
                InputSelection::external(options.input.clone()),
                ProductNaming::tiles(base, "laz"),
            )
            .with_description("Cut the file into reversible tiles")
            .with_args(
                ArgBuilder::new()
                    .number("-tile_size", options.tile_size)
                    .number_if_nonzero("-buffer", options.buffer)
                    .flag("-reversible"),
            )?,
        )?
        .stage(
            StageSpec::new(
                "ground",
                "lasground",
                InputSelection::upstream(format!("{base}*.laz"), ["tile"]),
                ProductNaming::derived("_g", "laz"),
            )
            .with_description("Ground-classify the tiles")
            .with_args(ground_args)?
            .multi_core(),
        )
}

fn reverse_stage(
    pattern: String,
    source: &str,
    options: &HugeFileOptions,
) -> Result<StageSpec, ConfigurationError> {
    StageSpec::new(
        "reverse",
        "lastile",
        InputSelection::upstream(pattern, [source]),
        ProductNaming::final_output(options.output.clone()),
    )
    .with_description("Reassemble the tiles into one file")
    .with_args(ArgBuilder::new().flag("-reverse_tiling"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn config() -> Configuration {
        Configuration::new()
            .with(keys::INPUT, "/data/huge.laz")
            .with(keys::OUTPUT, "/data/huge_classified.laz")
    }

    fn settings() -> ToolSettings {
        ToolSettings::default().with_lastools_dir("/opt/LAStools").with_cores(2)
    }

    #[test]
    fn test_classify_sequence() {
        let pipeline = classify(&config(), &settings(), Path::new("/tmp/wd")).unwrap();

        assert_eq!(
            pipeline.tools(),
            vec!["lastile", "lasground", "lasheight", "lasclassify", "lastile"]
        );
        let tile = pipeline.stage("tile").unwrap();
        assert_eq!(
            tile.spec.args,
            vec!["-tile_size", "1000.0", "-buffer", "25.0", "-reversible"]
        );
        assert_eq!(tile.command.value_of("-o"), Some("hugeFileClassify.laz"));
        assert!(!tile.command.has_arg("-cores"));
        assert!(pipeline.stage("ground").unwrap().spec.args.is_empty());
        assert_eq!(
            pipeline.stage("reverse").unwrap().input_pattern,
            "hugeFileClassify*_ghc.laz"
        );
        assert_eq!(
            pipeline.stage("reverse").unwrap().command.value_of("-o"),
            Some("/data/huge_classified.laz")
        );
    }

    #[test]
    fn test_ground_options() {
        let config = config()
            .with(keys::AIRBORNE, false)
            .with(keys::TERRAIN, "city")
            .with(keys::GRANULARITY, "coarse")
            .with(keys::BUFFER, 0.0);
        let pipeline = ground_classify(&config, &settings(), Path::new("/tmp/wd")).unwrap();

        assert_eq!(pipeline.tools(), vec!["lastile", "lasground", "lastile"]);
        assert_eq!(
            pipeline.stage("ground").unwrap().spec.args,
            vec!["-not_airborne", "-city", "-coarse"]
        );
        assert!(!pipeline.stage("tile").unwrap().command.has_arg("-buffer"));
        assert_eq!(
            pipeline.stage("reverse").unwrap().input_pattern,
            "hugeFileGroundClassify*_g.laz"
        );
    }

    #[test]
    fn test_normalize_replaces_z() {
        let pipeline = normalize(&config(), &settings(), Path::new("/tmp/wd")).unwrap();

        assert_eq!(pipeline.stage("height").unwrap().spec.args, vec!["-replace_z"]);
        assert_eq!(
            pipeline.stage("reverse").unwrap().input_pattern,
            "hugeFileNormalize*_gh.laz"
        );
    }

    #[test]
    fn test_single_file_input() {
        let pipeline = classify(&config(), &settings(), Path::new("/tmp/wd")).unwrap();
        let tile = pipeline.stage("tile").unwrap();

        assert_eq!(tile.input_directory, PathBuf::from("/data"));
        assert_eq!(tile.input_pattern, "huge.laz");
    }

    #[test]
    fn test_raster_output_rejected() {
        let config = config().with(keys::OUTPUT, "/data/out.tif");
        assert!(classify(&config, &settings(), Path::new("/tmp/wd")).is_err());
    }
}
