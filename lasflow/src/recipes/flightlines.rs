//! Canopy height models from overlapping flightlines.
//!
//! Both variants tile the flightlines, ground-classify and height-normalize
//! the tiles, then thin them keeping the highest return per cell. They
//! differ in how the thinned tiles are rasterized and merged.

use super::common::{
    folder_input, keys, non_negative, positive, raster_output, Terrain, DEFAULT_BUFFER,
    DEFAULT_STEP, DEFAULT_TILE_SIZE,
};
use crate::config::{Configuration, ToolSettings};
use crate::errors::ConfigurationError;
use crate::pipeline::{Pipeline, PipelineBuilder};
use crate::stages::{ArgBuilder, InputSelection, ProductNaming, StageSpec};
use std::path::{Path, PathBuf};

/// Spike-free variant name.
pub const SPIKE_FREE: &str = "flightlines-to-merged-chm";
/// Highest-return variant name.
pub const HIGHEST: &str = "flightlines-to-merged-chm-highest";

const DEFAULT_BEAM_WIDTH: f64 = 0.2;
const TILE_BASE: &str = "tile";

/// Validated options of the flightline recipes.
#[derive(Debug, Clone, PartialEq)]
pub struct FlightlineOptions {
    /// `<input folder>/<wildcard>`.
    pub input: PathBuf,
    /// Tile side length.
    pub tile_size: f64,
    /// Tile buffer, 0 disables.
    pub buffer: f64,
    /// Terrain type for ground classification.
    pub terrain: Terrain,
    /// Laser beam width, 0 disables the subcircle.
    pub beam_width: f64,
    /// Raster step.
    pub step: f64,
    /// Spike-free freeze value, 0 means three times the step.
    pub freeze_value: f64,
    /// Merged raster output.
    pub output: PathBuf,
}

impl FlightlineOptions {
    /// Reads and validates the options.
    pub fn from_config(config: &Configuration) -> Result<Self, ConfigurationError> {
        Ok(Self {
            input: folder_input(config)?,
            tile_size: positive(config, keys::TILE_SIZE, DEFAULT_TILE_SIZE)?,
            buffer: non_negative(config, keys::BUFFER, DEFAULT_BUFFER)?,
            terrain: config.parsed_or(keys::TERRAIN, Terrain::default())?,
            beam_width: non_negative(config, keys::BEAM_WIDTH, DEFAULT_BEAM_WIDTH)?,
            step: positive(config, keys::STEP, DEFAULT_STEP)?,
            freeze_value: non_negative(config, keys::FREEZE_VALUE, 0.0)?,
            output: raster_output(config)?,
        })
    }

    /// The freeze value handed to `-spike_free`.
    #[must_use]
    pub fn effective_freeze_value(&self) -> f64 {
        if self.freeze_value == 0.0 {
            3.0 * self.step
        } else {
            self.freeze_value
        }
    }

    /// The `-kill` distance for triangulation edges.
    #[must_use]
    pub fn kill_distance(&self) -> f64 {
        3.0 * self.step
    }
}

/// Tile, ground, height-normalize, thin, rasterize a zero DTM and a
/// spike-free CHM per tile, then merge everything into one raster.
pub fn spike_free(
    config: &Configuration,
    settings: &ToolSettings,
    working_dir: &Path,
) -> Result<Pipeline, ConfigurationError> {
    let options = FlightlineOptions::from_config(config)?;

    normalized_tiles(PipelineBuilder::new(SPIKE_FREE, settings.clone(), working_dir), &options)?
        .stage(
            StageSpec::new(
                "dtm",
                "las2dem",
                InputSelection::upstream("tile*_gh.laz", ["height"]),
                ProductNaming::derived_cut("_dtm", 3, "bil"),
            )
            .with_description("Rasterize ground points into zero-level DTM tiles")
            .with_args(
                ArgBuilder::new()
                    .option("-keep_class", "2")
                    .number("-thin_with_grid", options.step)
                    .flag("-use_tile_bb"),
            )?
            .multi_core(),
        )?
        .stage(
            StageSpec::new(
                "chm",
                "las2dem",
                InputSelection::upstream("tile*_ght.laz", ["thin"]),
                ProductNaming::derived_cut("_chm_sf", 4, "bil"),
            )
            .with_description("Rasterize thinned tiles into spike-free CHM tiles")
            .with_args(
                ArgBuilder::new()
                    .number("-step", options.step)
                    .number("-spike_free", options.effective_freeze_value())
                    .number("-kill", options.kill_distance())
                    .flag("-use_tile_bb"),
            )?
            .multi_core(),
        )?
        .stage(merge_stage("tile_*.bil", &["dtm", "chm"], &options)?)?
        .build()
}

/// Like [`spike_free`] but rasterizes the highest returns directly and
/// merges the CHM tiles only.
pub fn highest(
    config: &Configuration,
    settings: &ToolSettings,
    working_dir: &Path,
) -> Result<Pipeline, ConfigurationError> {
    let options = FlightlineOptions::from_config(config)?;

    normalized_tiles(PipelineBuilder::new(HIGHEST, settings.clone(), working_dir), &options)?
        .stage(
            StageSpec::new(
                "chm",
                "las2dem",
                InputSelection::upstream("tile*_ght.laz", ["thin"]),
                ProductNaming::derived_cut("_chm", 4, "bil"),
            )
            .with_description("Rasterize thinned tiles into CHM tiles")
            .with_args(
                ArgBuilder::new()
                    .number("-step", options.step)
                    .number("-kill", options.kill_distance())
                    .flag("-use_tile_bb"),
            )?
            .multi_core(),
        )?
        .stage(merge_stage("tile*_chm.bil", &["chm"], &options)?)?
        .build()
}

fn normalized_tiles(
    builder: PipelineBuilder,
    options: &FlightlineOptions,
) -> Result<PipelineBuilder, ConfigurationError> {
    let ground_args = ArgBuilder::new();
    let ground_args = match options.terrain.flag() {
        Some(flag) => ground_args.flag(&flag),
        None => ground_args,
    };
    let ground_args = match options.terrain.fineness().and_then(|g| g.flag()) {
        Some(flag) => ground_args.flag(&flag),
        None => ground_args,
    };

    builder
        .stage(
            StageSpec::new(
                "tile",
                "lastile",
                InputSelection::external(options.input.clone()),
                ProductNaming::tiles(TILE_BASE, "laz"),
            )
            .with_description("Tile the flightlines")
            .with_args(
                ArgBuilder::new()
                    .flag("-files_are_flightlines")
                    .number("-tile_size", options.tile_size)
                    .number_if_nonzero("-buffer", options.buffer),
            )?,
        )?
        .stage(
            StageSpec::new(
                "ground",
                "lasground",
                InputSelection::upstream("tile*.laz", ["tile"]),
                ProductNaming::derived("_g", "laz"),
            )
            .with_description("Ground-classify the tiles")
            .with_args(ground_args)?
            .multi_core(),
        )?
        .stage(
            StageSpec::new(
                "height",
                "lasheight",
                InputSelection::upstream("tile*_g.laz", ["ground"]),
                ProductNaming::derived("h", "laz"),
            )
            .with_description("Height-normalize the tiles")
            .with_args(ArgBuilder::new().flag("-replace_z"))?
            .multi_core(),
        )?
        .stage(
            StageSpec::new(
                "thin",
                "lasthin",
                InputSelection::upstream("tile*_gh.laz", ["height"]),
                ProductNaming::derived("t", "laz"),
            )
            .with_description("Keep the highest return per half-step cell")
            .with_args(
                ArgBuilder::new()
                    .number_if_nonzero("-subcircle", options.beam_width / 2.0)
                    .number("-step", options.step / 2.0)
                    .flag("-highest"),
            )?
            .multi_core(),
        )
}

fn merge_stage(
    pattern: &str,
    sources: &[&str],
    options: &FlightlineOptions,
) -> Result<StageSpec, ConfigurationError> {
    StageSpec::new(
        "merge",
        "lasgrid",
        InputSelection::upstream(pattern, sources.iter().copied()),
        ProductNaming::final_output(options.output.clone()),
    )
    .with_description("Merge the raster tiles into one output raster")
    .with_args(
        ArgBuilder::new()
            .flag("-merged")
            .number("-step", options.step)
            .flag("-highest"),
    )
}
