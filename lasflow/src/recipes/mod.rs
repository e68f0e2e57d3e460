//! Ready-made pipelines.
//!
//! Every recipe reads a [`Configuration`], validates it, and returns a built
//! [`Pipeline`]. Recipes are tables of stage templates; no recipe launches
//! anything.

mod common;
pub mod flightlines;
pub mod huge_file;
pub mod tools;

pub use common::{
    additional_args, folder_input, keys, non_negative, point_format, point_output, positive,
    raster_output, Granularity, Terrain, DEFAULT_BUFFER, DEFAULT_INPUT_WILDCARD, DEFAULT_STEP,
    DEFAULT_TILE_SIZE, POINT_FORMATS, RASTER_FORMATS,
};

use crate::config::{Configuration, ToolSettings};
use crate::errors::ConfigurationError;
use crate::pipeline::Pipeline;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// The available recipes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Recipe {
    /// Flightlines to a merged spike-free canopy height model.
    FlightlinesToMergedChm,
    /// Flightlines to a merged highest-return canopy height model.
    FlightlinesToMergedChmHighest,
    /// Classify one huge file.
    HugeFileClassify,
    /// Ground-classify one huge file.
    HugeFileGroundClassify,
    /// Height-normalize one huge file.
    HugeFileNormalize,
    /// Sort a folder of files.
    LasSort,
    /// Remove duplicates from a folder of files.
    LasDuplicate,
}

type BuildFn = fn(&Configuration, &ToolSettings, &Path) -> Result<Pipeline, ConfigurationError>;

impl Recipe {
    /// Every recipe.
    pub const ALL: &'static [Self] = &[
        Self::FlightlinesToMergedChm,
        Self::FlightlinesToMergedChmHighest,
        Self::HugeFileClassify,
        Self::HugeFileGroundClassify,
        Self::HugeFileNormalize,
        Self::LasSort,
        Self::LasDuplicate,
    ];

    /// Returns the recipe name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::FlightlinesToMergedChm => flightlines::SPIKE_FREE,
            Self::FlightlinesToMergedChmHighest => flightlines::HIGHEST,
            Self::HugeFileClassify => huge_file::CLASSIFY,
            Self::HugeFileGroundClassify => huge_file::GROUND_CLASSIFY,
            Self::HugeFileNormalize => huge_file::NORMALIZE,
            Self::LasSort => tools::LASSORT,
            Self::LasDuplicate => tools::LASDUPLICATE,
        }
    }

    /// Returns a one-line description.
    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            Self::FlightlinesToMergedChm => {
                "tile flightlines and merge spike-free CHM tiles into one raster"
            }
            Self::FlightlinesToMergedChmHighest => {
                "tile flightlines and merge highest-return CHM tiles into one raster"
            }
            Self::HugeFileClassify => "classify ground, buildings and vegetation of one huge file",
            Self::HugeFileGroundClassify => "ground-classify one huge file",
            Self::HugeFileNormalize => "height-normalize one huge file",
            Self::LasSort => "sort the points of every file in a folder",
            Self::LasDuplicate => "remove duplicate points from every file in a folder",
        }
    }

    fn builder(self) -> BuildFn {
        match self {
            Self::FlightlinesToMergedChm => flightlines::spike_free,
            Self::FlightlinesToMergedChmHighest => flightlines::highest,
            Self::HugeFileClassify => huge_file::classify,
            Self::HugeFileGroundClassify => huge_file::ground_classify,
            Self::HugeFileNormalize => huge_file::normalize,
            Self::LasSort => tools::lassort,
            Self::LasDuplicate => tools::lasduplicate,
        }
    }

    /// Builds the pipeline for `config`.
    pub fn build(
        self,
        config: &Configuration,
        settings: &ToolSettings,
        working_dir: &Path,
    ) -> Result<Pipeline, ConfigurationError> {
        (self.builder())(config, settings, working_dir)
    }
}

impl fmt::Display for Recipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Recipe {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|r| r.name() == s.trim())
            .ok_or_else(|| {
                let names: Vec<&str> = Self::ALL.iter().map(|r| r.name()).collect();
                ConfigurationError::new(format!(
                    "unknown recipe '{s}', expected one of {}",
                    names.join(", ")
                ))
            })
    }
}
