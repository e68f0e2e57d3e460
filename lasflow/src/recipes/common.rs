//! Option keys, choice types and validated readers shared by recipes.

use crate::config::Configuration;
use crate::errors::ConfigurationError;
use crate::stages::ArgBuilder;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Option keys understood by the recipes.
pub mod keys {
    /// Input folder (flightline and folder recipes) or file (huge-file recipes).
    pub const INPUT: &str = "input";
    /// File-name wildcard applied inside the input folder.
    pub const INPUT_WILDCARD: &str = "input_wildcard";
    /// Final product path.
    pub const OUTPUT: &str = "output";
    /// Raster format used when the output path has no extension.
    pub const FORMAT: &str = "format";
    /// Output directory of folder recipes.
    pub const OUTPUT_DIRECTORY: &str = "output_directory";
    /// Output appendix of folder recipes.
    pub const OUTPUT_APPENDIX: &str = "output_appendix";
    /// Point format of folder recipes.
    pub const OUTPUT_FORMAT: &str = "output_format";
    /// Tile side length.
    pub const TILE_SIZE: &str = "tile_size";
    /// Tile buffer, 0 disables.
    pub const BUFFER: &str = "buffer";
    /// Terrain type.
    pub const TERRAIN: &str = "terrain";
    /// Ground-classification preprocessing granularity.
    pub const GRANULARITY: &str = "granularity";
    /// Airborne (true) or terrestrial/mobile (false) scan.
    pub const AIRBORNE: &str = "airborne";
    /// Laser beam width, 0 disables the subcircle.
    pub const BEAM_WIDTH: &str = "beam_width";
    /// Spike-free freeze value, 0 means three times the step.
    pub const FREEZE_VALUE: &str = "freeze_value";
    /// Raster step.
    pub const STEP: &str = "step";
    /// Free-form extra arguments, whitespace separated.
    pub const ADDITIONAL: &str = "additional";
}

/// Default tile side length.
pub const DEFAULT_TILE_SIZE: f64 = 1000.0;
/// Default tile buffer.
pub const DEFAULT_BUFFER: f64 = 25.0;
/// Default raster step.
pub const DEFAULT_STEP: f64 = 1.0;
/// Default input wildcard for folder inputs.
pub const DEFAULT_INPUT_WILDCARD: &str = "*.laz";

/// Terrain type, from the flattest to the most built-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Terrain {
    /// Archaeological sites.
    Archaeology,
    /// Steep, rough natural terrain.
    Wilderness,
    /// Ordinary natural landscapes.
    #[default]
    Nature,
    /// Small towns.
    Town,
    /// Cities with large buildings.
    City,
    /// Metropolitan areas with very large buildings.
    Metro,
}

impl Terrain {
    /// Every terrain type, in menu order.
    pub const ALL: &'static [Self] = &[
        Self::Archaeology,
        Self::Wilderness,
        Self::Nature,
        Self::Town,
        Self::City,
        Self::Metro,
    ];

    /// Returns the terrain name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Archaeology => "archaeology",
            Self::Wilderness => "wilderness",
            Self::Nature => "nature",
            Self::Town => "town",
            Self::City => "city",
            Self::Metro => "metro",
        }
    }

    /// The `-<terrain>` flag; nature is the tool default and has none.
    #[must_use]
    pub fn flag(self) -> Option<String> {
        (self != Self::Nature).then(|| format!("-{}", self.as_str()))
    }

    /// Ground search fineness used on tiled flightlines.
    #[must_use]
    pub fn fineness(self) -> Option<Granularity> {
        match self {
            Self::Archaeology | Self::Wilderness => None,
            Self::Nature => Some(Granularity::Fine),
            Self::Town => Some(Granularity::ExtraFine),
            Self::City | Self::Metro => Some(Granularity::UltraFine),
        }
    }
}

impl fmt::Display for Terrain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Terrain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_choice(s, Self::ALL, Self::as_str, "terrain")
    }
}

/// Ground-classification preprocessing granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Granularity {
    /// Coarse.
    Coarse,
    /// The tool default.
    #[default]
    Default,
    /// Fine.
    Fine,
    /// Extra fine.
    ExtraFine,
    /// Ultra fine.
    UltraFine,
}

impl Granularity {
    /// Every granularity, in menu order.
    pub const ALL: &'static [Self] = &[
        Self::Coarse,
        Self::Default,
        Self::Fine,
        Self::ExtraFine,
        Self::UltraFine,
    ];

    /// Returns the granularity name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Coarse => "coarse",
            Self::Default => "default",
            Self::Fine => "fine",
            Self::ExtraFine => "extra_fine",
            Self::UltraFine => "ultra_fine",
        }
    }

    /// The `-<granularity>` flag; the default has none.
    #[must_use]
    pub fn flag(self) -> Option<String> {
        (self != Self::Default).then(|| format!("-{}", self.as_str()))
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_choice(s, Self::ALL, Self::as_str, "granularity")
    }
}

fn parse_choice<T: Copy>(
    raw: &str,
    all: &[T],
    name: fn(T) -> &'static str,
    what: &str,
) -> Result<T, String> {
    let wanted = raw.trim().to_ascii_lowercase().replace('-', "_");
    all.iter().copied().find(|c| name(*c) == wanted).ok_or_else(|| {
        let names: Vec<&str> = all.iter().map(|c| name(*c)).collect();
        format!("unknown {what} '{raw}', expected one of {}", names.join(", "))
    })
}

/// Raster formats accepted for merged outputs.
pub const RASTER_FORMATS: &[&str] = &["tif", "bil", "asc", "img", "png", "jpg", "dtm", "xyz"];
/// Point formats accepted for point outputs.
pub const POINT_FORMATS: &[&str] = &["laz", "las", "bin", "txt"];

/// Reads a number that must be strictly positive.
pub fn positive(config: &Configuration, key: &str, default: f64) -> Result<f64, ConfigurationError> {
    let value = config.number_or(key, default)?;
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(ConfigurationError::for_option(
            key,
            format!("option '{key}' must be greater than 0, got {value}"),
        ))
    }
}

/// Reads a number that must be zero or positive; 0 is the disabled sentinel.
pub fn non_negative(
    config: &Configuration,
    key: &str,
    default: f64,
) -> Result<f64, ConfigurationError> {
    let value = config.number_or(key, default)?;
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(ConfigurationError::for_option(
            key,
            format!("option '{key}' must not be negative, got {value}"),
        ))
    }
}

/// Resolves a folder input to `<folder>/<wildcard>`.
pub fn folder_input(config: &Configuration) -> Result<PathBuf, ConfigurationError> {
    let folder = config.path(keys::INPUT)?;
    let wildcard = config
        .text_opt(keys::INPUT_WILDCARD)?
        .unwrap_or(DEFAULT_INPUT_WILDCARD);
    if wildcard.contains(['/', '\\']) {
        return Err(ConfigurationError::for_option(
            keys::INPUT_WILDCARD,
            format!("input wildcard '{wildcard}' must not contain a directory"),
        ));
    }
    Ok(folder.join(wildcard))
}

/// Resolves the merged raster output. A path already ending in a raster
/// extension is kept as given, in any letter case. Otherwise the configured
/// format (default `tif`) is appended to the full file name.
pub fn raster_output(config: &Configuration) -> Result<PathBuf, ConfigurationError> {
    let output = config.path(keys::OUTPUT)?;
    if extension_of(&output).is_some_and(|e| RASTER_FORMATS.contains(&e.as_str())) {
        return Ok(output);
    }

    let format = config
        .text_opt(keys::FORMAT)?
        .unwrap_or("tif")
        .trim_start_matches('.')
        .to_ascii_lowercase();
    if !RASTER_FORMATS.contains(&format.as_str()) {
        return Err(ConfigurationError::for_option(
            keys::FORMAT,
            format!(
                "unsupported raster format '{format}', expected one of {}",
                RASTER_FORMATS.join(", ")
            ),
        ));
    }
    let mut name = output.into_os_string();
    name.push(".");
    name.push(&format);
    Ok(PathBuf::from(name))
}

/// Resolves a point-cloud output file.
pub fn point_output(config: &Configuration) -> Result<PathBuf, ConfigurationError> {
    let output = config.path(keys::OUTPUT)?;
    match extension_of(&output) {
        Some(extension) if extension == "laz" || extension == "las" => Ok(output),
        Some(extension) => Err(ConfigurationError::for_option(
            keys::OUTPUT,
            format!("point output must be .las or .laz, got .{extension}"),
        )),
        None => Ok(output.with_extension("laz")),
    }
}

/// Reads an optional point format.
pub fn point_format(config: &Configuration) -> Result<Option<String>, ConfigurationError> {
    let Some(format) = config.text_opt(keys::OUTPUT_FORMAT)? else {
        return Ok(None);
    };
    let format = format.trim_start_matches('.').to_ascii_lowercase();
    if POINT_FORMATS.contains(&format.as_str()) {
        Ok(Some(format))
    } else {
        Err(ConfigurationError::for_option(
            keys::OUTPUT_FORMAT,
            format!(
                "unsupported point format '{format}', expected one of {}",
                POINT_FORMATS.join(", ")
            ),
        ))
    }
}

/// Splits the free-form `additional` option into argument tokens.
pub fn additional_args(config: &Configuration) -> Result<ArgBuilder, ConfigurationError> {
    let tokens: Vec<String> = config
        .text_opt(keys::ADDITIONAL)?
        .map(|text| text.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default();
    Ok(ArgBuilder::new().extra(tokens))
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .filter(|e| !e.is_empty())
}
