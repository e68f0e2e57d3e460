//! Ready-made settings and configurations for tests and benchmarks.

use crate::config::{Configuration, ToolSettings};
use crate::recipes::keys;

/// Tool settings pointing at a fixed install path, 4 cores, quiet.
#[must_use]
pub fn test_settings() -> ToolSettings {
    ToolSettings::default()
        .with_lastools_dir("/opt/LAStools")
        .with_cores(4)
}

/// A complete flightline configuration: 1000 m tiles with a 25 m buffer,
/// nature terrain, 0.2 m beam, 2 m step, automatic freeze value.
#[must_use]
pub fn flightlines_config() -> Configuration {
    Configuration::new()
        .with(keys::INPUT, "/data/strips")
        .with(keys::OUTPUT, "/data/chm.tif")
        .with(keys::TILE_SIZE, 1000.0)
        .with(keys::BUFFER, 25.0)
        .with(keys::TERRAIN, "nature")
        .with(keys::BEAM_WIDTH, 0.2)
        .with(keys::STEP, 2.0)
        .with(keys::FREEZE_VALUE, 0.0)
}

/// A huge-file configuration with default tiling.
#[must_use]
pub fn huge_file_config() -> Configuration {
    Configuration::new()
        .with(keys::INPUT, "/data/huge.laz")
        .with(keys::OUTPUT, "/data/huge_out.laz")
}
