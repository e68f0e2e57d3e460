//! Stage templates and argument building.
//!
//! A stage is data: which tool to run, where its input comes from, how its
//! products are named, and the tool-specific arguments. There is no type per
//! tool.

mod args;
mod naming;
mod spec;

pub use args::{format_number, ArgBuilder};
pub use naming::{file_stem, InputSelection, ProductNaming, SAMPLE_TILE_ORIGIN};
pub use spec::StageSpec;
