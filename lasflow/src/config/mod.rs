//! Run configuration.
//!
//! - [`Configuration`]: the per-run option snapshot recipes read from
//! - [`ToolSettings`]: where the tool suite is installed and how it is launched

mod options;
mod settings;

pub use options::{Configuration, OptionValue};
pub use settings::{
    ToolSettings, WarningPolicy, ENV_CORES, ENV_LASTOOLS_DIR, ENV_VERBOSE, ENV_WINE_DIR,
};
