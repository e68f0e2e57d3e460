//! Core domain types shared by the pipeline and process layers.

mod status;

pub use status::StageStatus;
