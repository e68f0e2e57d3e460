//! Input selection and product naming for stage templates.
//!
//! Intermediate products live in the run's working directory and are
//! chained by suffix: a stage's input glob is `<base>*<accumulated
//! suffix>.<ext>`. [`ProductNaming::sample_product`] predicts the file name a
//! stage writes for one representative tile so the chain can be checked
//! before anything runs.

use super::args::ArgBuilder;
use crate::errors::ConfigurationError;
use std::path::{Path, PathBuf};

/// Tile origin used when predicting product names.
pub const SAMPLE_TILE_ORIGIN: &str = "630000_4834000";

/// Where a stage reads its input from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSelection {
    /// Files supplied by the caller: a single path or a `folder/*.laz`
    /// style pattern.
    External {
        /// Path or pattern as given.
        path: PathBuf,
    },
    /// Products of earlier stages in the working directory.
    Upstream {
        /// File-name glob relative to the working directory.
        pattern: String,
        /// Names of the stages whose products the glob is meant to select.
        sources: Vec<String>,
    },
}

impl InputSelection {
    /// Selects caller-supplied files.
    pub fn external(path: impl Into<PathBuf>) -> Self {
        Self::External { path: path.into() }
    }

    /// Selects products of the named earlier stages.
    pub fn upstream<I, S>(pattern: impl Into<String>, sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Upstream {
            pattern: pattern.into(),
            sources: sources.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns the upstream stage names (empty for external input).
    #[must_use]
    pub fn sources(&self) -> &[String] {
        match self {
            Self::External { .. } => &[],
            Self::Upstream { sources, .. } => sources,
        }
    }
}

/// How a stage names what it writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProductNaming {
    /// Tiles named `<base>_<origin>.<ext>` in the working directory.
    Tiles {
        /// Base name passed with `-o`.
        base: String,
        /// File extension.
        extension: String,
    },
    /// One product per input in the working directory: the input stem with
    /// `cut` trailing characters removed and `appendix` added.
    Derived {
        /// Suffix passed with `-odix`.
        appendix: String,
        /// Characters removed from the input stem (`-ocut`), 0 for none.
        cut: usize,
        /// Output format passed as `-o<ext>`.
        extension: String,
    },
    /// A single final product at a caller-chosen path.
    Final {
        /// Output path passed with `-o`.
        path: PathBuf,
    },
    /// Caller-controlled directory, appendix and format.
    Directory {
        /// Output directory (`-odir`); next to the inputs when absent.
        directory: Option<PathBuf>,
        /// Appendix (`-odix`).
        appendix: Option<String>,
        /// Point format (`-o<fmt>`).
        format: Option<String>,
    },
}

impl ProductNaming {
    /// Tiles with the given base name and extension.
    pub fn tiles(base: impl Into<String>, extension: impl Into<String>) -> Self {
        Self::Tiles {
            base: base.into(),
            extension: extension.into(),
        }
    }

    /// Per-input products with an appendix.
    pub fn derived(appendix: impl Into<String>, extension: impl Into<String>) -> Self {
        Self::derived_cut(appendix, 0, extension)
    }

    /// Per-input products with trailing characters cut before the appendix.
    pub fn derived_cut(
        appendix: impl Into<String>,
        cut: usize,
        extension: impl Into<String>,
    ) -> Self {
        Self::Derived {
            appendix: appendix.into(),
            cut,
            extension: extension.into(),
        }
    }

    /// A final product at `path`.
    pub fn final_output(path: impl Into<PathBuf>) -> Self {
        Self::Final { path: path.into() }
    }

    /// Output arguments for this naming scheme.
    #[must_use]
    pub fn args(&self, working_dir: &Path) -> ArgBuilder {
        match self {
            Self::Tiles { base, extension } => ArgBuilder::new()
                .path("-odir", working_dir)
                .option("-o", format!("{base}.{extension}")),
            Self::Derived {
                appendix,
                cut,
                extension,
            } => ArgBuilder::new()
                .path("-odir", working_dir)
                .option_if(*cut > 0, "-ocut", cut.to_string())
                .option("-odix", appendix.as_str())
                .flag(&format!("-o{extension}")),
            Self::Final { path } => ArgBuilder::new().path("-o", path),
            Self::Directory {
                directory,
                appendix,
                format,
            } => {
                let mut args = ArgBuilder::new();
                if let Some(directory) = directory {
                    args = args.path("-odir", directory);
                }
                if let Some(appendix) = appendix {
                    args = args.option("-odix", appendix.as_str());
                }
                if let Some(format) = format {
                    args = args.flag(&format!("-o{format}"));
                }
                args
            }
        }
    }

    /// Predicts the file name written for one tile whose input stem is
    /// `input_stem`. Returns `None` for products outside the working
    /// directory.
    pub fn sample_product(&self, input_stem: &str) -> Result<Option<String>, ConfigurationError> {
        match self {
            Self::Tiles { base, extension } => {
                Ok(Some(format!("{base}_{SAMPLE_TILE_ORIGIN}.{extension}")))
            }
            Self::Derived {
                appendix,
                cut,
                extension,
            } => {
                let length = input_stem.chars().count();
                if *cut > length {
                    return Err(ConfigurationError::new(format!(
                        "cannot cut {cut} characters from '{input_stem}'"
                    )));
                }
                let kept: String = input_stem.chars().take(length - cut).collect();
                Ok(Some(format!("{kept}{appendix}.{extension}")))
            }
            Self::Final { .. } | Self::Directory { .. } => Ok(None),
        }
    }
}

/// Returns the file name without its last extension.
#[must_use]
pub fn file_stem(name: &str) -> &str {
    match name.rfind('.') {
        Some(index) if index > 0 => &name[..index],
        _ => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_tiles_args_and_sample() {
        let naming = ProductNaming::tiles("tile", "laz");
        let args = naming.args(Path::new("/tmp/run")).finish().unwrap();

        assert_eq!(args, vec!["-odir", "/tmp/run", "-o", "tile.laz"]);
        assert_eq!(
            naming.sample_product("ignored").unwrap().as_deref(),
            Some("tile_630000_4834000.laz")
        );
    }

    #[test]
    fn test_derived_chain() {
        let ground = ProductNaming::derived("_g", "laz");
        let height = ProductNaming::derived("h", "laz");
        let dtm = ProductNaming::derived_cut("_dtm", 3, "bil");

        let g = ground.sample_product("tile_630000_4834000").unwrap().unwrap();
        let gh = height.sample_product(file_stem(&g)).unwrap().unwrap();
        let surface = dtm.sample_product(file_stem(&gh)).unwrap().unwrap();

        assert_eq!(g, "tile_630000_4834000_g.laz");
        assert_eq!(gh, "tile_630000_4834000_gh.laz");
        assert_eq!(surface, "tile_630000_4834000_dtm.bil");
        assert_eq!(
            dtm.args(Path::new("wd")).finish().unwrap(),
            vec!["-odir", "wd", "-ocut", "3", "-odix", "_dtm", "-obil"]
        );
    }

    #[test]
    fn test_cut_longer_than_stem() {
        let naming = ProductNaming::derived_cut("_x", 10, "laz");
        assert!(naming.sample_product("short").is_err());
    }

    #[test]
    fn test_final_and_directory() {
        let final_output = ProductNaming::final_output("/data/chm.tif");
        assert_eq!(
            final_output.args(Path::new("wd")).finish().unwrap(),
            vec!["-o", "/data/chm.tif"]
        );
        assert_eq!(final_output.sample_product("x").unwrap(), None);

        let directory = ProductNaming::Directory {
            directory: Some(PathBuf::from("out")),
            appendix: None,
            format: Some("laz".to_string()),
        };
        assert_eq!(
            directory.args(Path::new("wd")).finish().unwrap(),
            vec!["-odir", "out", "-olaz"]
        );
    }

    #[test]
    fn test_file_stem() {
        assert_eq!(file_stem("tile_1_g.laz"), "tile_1_g");
        assert_eq!(file_stem("noext"), "noext");
        assert_eq!(file_stem(".hidden"), ".hidden");
    }
}
