//! Selecting stage inputs with glob patterns.

use crate::errors::{ConfigurationError, LasflowError};
use std::path::{Path, PathBuf, MAIN_SEPARATOR};

/// Resolves a glob pattern inside a directory.
pub trait FileMatcher: Send + Sync {
    /// Returns the files in `directory` whose names match `pattern`, sorted.
    fn matches(&self, directory: &Path, pattern: &str) -> Result<Vec<PathBuf>, LasflowError>;
}

/// File matcher backed by the `glob` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct GlobFileMatcher;

impl GlobFileMatcher {
    /// Creates a new matcher.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl FileMatcher for GlobFileMatcher {
    fn matches(&self, directory: &Path, pattern: &str) -> Result<Vec<PathBuf>, LasflowError> {
        // The directory is taken literally; only the file-name part is a pattern.
        let full = format!(
            "{}{}{}",
            glob::Pattern::escape(&directory.to_string_lossy()),
            MAIN_SEPARATOR,
            pattern
        );

        let entries = glob::glob(&full).map_err(|e| {
            ConfigurationError::new(format!("invalid input pattern '{pattern}': {e}"))
        })?;

        let mut files = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| LasflowError::Io(e.into()))?;
            if path.is_file() {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}

/// Returns true if `token` contains glob metacharacters.
#[must_use]
pub fn is_pattern(token: &str) -> bool {
    token.contains(['*', '?', '['])
}

/// Splits a caller-supplied input path into a directory and a file pattern.
///
/// `/data/strips/*.laz` becomes (`/data/strips`, `*.laz`). An existing file
/// or a name without metacharacters is escaped so that it only matches
/// itself, even when the name contains `[` or `?`.
#[must_use]
pub fn split_input_path(path: &Path) -> (PathBuf, String) {
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let pattern = if is_pattern(&name) && !path.is_file() {
        name
    } else {
        glob::Pattern::escape(&name)
    };
    (directory, pattern)
}
