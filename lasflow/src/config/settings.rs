//! Tool-suite installation settings.
//!
//! These replace process-wide settings lookups: a [`ToolSettings`] value is
//! loaded once (defaults, then an optional JSON file, then `LASFLOW_*`
//! environment variables) and handed explicitly to every recipe.

use crate::errors::{ConfigurationError, LasflowError};
use crate::process::CommandLine;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

/// Environment variable overriding the tool-suite folder.
pub const ENV_LASTOOLS_DIR: &str = "LASFLOW_LASTOOLS_DIR";
/// Environment variable overriding the wine folder.
pub const ENV_WINE_DIR: &str = "LASFLOW_WINE_DIR";
/// Environment variable overriding the core count.
pub const ENV_CORES: &str = "LASFLOW_CORES";
/// Environment variable enabling verbose tool output.
pub const ENV_VERBOSE: &str = "LASFLOW_VERBOSE";

/// What to do when a tool exits successfully but prints warnings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningPolicy {
    /// Warnings are recorded on the result and otherwise ignored.
    Ignore,
    /// Warnings are recorded and logged.
    #[default]
    Log,
    /// Any warning fails the stage.
    Escalate,
}

impl fmt::Display for WarningPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ignore => write!(f, "ignore"),
            Self::Log => write!(f, "log"),
            Self::Escalate => write!(f, "escalate"),
        }
    }
}

impl FromStr for WarningPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ignore" => Ok(Self::Ignore),
            "log" => Ok(Self::Log),
            "escalate" => Ok(Self::Escalate),
            other => Err(format!(
                "unknown warning policy '{other}' (expected ignore, log or escalate)"
            )),
        }
    }
}

/// Where the tool suite lives and how its binaries are launched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolSettings {
    /// Installation folder; binaries are looked up in its `bin` folder.
    #[serde(default = "default_lastools_dir")]
    pub lastools_dir: PathBuf,
    /// Folder containing a `wine` binary. When set, the Windows binaries
    /// are launched through wine.
    #[serde(default)]
    pub wine_dir: Option<PathBuf>,
    /// Core count passed to multi-core capable tools.
    #[serde(default = "default_cores")]
    pub cores: u32,
    /// Whether tools are asked for verbose output.
    #[serde(default)]
    pub verbose: bool,
    /// Handling of warnings printed by successful tools.
    #[serde(default)]
    pub warning_policy: WarningPolicy,
}

fn default_lastools_dir() -> PathBuf {
    if cfg!(windows) {
        PathBuf::from(r"C:\LAStools")
    } else {
        PathBuf::from("/opt/LAStools")
    }
}

fn default_cores() -> u32 {
    4
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            lastools_dir: default_lastools_dir(),
            wine_dir: None,
            cores: default_cores(),
            verbose: false,
            warning_policy: WarningPolicy::default(),
        }
    }
}

impl ToolSettings {
    /// Creates settings with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the installation folder.
    #[must_use]
    pub fn with_lastools_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.lastools_dir = dir.into();
        self
    }

    /// Sets the wine folder.
    #[must_use]
    pub fn with_wine_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.wine_dir = Some(dir.into());
        self
    }

    /// Sets the core count.
    #[must_use]
    pub fn with_cores(mut self, cores: u32) -> Self {
        self.cores = cores;
        self
    }

    /// Enables or disables verbose tool output.
    #[must_use]
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Sets the warning policy.
    #[must_use]
    pub fn with_warning_policy(mut self, policy: WarningPolicy) -> Self {
        self.warning_policy = policy;
        self
    }

    /// Reads settings from a JSON file. Missing fields take their defaults.
    pub fn from_file(path: &Path) -> Result<Self, LasflowError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Loads defaults, the optional file, then environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, LasflowError> {
        let settings = match path {
            Some(path) => {
                debug!(path = %path.display(), "Loading tool settings");
                Self::from_file(path)?
            }
            None => Self::default(),
        };
        Ok(settings.with_env_overrides(|key| std::env::var(key).ok())?)
    }

    /// Applies `LASFLOW_*` overrides obtained from `lookup`.
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigurationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(ENV_LASTOOLS_DIR).filter(|v| !v.is_empty()) {
            self.lastools_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup(ENV_WINE_DIR) {
            self.wine_dir = if dir.is_empty() { None } else { Some(PathBuf::from(dir)) };
        }
        if let Some(cores) = lookup(ENV_CORES) {
            self.cores = cores.trim().parse().map_err(|_| {
                ConfigurationError::for_option(ENV_CORES, format!("'{cores}' is not a core count"))
            })?;
        }
        if let Some(verbose) = lookup(ENV_VERBOSE) {
            self.verbose = matches!(verbose.trim(), "1" | "true" | "yes" | "on");
        }
        Ok(self)
    }

    /// Checks the settings before any pipeline is built.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.cores == 0 {
            return Err(ConfigurationError::for_option("cores", "core count must be at least 1"));
        }
        if self.lastools_dir.as_os_str().is_empty() {
            return Err(ConfigurationError::for_option(
                "lastools_dir",
                "tool-suite folder must not be empty",
            ));
        }
        Ok(())
    }

    /// Returns true when multi-core tools should receive `-cores`.
    #[must_use]
    pub fn uses_multiple_cores(&self) -> bool {
        self.cores > 1
    }

    /// Returns the base command line for a tool, without arguments.
    #[must_use]
    pub fn tool_command(&self, tool: &str) -> CommandLine {
        let bin = self.lastools_dir.join("bin");
        match self.wine_dir {
            Some(ref wine) => CommandLine::new(wine.join("wine"))
                .arg(bin.join(format!("{tool}.exe")).display().to_string()),
            None if cfg!(windows) => CommandLine::new(bin.join(format!("{tool}.exe"))),
            None => CommandLine::new(bin.join(tool)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let settings = ToolSettings::default();
        assert_eq!(settings.cores, 4);
        assert!(!settings.verbose);
        assert!(settings.wine_dir.is_none());
        assert_eq!(settings.warning_policy, WarningPolicy::Log);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let settings: ToolSettings =
            serde_json::from_str(r#"{"lastools_dir": "/srv/lastools", "warning_policy": "escalate"}"#)
                .unwrap();

        assert_eq!(settings.lastools_dir, PathBuf::from("/srv/lastools"));
        assert_eq!(settings.cores, 4);
        assert_eq!(settings.warning_policy, WarningPolicy::Escalate);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            (ENV_LASTOOLS_DIR, "/usr/local/LAStools"),
            (ENV_CORES, "8"),
            (ENV_VERBOSE, "true"),
        ]
        .into_iter()
        .collect();

        let settings = ToolSettings::default()
            .with_env_overrides(|key| env.get(key).map(|v| (*v).to_string()))
            .unwrap();

        assert_eq!(settings.lastools_dir, PathBuf::from("/usr/local/LAStools"));
        assert_eq!(settings.cores, 8);
        assert!(settings.verbose);
    }

    #[test]
    fn test_env_override_bad_cores() {
        let err = ToolSettings::default()
            .with_env_overrides(|key| (key == ENV_CORES).then(|| "many".to_string()))
            .unwrap_err();
        assert_eq!(err.option.as_deref(), Some(ENV_CORES));
    }

    #[test]
    fn test_zero_cores_invalid() {
        assert!(ToolSettings::default().with_cores(0).validate().is_err());
    }

    #[test]
    fn test_tool_command_through_wine() {
        let settings = ToolSettings::default()
            .with_lastools_dir("/opt/LAStools")
            .with_wine_dir("/usr/bin");

        let command = settings.tool_command("lasground");
        assert_eq!(command.program, PathBuf::from("/usr/bin/wine"));
        assert_eq!(command.args.len(), 1);
        assert!(command.args[0].ends_with("lasground.exe"));
    }

    #[cfg(not(windows))]
    #[test]
    fn test_tool_command_native() {
        let settings = ToolSettings::default().with_lastools_dir("/opt/LAStools");
        let command = settings.tool_command("lastile");

        assert_eq!(command.program, PathBuf::from("/opt/LAStools/bin/lastile"));
        assert!(command.args.is_empty());
    }

    #[test]
    fn test_warning_policy_parse() {
        assert_eq!("Escalate".parse::<WarningPolicy>().unwrap(), WarningPolicy::Escalate);
        assert!("loud".parse::<WarningPolicy>().is_err());
    }
}
