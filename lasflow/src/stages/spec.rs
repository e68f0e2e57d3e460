//! Stage templates.

use super::args::ArgBuilder;
use super::naming::{InputSelection, ProductNaming};
use crate::errors::ConfigurationError;

/// A stage template: one invocation of one tool.
///
/// Templates are plain data. The pipeline builder turns a list of them into
/// concrete command lines once the tool settings and working directory are
/// known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageSpec {
    /// Stage name, unique within a pipeline.
    pub name: String,
    /// Executable name without platform suffix, e.g. `lasground`.
    pub tool: String,
    /// Human readable description.
    pub description: String,
    /// Input selection.
    pub input: InputSelection,
    /// Output naming.
    pub output: ProductNaming,
    /// Tool-specific arguments, already validated.
    pub args: Vec<String>,
    /// Whether the tool accepts `-cores`.
    pub multi_core: bool,
}

impl StageSpec {
    /// Creates a template with no tool-specific arguments.
    pub fn new(
        name: impl Into<String>,
        tool: impl Into<String>,
        input: InputSelection,
        output: ProductNaming,
    ) -> Self {
        Self {
            name: name.into(),
            tool: tool.into(),
            description: String::new(),
            input,
            output,
            args: Vec::new(),
            multi_core: false,
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the tool-specific arguments.
    pub fn with_args(mut self, args: ArgBuilder) -> Result<Self, ConfigurationError> {
        self.args = args
            .finish()
            .map_err(|e| e.with_stage(self.name.clone()))?;
        Ok(self)
    }

    /// Marks the tool as accepting `-cores`.
    #[must_use]
    pub fn multi_core(mut self) -> Self {
        self.multi_core = true;
        self
    }

    /// Checks the template on its own.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.name.trim().is_empty() {
            return Err(ConfigurationError::new("stage name must not be empty"));
        }
        let tool_ok = !self.tool.is_empty()
            && self
                .tool
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !tool_ok {
            return Err(ConfigurationError::new(format!(
                "'{}' is not a valid tool name",
                self.tool
            ))
            .with_stage(self.name.clone()));
        }
        if self.input.sources().iter().any(|s| s == &self.name) {
            return Err(ConfigurationError::new("stage reads its own products")
                .with_stage(self.name.clone()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ground() -> StageSpec {
        StageSpec::new(
            "ground",
            "lasground",
            InputSelection::upstream("tile*.laz", ["tile"]),
            ProductNaming::derived("_g", "laz"),
        )
    }

    #[test]
    fn test_with_args() {
        let spec = ground()
            .with_args(ArgBuilder::new().flag("-fine"))
            .unwrap()
            .multi_core();

        assert_eq!(spec.args, vec!["-fine"]);
        assert!(spec.multi_core);
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn test_with_args_reports_stage() {
        let err = ground().with_args(ArgBuilder::new().flag("fine")).unwrap_err();
        assert_eq!(err.stage.as_deref(), Some("ground"));
    }

    #[test]
    fn test_validate_rejects_bad_templates() {
        let mut spec = ground();
        spec.tool = "las ground".to_string();
        assert!(spec.validate().is_err());

        let looped = StageSpec::new(
            "ground",
            "lasground",
            InputSelection::upstream("tile*_g.laz", ["ground"]),
            ProductNaming::derived("_g", "laz"),
        );
        assert!(looped.validate().is_err());
    }
}
