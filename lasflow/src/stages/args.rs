//! Typed argument-vector builder.
//!
//! Tool arguments are collected as (condition -> tokens) pairs and checked
//! once, in [`ArgBuilder::finish`], so a malformed flag is reported as a
//! [`ConfigurationError`] before any external process starts.

use crate::errors::ConfigurationError;
use std::path::Path;

/// Renders a number the way the tool suite's own front ends do: integral
/// values keep one decimal place (`1000.0`), others use the shortest exact
/// representation (`0.1`).
#[must_use]
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

/// Builder for the tool-specific part of an argument vector.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArgBuilder {
    tokens: Vec<String>,
    problems: Vec<String>,
}

impl ArgBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a bare flag such as `-reversible`.
    #[must_use]
    pub fn flag(mut self, name: &str) -> Self {
        self.check_name(name);
        self.tokens.push(name.to_string());
        self
    }

    /// Appends a flag when `condition` holds.
    #[must_use]
    pub fn flag_if(self, condition: bool, name: &str) -> Self {
        if condition {
            self.flag(name)
        } else {
            self
        }
    }

    /// Appends an option and its value.
    #[must_use]
    pub fn option(mut self, name: &str, value: impl Into<String>) -> Self {
        self.check_name(name);
        let value = value.into();
        if value.trim().is_empty() {
            self.problems.push(format!("option '{name}' has an empty value"));
        }
        self.tokens.push(name.to_string());
        self.tokens.push(value);
        self
    }

    /// Appends an option and its value when `condition` holds.
    #[must_use]
    pub fn option_if(self, condition: bool, name: &str, value: impl Into<String>) -> Self {
        if condition {
            self.option(name, value)
        } else {
            self
        }
    }

    /// Appends an option whose value is a path.
    #[must_use]
    pub fn path(self, name: &str, path: &Path) -> Self {
        self.option(name, path.display().to_string())
    }

    /// Appends a numeric option.
    #[must_use]
    pub fn number(mut self, name: &str, value: f64) -> Self {
        if !value.is_finite() {
            self.problems.push(format!("option '{name}' has a non-finite value {value}"));
        }
        self.option(name, format_number(value))
    }

    /// Appends a numeric option unless the value is the disabled sentinel 0.
    #[must_use]
    pub fn number_if_nonzero(self, name: &str, value: f64) -> Self {
        if value == 0.0 {
            self
        } else {
            self.number(name, value)
        }
    }

    /// Appends an integer option.
    #[must_use]
    pub fn integer(self, name: &str, value: i64) -> Self {
        self.option(name, value.to_string())
    }

    /// Appends free-form tokens (user supplied extra arguments).
    #[must_use]
    pub fn extra<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for token in tokens {
            let token = token.into();
            if token.is_empty() {
                self.problems.push("empty argument token".to_string());
            }
            self.tokens.push(token);
        }
        self
    }

    /// Appends everything from another builder, problems included.
    #[must_use]
    pub fn append(mut self, other: Self) -> Self {
        self.tokens.extend(other.tokens);
        self.problems.extend(other.problems);
        self
    }

    /// Returns the number of tokens collected so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Returns true if no tokens were collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Validates and returns the tokens.
    pub fn finish(self) -> Result<Vec<String>, ConfigurationError> {
        if self.problems.is_empty() {
            Ok(self.tokens)
        } else {
            Err(ConfigurationError::new(format!(
                "invalid arguments: {}",
                self.problems.join("; ")
            )))
        }
    }

    fn check_name(&mut self, name: &str) {
        let valid = name.len() > 1
            && name.starts_with('-')
            && !name.chars().any(char::is_whitespace);
        if !valid {
            self.problems.push(format!("'{name}' is not a valid option name"));
        }
    }
}
