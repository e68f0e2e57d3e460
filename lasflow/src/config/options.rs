//! Immutable option snapshots that recipes read when building a pipeline.

use crate::errors::{ConfigurationError, LasflowError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// A single option value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    /// A boolean switch.
    Bool(bool),
    /// An integer (core counts, enum indices).
    Integer(i64),
    /// A floating point number.
    Number(f64),
    /// Text: paths, choices and free-form arguments.
    Text(String),
}

impl OptionValue {
    fn kind(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Integer(_) => "integer",
            Self::Number(_) => "number",
            Self::Text(_) => "text",
        }
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Integer(v) => write!(f, "{v}"),
            Self::Number(v) => write!(f, "{v}"),
            Self::Text(v) => f.write_str(v),
        }
    }
}

impl From<bool> for OptionValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for OptionValue {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<u32> for OptionValue {
    fn from(v: u32) -> Self {
        Self::Integer(i64::from(v))
    }
}

impl From<f64> for OptionValue {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

impl From<&str> for OptionValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<PathBuf> for OptionValue {
    fn from(v: PathBuf) -> Self {
        Self::Text(v.display().to_string())
    }
}

/// An immutable mapping from option name to value.
///
/// A snapshot is assembled once (from CLI flags or a JSON document) before a
/// pipeline is built. Recipes only read from it; the typed getters turn a
/// missing or mistyped option into a [`ConfigurationError`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Configuration {
    values: BTreeMap<String, OptionValue>,
}

impl Configuration {
    /// Creates an empty configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy with `key` set to `value`.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<OptionValue>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Returns a copy with `key` set when `value` is present.
    #[must_use]
    pub fn with_opt<V: Into<OptionValue>>(self, key: impl Into<String>, value: Option<V>) -> Self {
        match value {
            Some(value) => self.with(key, value),
            None => self,
        }
    }

    /// Parses a configuration from a JSON object.
    pub fn from_json(json: &str) -> Result<Self, LasflowError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Returns the raw value for a key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&OptionValue> {
        self.values.get(key)
    }

    /// Returns true if the key is present.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Returns the option names in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Reads a number. Integers are widened.
    pub fn number(&self, key: &str) -> Result<f64, ConfigurationError> {
        match self.require(key)? {
            OptionValue::Number(v) => Ok(*v),
            #[allow(clippy::cast_precision_loss)]
            OptionValue::Integer(v) => Ok(*v as f64),
            other => Err(type_mismatch(key, "number", other)),
        }
    }

    /// Reads a number, falling back to `default` when absent.
    pub fn number_or(&self, key: &str, default: f64) -> Result<f64, ConfigurationError> {
        if self.contains(key) {
            self.number(key)
        } else {
            Ok(default)
        }
    }

    /// Reads an integer.
    pub fn integer(&self, key: &str) -> Result<i64, ConfigurationError> {
        match self.require(key)? {
            OptionValue::Integer(v) => Ok(*v),
            other => Err(type_mismatch(key, "integer", other)),
        }
    }

    /// Reads a boolean, falling back to `default` when absent.
    pub fn bool_or(&self, key: &str, default: bool) -> Result<bool, ConfigurationError> {
        match self.get(key) {
            None => Ok(default),
            Some(OptionValue::Bool(v)) => Ok(*v),
            Some(other) => Err(type_mismatch(key, "bool", other)),
        }
    }

    /// Reads a text value.
    pub fn text(&self, key: &str) -> Result<&str, ConfigurationError> {
        match self.require(key)? {
            OptionValue::Text(v) => Ok(v.as_str()),
            other => Err(type_mismatch(key, "text", other)),
        }
    }

    /// Reads a text value, returning `None` when absent or blank.
    pub fn text_opt(&self, key: &str) -> Result<Option<&str>, ConfigurationError> {
        if !self.contains(key) {
            return Ok(None);
        }
        let value = self.text(key)?;
        Ok(if value.trim().is_empty() { None } else { Some(value) })
    }

    /// Reads a required, non-empty path.
    pub fn path(&self, key: &str) -> Result<PathBuf, ConfigurationError> {
        self.text_opt(key)?
            .map(PathBuf::from)
            .ok_or_else(|| ConfigurationError::for_option(key, format!("option '{key}' requires a path")))
    }

    /// Reads an optional path.
    pub fn path_opt(&self, key: &str) -> Result<Option<PathBuf>, ConfigurationError> {
        Ok(self.text_opt(key)?.map(PathBuf::from))
    }

    /// Parses a text option (a choice such as a terrain type), falling back
    /// to `default` when absent.
    pub fn parsed_or<T>(&self, key: &str, default: T) -> Result<T, ConfigurationError>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        match self.text_opt(key)? {
            None => Ok(default),
            Some(raw) => raw
                .parse()
                .map_err(|e| ConfigurationError::for_option(key, format!("option '{key}': {e}"))),
        }
    }

    fn require(&self, key: &str) -> Result<&OptionValue, ConfigurationError> {
        self.get(key)
            .ok_or_else(|| ConfigurationError::for_option(key, format!("missing required option '{key}'")))
    }
}

fn type_mismatch(key: &str, expected: &str, found: &OptionValue) -> ConfigurationError {
    ConfigurationError::for_option(
        key,
        format!(
            "option '{key}' expects a {expected} value, found {} '{found}'",
            found.kind()
        ),
    )
}
