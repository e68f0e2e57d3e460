//! Stage status enum.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How a stage's external process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    /// The external process exited successfully.
    Ok,
    /// The external process failed or could not be started.
    Fail,
    /// The stage was interrupted by cancellation.
    Cancel,
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => write!(f, "ok"),
            Self::Fail => write!(f, "fail"),
            Self::Cancel => write!(f, "cancel"),
        }
    }
}

impl StageStatus {
    /// Returns true if the status indicates success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_status_display() {
        assert_eq!(StageStatus::Ok.to_string(), "ok");
        assert_eq!(StageStatus::Fail.to_string(), "fail");
        assert_eq!(StageStatus::Cancel.to_string(), "cancel");
    }

    #[test]
    fn test_only_ok_is_success() {
        assert!(StageStatus::Ok.is_success());
        assert!(!StageStatus::Fail.is_success());
        assert!(!StageStatus::Cancel.is_success());
    }

    #[test]
    fn test_stage_status_serialize() {
        let status = StageStatus::Cancel;
        let json = serde_json::to_string(&status).unwrap();
        assert_eq!(json, r#""cancel""#);

        let deserialized: StageStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, StageStatus::Cancel);
    }
}
