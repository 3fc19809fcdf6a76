//! Identifiers shared across the harness.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of a pipeline stage, used in logs and reports.
///
/// # Example
/// ```
/// use liveprobe_common::StageName;
///
/// let stage = StageName::from("smoke");
/// assert_eq!(stage.as_str(), "smoke");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StageName(String);

impl StageName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for StageName {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for StageName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for StageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
