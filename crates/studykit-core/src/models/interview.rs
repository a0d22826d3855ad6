use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Interview format: in-depth interview or focus-group discussion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterviewKind {
    #[default]
    Idi,
    Fgd,
}

impl InterviewKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InterviewKind::Idi => "idi",
            InterviewKind::Fgd => "fgd",
        }
    }
}

impl fmt::Display for InterviewKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InterviewKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "idi" => Ok(InterviewKind::Idi),
            "fgd" => Ok(InterviewKind::Fgd),
            other => Err(format!("Unknown interview type '{}' (expected idi or fgd)", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interview {
    pub id: String,
    /// Weak reference; the participant may no longer exist.
    pub participant_id: String,
    #[serde(rename = "type", default)]
    pub kind: InterviewKind,
    #[serde(default)]
    pub notes: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub completed: bool,
}

/// `INT_<millis>` for an interview created at `at`.
pub fn interview_id(at: DateTime<Utc>) -> String {
    format!("INT_{}", at.timestamp_millis())
}
