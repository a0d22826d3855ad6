use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::interview::InterviewKind;

/// Audio captured during the current session.
///
/// Never persisted: only the count survives in the stored dataset. The
/// blob is whatever the host capture API handed over, kept opaque.
#[derive(Debug, Clone)]
pub struct AudioRecording {
    pub id: String,
    pub participant_id: String,
    pub kind: InterviewKind,
    pub blob: Arc<[u8]>,
    /// Playable locator handed back to the rendering layer.
    pub locator: String,
    pub timestamp: DateTime<Utc>,
    /// Placeholder, not computed.
    pub duration_secs: f64,
}

/// `REC_<millis>` for a recording finished at `at`.
pub fn recording_id(at: DateTime<Utc>) -> String {
    format!("REC_{}", at.timestamp_millis())
}
