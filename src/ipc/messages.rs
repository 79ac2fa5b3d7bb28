//! Control requests and responses

use crate::recorder::state::SessionState;
use crate::storage::SegmentFile;
use crate::utils::error::ErrorResponse;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Request from a control client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// Begin recording
    Start,
    /// Finish the current segment and go idle
    Stop,
    /// Whether a session is active
    Status,
    /// Segment files in the output directory
    ListSegments,
}

/// Response from the daemon
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    Started { session_id: Uuid },
    /// START while a session was already active
    AlreadyActive,
    Stopping,
    /// STOP while idle
    NotRunning,
    Status { active: bool, state: SessionState },
    Segments { files: Vec<SegmentFile> },
    Error { code: String, message: String },
}

impl Response {
    pub fn error(error: impl Into<ErrorResponse>) -> Self {
        let ErrorResponse { code, message } = error.into();
        Response::Error { code, message }
    }
}
