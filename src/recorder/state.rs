//! Recording state management
//!
//! Defines the session state machine and the records produced per segment.

use crate::capture::capability::EncoderConfig;
use crate::recorder::error::RecordingError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use uuid::Uuid;

/// Current state of the capture session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// No session, no resource held
    #[default]
    Idle,
    /// Rotation loop is producing segments
    Running,
    /// STOP received; waiting for the in-flight segment to finalize
    Stopping,
}

impl SessionState {
    /// True while a worker exists
    pub fn is_active(&self) -> bool {
        !matches!(self, SessionState::Idle)
    }
}

/// Why a segment ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TerminationReason {
    /// Reached the maximum segment duration with the session still running
    NaturalTimeout,
    /// The continuation flag went false first
    UserStop,
    /// The resource failed mid-segment
    Error,
}

/// Successful result of one `run_segment` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentOutcome {
    pub path: PathBuf,
    pub reason: TerminationReason,
    pub elapsed: Duration,
}

/// One segment as seen by the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentRecord {
    /// Position within the session (0, 1, 2, ...)
    pub index: usize,
    pub path: PathBuf,
    pub config: EncoderConfig,
    pub reason: TerminationReason,
    pub elapsed: Duration,
}

/// Everything a finished session produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub session_id: Uuid,
    pub segments: Vec<SegmentRecord>,
    /// Set when the session ended because of an error
    pub error: Option<RecordingError>,
}

impl SessionSummary {
    pub fn new(session_id: Uuid) -> Self {
        Self {
            session_id,
            segments: Vec::new(),
            error: None,
        }
    }

    /// Segments that were finalized without error
    pub fn completed_segments(&self) -> impl Iterator<Item = &SegmentRecord> {
        self.segments
            .iter()
            .filter(|s| s.reason != TerminationReason::Error)
    }
}

/// Events emitted to the presence/notification collaborator
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Session entered `Running`
    Started { session_id: Uuid },
    /// A segment finished (any reason)
    SegmentCompleted {
        session_id: Uuid,
        record: SegmentRecord,
    },
    /// Session returned to `Idle` without error
    Stopped {
        session_id: Uuid,
        segment_count: usize,
    },
    /// START was rejected or the session ended with an error
    Failed {
        session_id: Option<Uuid>,
        error: RecordingError,
    },
}
