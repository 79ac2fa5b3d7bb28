//! Recording commands
//!
//! Thin entry points over the session controller. Each call returns
//! promptly; segment work happens on the controller's worker.

use crate::recorder::controller::{SessionController, StartOutcome, StopOutcome};
use crate::recorder::error::RecordingResult;
use crate::recorder::state::SessionState;
use crate::storage::{list_segments, SegmentFile};
use std::path::PathBuf;
use std::sync::Arc;

/// Command surface exposed to control clients
#[derive(Clone)]
pub struct CommandGateway {
    controller: Arc<SessionController>,
    output_dir: PathBuf,
}

impl CommandGateway {
    pub fn new(controller: Arc<SessionController>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            controller,
            output_dir: output_dir.into(),
        }
    }

    pub fn controller(&self) -> &Arc<SessionController> {
        &self.controller
    }

    /// START; a no-op while a session is active
    pub fn start_recording(&self) -> RecordingResult<StartOutcome> {
        tracing::debug!("start_recording");
        self.controller.start()
    }

    /// STOP; a no-op while idle
    pub fn stop_recording(&self) -> StopOutcome {
        tracing::debug!("stop_recording");
        self.controller.stop()
    }

    /// True while running or still finalizing the last segment
    pub fn is_recording(&self) -> bool {
        self.controller.is_active()
    }

    pub fn recording_state(&self) -> SessionState {
        self.controller.state()
    }

    /// Segments currently on disk, oldest first
    pub fn list_segments(&self) -> std::io::Result<Vec<SegmentFile>> {
        list_segments(&self.output_dir)
    }
}
