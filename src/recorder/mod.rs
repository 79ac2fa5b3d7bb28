//! Recording system module
//!
//! This module implements the segmented capture architecture:
//! - SessionController state machine and rotation loop
//! - SegmentRecorder driving one resource per segment
//! - Clock abstraction for the bounded wait

pub mod clock;
pub mod controller;
pub mod error;
pub mod segment;
pub mod state;

pub use clock::{Clock, SystemClock};
pub use controller::{SessionController, SessionDeps, SessionSettings, StartOutcome, StopOutcome};
pub use error::{RecordingError, RecordingResult};
pub use segment::SegmentRecorder;
pub use state::{
    SegmentOutcome, SegmentRecord, SessionEvent, SessionState, SessionSummary, TerminationReason,
};
