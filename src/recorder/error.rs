//! Recording error taxonomy
//!
//! Every failure a session can hit falls into one of four kinds. The kind
//! decides how far the failure travels: authorization and storage problems
//! abort a START, resource problems end the running session, and finalize
//! problems are logged while the session still returns to idle.

use thiserror::Error;

/// Errors raised while starting a session or recording a segment
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordingError {
    #[error("Capture not authorized: {0}")]
    Authorization(String),

    #[error("Recording resource unavailable: {0}")]
    ResourceAcquisition(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Failed to finalize segment: {0}")]
    Finalization(String),
}

impl RecordingError {
    /// Stable machine-readable code for this error kind
    pub fn code(&self) -> &'static str {
        match self {
            RecordingError::Authorization(_) => "AUTHORIZATION_ERROR",
            RecordingError::ResourceAcquisition(_) => "RESOURCE_ERROR",
            RecordingError::Storage(_) => "STORAGE_ERROR",
            RecordingError::Finalization(_) => "FINALIZATION_ERROR",
        }
    }
}

/// Result type for recording operations
pub type RecordingResult<T> = Result<T, RecordingError>;
