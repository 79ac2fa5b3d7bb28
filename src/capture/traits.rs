//! Capture trait definitions
//!
//! Platform-agnostic interface over the OS media facility that actually
//! encodes and muxes audio. The core only configures and drives it.

use crate::capture::capability::EncoderConfig;
use crate::recorder::error::RecordingResult;
use std::path::Path;

/// What the resource reports while a segment is in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceStatus {
    /// Still writing
    Recording,
    /// Finished on its own after reaching the configured duration ceiling
    Completed,
}

/// One recording resource instance, good for exactly one segment
///
/// Instances are not reused across start/stop cycles. Callers must call
/// `release` exactly once, after `stop` if `start` succeeded.
pub trait RecordingResource: Send {
    /// Set source, container, codec, rates, duration ceiling and output file
    fn configure(&mut self, config: &EncoderConfig, output_path: &Path) -> RecordingResult<()>;

    /// Begin writing
    fn start(&mut self) -> RecordingResult<()>;

    /// Non-blocking health check
    fn poll(&mut self) -> RecordingResult<ResourceStatus>;

    /// Stop writing and finalize the output file
    fn stop(&mut self) -> RecordingResult<()>;

    /// Free the underlying handle
    fn release(&mut self);
}

/// Creates a fresh resource for each segment
pub trait ResourceFactory: Send + Sync {
    fn create(&self) -> RecordingResult<Box<dyn RecordingResource>>;
}
