//! Audio capture backends
//!
//! This module provides codec selection, the recording resource interface,
//! and the ffmpeg-driven implementation used by the daemon.

pub mod capability;
pub mod ffmpeg;
pub mod permissions;
pub mod traits;

pub use capability::{
    select_encoder_config, AudioCodec, CapabilityProbe, CapabilityTier, ContainerFormat,
    EncoderConfig, EncodingParams, FfmpegCapabilityProbe, FixedTier,
};
pub use ffmpeg::{FfmpegRecorder, FfmpegRecorderFactory, FfmpegSettings};
pub use permissions::{CaptureAuthorizer, StaticAuthorizer, SystemAuthorizer};
pub use traits::{RecordingResource, ResourceFactory, ResourceStatus};
