//! Encoder capability selection
//!
//! Maps the host's capability tier to a concrete encoder configuration.
//! Selection is total: any tier that isn't recognized as modern gets the
//! legacy configuration.

use serde::{Deserialize, Serialize};
use std::process::{Command, Stdio};
use std::time::Duration;

/// Which codec/container combinations the host guarantees
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapabilityTier {
    /// Ubiquitous lossy codec in a standard container
    Legacy,
    /// Open lossy codec in a streaming-friendly container
    Modern,
    /// Ordinal this build doesn't know about
    Unrecognized(u32),
}

impl From<u32> for CapabilityTier {
    fn from(ordinal: u32) -> Self {
        match ordinal {
            1 => CapabilityTier::Legacy,
            2 => CapabilityTier::Modern,
            n => CapabilityTier::Unrecognized(n),
        }
    }
}

/// Output container format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerFormat {
    Ogg,
    Mp4,
}

impl ContainerFormat {
    /// Muxer name understood by ffmpeg
    pub fn ffmpeg_format(&self) -> &'static str {
        match self {
            ContainerFormat::Ogg => "ogg",
            ContainerFormat::Mp4 => "mp4",
        }
    }

    /// File extension for segments in this container
    pub fn extension(&self) -> &'static str {
        match self {
            ContainerFormat::Ogg => "ogg",
            ContainerFormat::Mp4 => "mp4",
        }
    }
}

/// Audio codec
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioCodec {
    Opus,
    Aac,
}

impl AudioCodec {
    /// Encoder name understood by ffmpeg
    pub fn ffmpeg_encoder(&self) -> &'static str {
        match self {
            AudioCodec::Opus => "libopus",
            AudioCodec::Aac => "aac",
        }
    }
}

/// Tier-independent encoding parameters taken from configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodingParams {
    pub sample_rate: u32,
    pub bit_rate: u32,
    pub segment_duration: Duration,
}

impl Default for EncodingParams {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            bit_rate: 64_000,
            segment_duration: Duration::from_secs(600),
        }
    }
}

/// Immutable description of how one segment is encoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderConfig {
    pub container: ContainerFormat,
    pub codec: AudioCodec,
    pub sample_rate: u32,
    pub bit_rate: u32,
    /// Hard ceiling on segment length
    pub max_duration: Duration,
    pub extension: &'static str,
}

/// Pick the encoder configuration for a capability tier
pub fn select_encoder_config(tier: CapabilityTier, params: &EncodingParams) -> EncoderConfig {
    let (container, codec) = match tier {
        CapabilityTier::Modern => (ContainerFormat::Ogg, AudioCodec::Opus),
        CapabilityTier::Legacy => (ContainerFormat::Mp4, AudioCodec::Aac),
        CapabilityTier::Unrecognized(ordinal) => {
            tracing::debug!("Unrecognized capability tier {}, using legacy encoder", ordinal);
            (ContainerFormat::Mp4, AudioCodec::Aac)
        }
    };

    EncoderConfig {
        container,
        codec,
        sample_rate: params.sample_rate,
        bit_rate: params.bit_rate,
        max_duration: params.segment_duration,
        extension: container.extension(),
    }
}

/// Source of the host's current capability tier
pub trait CapabilityProbe: Send + Sync {
    fn tier(&self) -> CapabilityTier;
}

/// Always reports the same tier (configured override)
#[derive(Debug, Clone, Copy)]
pub struct FixedTier(pub CapabilityTier);

impl CapabilityProbe for FixedTier {
    fn tier(&self) -> CapabilityTier {
        self.0
    }
}

/// Asks the ffmpeg binary which encoders it was built with
#[derive(Debug, Clone)]
pub struct FfmpegCapabilityProbe {
    binary: String,
}

impl FfmpegCapabilityProbe {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl CapabilityProbe for FfmpegCapabilityProbe {
    fn tier(&self) -> CapabilityTier {
        let output = Command::new(&self.binary)
            .args(["-hide_banner", "-encoders"])
            .stdin(Stdio::null())
            .output();

        match output {
            Ok(output) if output.status.success() => {
                tier_from_encoder_list(&String::from_utf8_lossy(&output.stdout))
            }
            Ok(output) => {
                tracing::warn!(
                    "Encoder probe exited with {}, assuming legacy tier",
                    output.status
                );
                CapabilityTier::Legacy
            }
            Err(e) => {
                tracing::warn!("Failed to run {} for encoder probe: {}", self.binary, e);
                CapabilityTier::Legacy
            }
        }
    }
}

/// Parse `ffmpeg -encoders` output
fn tier_from_encoder_list(listing: &str) -> CapabilityTier {
    // Lines look like: " A....D libopus              libopus Opus"
    let has_opus = listing
        .lines()
        .filter_map(|line| line.split_whitespace().nth(1))
        .any(|name| name == AudioCodec::Opus.ffmpeg_encoder());

    if has_opus {
        CapabilityTier::Modern
    } else {
        CapabilityTier::Legacy
    }
}
