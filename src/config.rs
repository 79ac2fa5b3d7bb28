//! Daemon configuration
//!
//! Loaded from a JSON file; every field has a default so an empty object (or
//! no file at all) is a valid configuration.

use crate::capture::capability::{CapabilityTier, EncodingParams};
use crate::capture::ffmpeg::{default_input, FfmpegSettings};
use crate::recorder::controller::SessionSettings;
use directories::{ProjectDirs, UserDirs};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Name of the directory segments are written into
pub const RECORDING_DIR_NAME: &str = "AudioRec";

/// Longest accepted poll interval; STOP latency is bounded by it
pub const MAX_POLL_INTERVAL_MS: u64 = 5_000;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Daemon configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DaemonConfig {
    /// Where segments are written (defaults to Downloads/AudioRec)
    pub output_dir: Option<PathBuf>,

    /// Maximum length of one segment
    pub segment_duration_secs: u64,

    pub sample_rate: u32,

    pub bit_rate: u32,

    /// STOP polling cadence
    pub poll_interval_ms: u64,

    /// Capability tier override (1 = legacy, 2 = modern); probed when unset
    pub capability_tier: Option<u32>,

    pub ffmpeg_path: String,

    pub input_format: String,

    pub input_device: String,

    /// User consent switch for microphone capture
    pub allow_capture: bool,

    /// Control socket location
    pub socket_path: Option<PathBuf>,

    /// Grace period for the encoder to exit after a stop request
    pub stop_timeout_ms: u64,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        let (input_format, input_device) = default_input();
        Self {
            output_dir: None,
            segment_duration_secs: 600,
            sample_rate: 48_000,
            bit_rate: 64_000,
            poll_interval_ms: 1_000,
            capability_tier: None,
            ffmpeg_path: "ffmpeg".to_string(),
            input_format: input_format.to_string(),
            input_device: input_device.to_string(),
            allow_capture: true,
            socket_path: None,
            stop_timeout_ms: 5_000,
        }
    }
}

impl DaemonConfig {
    /// Load configuration
    ///
    /// An explicit path must exist. Without one, the platform config file is
    /// used if present, otherwise defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => match default_config_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                _ => {
                    tracing::debug!("No config file found, using defaults");
                    Self::default()
                }
            },
        };

        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.segment_duration_secs == 0 {
            return Err(ConfigError::Invalid(
                "segmentDurationSecs must be greater than 0".to_string(),
            ));
        }
        if self.poll_interval_ms == 0 || self.poll_interval_ms > MAX_POLL_INTERVAL_MS {
            return Err(ConfigError::Invalid(format!(
                "pollIntervalMs must be between 1 and {}",
                MAX_POLL_INTERVAL_MS
            )));
        }
        if self.sample_rate == 0 || self.bit_rate == 0 {
            return Err(ConfigError::Invalid(
                "sampleRate and bitRate must be greater than 0".to_string(),
            ));
        }
        if self.ffmpeg_path.trim().is_empty() {
            return Err(ConfigError::Invalid("ffmpegPath must not be empty".to_string()));
        }
        Ok(())
    }

    /// Resolved output directory
    pub fn output_dir(&self) -> PathBuf {
        self.output_dir.clone().unwrap_or_else(default_output_dir)
    }

    /// Resolved control socket path
    pub fn socket_path(&self) -> PathBuf {
        self.socket_path.clone().unwrap_or_else(default_socket_path)
    }

    /// Configured tier override, if any
    pub fn capability_tier(&self) -> Option<CapabilityTier> {
        self.capability_tier.map(CapabilityTier::from)
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            encoding: EncodingParams {
                sample_rate: self.sample_rate,
                bit_rate: self.bit_rate,
                segment_duration: Duration::from_secs(self.segment_duration_secs),
            },
            poll_interval: Duration::from_millis(self.poll_interval_ms),
        }
    }

    pub fn ffmpeg_settings(&self) -> FfmpegSettings {
        FfmpegSettings {
            binary: self.ffmpeg_path.clone(),
            input_format: self.input_format.clone(),
            input_device: self.input_device.clone(),
            stop_timeout: Duration::from_millis(self.stop_timeout_ms),
        }
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "freedom", "audiodriver")
}

/// Platform config file location
pub fn default_config_path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join("config.json"))
}

/// Downloads/AudioRec, or the data dir when there is no Downloads folder
pub fn default_output_dir() -> PathBuf {
    UserDirs::new()
        .and_then(|dirs| dirs.download_dir().map(Path::to_path_buf))
        .or_else(|| project_dirs().map(|dirs| dirs.data_dir().to_path_buf()))
        .unwrap_or_else(|| PathBuf::from("."))
        .join(RECORDING_DIR_NAME)
}

/// Per-user runtime dir when available, temp dir otherwise
pub fn default_socket_path() -> PathBuf {
    let base = std::env::var_os("XDG_RUNTIME_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(std::env::temp_dir);
    base.join("audiodriver").join("control.sock")
}
