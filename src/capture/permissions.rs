//! Capture permission handling
//!
//! Consulted once per START. A `false` answer aborts the start before any
//! recording resource is created.

#[cfg(target_os = "linux")]
use std::path::Path;

/// Answers "is microphone capture currently allowed"
pub trait CaptureAuthorizer: Send + Sync {
    fn is_capture_authorized(&self) -> bool;
}

/// Fixed answer, for embedding and tests
#[derive(Debug, Clone, Copy)]
pub struct StaticAuthorizer(pub bool);

impl CaptureAuthorizer for StaticAuthorizer {
    fn is_capture_authorized(&self) -> bool {
        self.0
    }
}

/// User consent switch combined with a platform availability check
#[derive(Debug, Clone, Copy)]
pub struct SystemAuthorizer {
    allow_capture: bool,
}

impl SystemAuthorizer {
    pub fn new(allow_capture: bool) -> Self {
        Self { allow_capture }
    }
}

impl CaptureAuthorizer for SystemAuthorizer {
    fn is_capture_authorized(&self) -> bool {
        if !self.allow_capture {
            tracing::info!("Capture disabled by configuration");
            return false;
        }
        has_microphone_access()
    }
}

/// Check if the platform exposes an audio input path to this process
pub fn has_microphone_access() -> bool {
    #[cfg(target_os = "linux")]
    {
        if Path::new("/dev/snd").exists() {
            return true;
        }
        // PulseAudio / PipeWire-pulse without raw ALSA nodes
        let pulse_socket = std::env::var("XDG_RUNTIME_DIR")
            .map(|dir| Path::new(&dir).join("pulse").join("native").exists())
            .unwrap_or(false);
        if !pulse_socket {
            tracing::warn!("No ALSA device nodes or PulseAudio socket found");
        }
        pulse_socket
    }

    #[cfg(not(target_os = "linux"))]
    {
        // macOS and Windows prompt for microphone access when ffmpeg opens
        // the device; a denial surfaces as a resource error on start
        true
    }
}
