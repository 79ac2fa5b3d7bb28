//! FFmpeg-backed recording resource
//!
//! Each segment spawns one `ffmpeg` process that reads the capture device and
//! writes a single encoded file. The `-t` argument makes ffmpeg enforce the
//! segment ceiling itself, independent of our polling.

use crate::capture::capability::EncoderConfig;
use crate::capture::traits::{RecordingResource, ResourceFactory, ResourceStatus};
use crate::recorder::error::{RecordingError, RecordingResult};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

/// How often `stop` checks whether ffmpeg has exited
const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Stderr fragments that point at the output location rather than the device
const STORAGE_FAILURE_MARKERS: [&str; 3] = [
    "No space left on device",
    "Permission denied",
    "Read-only file system",
];

/// Process and capture-source settings shared by every segment
#[derive(Debug, Clone)]
pub struct FfmpegSettings {
    /// Path or name of the ffmpeg binary
    pub binary: String,
    /// Input demuxer (`pulse`, `avfoundation`, `dshow`, ...)
    pub input_format: String,
    /// Device passed to `-i`
    pub input_device: String,
    /// How long `stop` waits for a graceful exit before killing
    pub stop_timeout: Duration,
}

impl Default for FfmpegSettings {
    fn default() -> Self {
        let (input_format, input_device) = default_input();
        Self {
            binary: "ffmpeg".to_string(),
            input_format: input_format.to_string(),
            input_device: input_device.to_string(),
            stop_timeout: Duration::from_secs(5),
        }
    }
}

/// Default capture source for the current platform
pub fn default_input() -> (&'static str, &'static str) {
    #[cfg(target_os = "macos")]
    {
        ("avfoundation", ":0")
    }

    #[cfg(target_os = "windows")]
    {
        ("dshow", "audio=default")
    }

    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        ("pulse", "default")
    }
}

/// Build the ffmpeg argument vector for one segment
pub fn build_capture_args(
    settings: &FfmpegSettings,
    config: &EncoderConfig,
    output_path: &Path,
) -> Vec<String> {
    // -t takes fractional seconds; keep millisecond precision
    let max_secs = config.max_duration.as_millis() as f64 / 1000.0;

    vec![
        "-hide_banner".to_string(),
        "-nostats".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
        "-y".to_string(),
        "-f".to_string(),
        settings.input_format.clone(),
        "-i".to_string(),
        settings.input_device.clone(),
        "-ar".to_string(),
        config.sample_rate.to_string(),
        "-c:a".to_string(),
        config.codec.ffmpeg_encoder().to_string(),
        "-b:a".to_string(),
        config.bit_rate.to_string(),
        "-t".to_string(),
        format!("{:.3}", max_secs),
        "-f".to_string(),
        config.container.ffmpeg_format().to_string(),
        output_path.to_string_lossy().to_string(),
    ]
}

/// Decide whether a failed run was a storage problem or a device problem
fn classify_failure(stderr: &str) -> RecordingError {
    let detail = stderr.trim().to_string();
    if STORAGE_FAILURE_MARKERS
        .iter()
        .any(|marker| stderr.contains(marker))
    {
        RecordingError::Storage(detail)
    } else {
        RecordingError::ResourceAcquisition(detail)
    }
}

/// One ffmpeg capture process
pub struct FfmpegRecorder {
    settings: FfmpegSettings,
    args: Option<Vec<String>>,
    output_path: Option<PathBuf>,
    process: Option<Child>,
    stdin: Option<ChildStdin>,
}

impl FfmpegRecorder {
    pub fn new(settings: FfmpegSettings) -> Self {
        Self {
            settings,
            args: None,
            output_path: None,
            process: None,
            stdin: None,
        }
    }

    /// Collect whatever ffmpeg wrote to stderr (only valid once it has exited)
    fn drain_stderr(&mut self) -> String {
        let mut stderr = String::new();
        if let Some(pipe) = self.process.as_mut().and_then(|p| p.stderr.as_mut()) {
            let _ = pipe.read_to_string(&mut stderr);
        }
        stderr
    }

    /// Wait for the process to exit, up to the configured timeout
    fn wait_for_exit(&mut self) -> RecordingResult<Option<ExitStatus>> {
        let deadline = Instant::now() + self.settings.stop_timeout;
        let Some(process) = self.process.as_mut() else {
            return Ok(None);
        };

        loop {
            match process.try_wait() {
                Ok(Some(status)) => return Ok(Some(status)),
                Ok(None) if Instant::now() >= deadline => return Ok(None),
                Ok(None) => std::thread::sleep(EXIT_POLL_INTERVAL),
                Err(e) => {
                    return Err(RecordingError::Finalization(format!(
                        "Failed to wait for FFmpeg: {}",
                        e
                    )))
                }
            }
        }
    }
}

impl RecordingResource for FfmpegRecorder {
    fn configure(&mut self, config: &EncoderConfig, output_path: &Path) -> RecordingResult<()> {
        if config.sample_rate == 0 || config.bit_rate == 0 {
            return Err(RecordingError::ResourceAcquisition(format!(
                "Unsupported encoder configuration: {:?}",
                config
            )));
        }

        self.args = Some(build_capture_args(&self.settings, config, output_path));
        self.output_path = Some(output_path.to_path_buf());
        Ok(())
    }

    fn start(&mut self) -> RecordingResult<()> {
        let args = self.args.as_ref().ok_or_else(|| {
            RecordingError::ResourceAcquisition("Recorder started before configure".to_string())
        })?;

        tracing::debug!("Starting FFmpeg capture: {:?}", args);

        let mut command = Command::new(&self.settings.binary);
        command
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        // Own process group: a terminal Ctrl-C reaches only the daemon, which
        // then finalizes the segment with 'q'
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        let mut process = command.spawn().map_err(|e| {
            RecordingError::ResourceAcquisition(format!("Failed to start FFmpeg: {}", e))
        })?;

        self.stdin = process.stdin.take();
        self.process = Some(process);

        tracing::info!("Capturing to {:?}", self.output_path);
        Ok(())
    }

    fn poll(&mut self) -> RecordingResult<ResourceStatus> {
        let Some(process) = self.process.as_mut() else {
            return Err(RecordingError::ResourceAcquisition(
                "Recorder is not running".to_string(),
            ));
        };

        match process.try_wait() {
            Ok(None) => Ok(ResourceStatus::Recording),
            Ok(Some(status)) if status.success() => Ok(ResourceStatus::Completed),
            Ok(Some(status)) => {
                let stderr = self.drain_stderr();
                tracing::error!("FFmpeg exited mid-segment with {}: {}", status, stderr.trim());
                Err(classify_failure(&stderr))
            }
            Err(e) => Err(RecordingError::ResourceAcquisition(format!(
                "Failed to query FFmpeg: {}",
                e
            ))),
        }
    }

    fn stop(&mut self) -> RecordingResult<()> {
        // 'q' asks ffmpeg to flush and write the container trailer
        if let Some(mut stdin) = self.stdin.take() {
            if let Err(e) = stdin.write_all(b"q").and_then(|_| stdin.flush()) {
                // Broken pipe just means it already exited
                tracing::debug!("Could not signal FFmpeg to stop: {}", e);
            }
        }

        match self.wait_for_exit()? {
            Some(status) if status.success() => Ok(()),
            Some(status) => {
                let stderr = self.drain_stderr();
                Err(RecordingError::Finalization(format!(
                    "FFmpeg exited with {}: {}",
                    status,
                    stderr.trim()
                )))
            }
            None if self.process.is_none() => Ok(()),
            None => {
                if let Some(process) = self.process.as_mut() {
                    let _ = process.kill();
                }
                Err(RecordingError::Finalization(format!(
                    "FFmpeg did not exit within {:?}",
                    self.settings.stop_timeout
                )))
            }
        }
    }

    fn release(&mut self) {
        self.stdin = None;
        if let Some(mut process) = self.process.take() {
            if let Ok(None) = process.try_wait() {
                let _ = process.kill();
            }
            let _ = process.wait();
        }
    }
}

impl Drop for FfmpegRecorder {
    fn drop(&mut self) {
        self.release();
    }
}

/// Hands out one fresh `FfmpegRecorder` per segment
#[derive(Debug, Clone, Default)]
pub struct FfmpegRecorderFactory {
    settings: FfmpegSettings,
}

impl FfmpegRecorderFactory {
    pub fn new(settings: FfmpegSettings) -> Self {
        Self { settings }
    }
}

impl ResourceFactory for FfmpegRecorderFactory {
    fn create(&self) -> RecordingResult<Box<dyn RecordingResource>> {
        Ok(Box::new(FfmpegRecorder::new(self.settings.clone())))
    }
}
