//! Session controller
//!
//! Owns the Idle/Running/Stopping state machine and the segment rotation
//! loop. START spawns a single background worker; STOP clears the
//! continuation flag, which the in-flight segment notices at its next poll.
//! The flag is the only thing the command path and the worker share besides
//! the state itself.

use crate::capture::capability::{select_encoder_config, CapabilityProbe, EncodingParams};
use crate::capture::permissions::CaptureAuthorizer;
use crate::capture::traits::ResourceFactory;
use crate::recorder::clock::Clock;
use crate::recorder::error::{RecordingError, RecordingResult};
use crate::recorder::segment::SegmentRecorder;
use crate::recorder::state::{
    SegmentRecord, SessionEvent, SessionState, SessionSummary, TerminationReason,
};
use crate::storage::{OutputStorage, SegmentNamer};
use parking_lot::{Mutex, RwLock};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// External collaborators the controller drives
#[derive(Clone)]
pub struct SessionDeps {
    pub factory: Arc<dyn ResourceFactory>,
    pub authorizer: Arc<dyn CaptureAuthorizer>,
    pub storage: Arc<dyn OutputStorage>,
    pub probe: Arc<dyn CapabilityProbe>,
    pub clock: Arc<dyn Clock>,
}

/// Tunables for every session
#[derive(Debug, Clone, Copy)]
pub struct SessionSettings {
    pub encoding: EncodingParams,
    /// How often the in-flight segment checks for STOP
    pub poll_interval: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            encoding: EncodingParams::default(),
            poll_interval: Duration::from_secs(1),
        }
    }
}

/// Result of a START command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started { session_id: Uuid },
    /// A session was already running or stopping; nothing changed
    AlreadyActive,
}

/// Result of a STOP command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// The in-flight segment will finalize and the session will go idle
    Stopping,
    /// No session was active; nothing changed
    NotRunning,
}

/// State reachable from both the command path and the worker
struct Shared {
    state: RwLock<SessionState>,
    should_continue: AtomicBool,
    deps: SessionDeps,
    settings: SessionSettings,
    namer: SegmentNamer,
    event_tx: broadcast::Sender<SessionEvent>,
}

/// Puts the session back to idle when the worker exits, even by panic
struct ReturnToIdle<'a>(&'a Shared);

impl Drop for ReturnToIdle<'_> {
    fn drop(&mut self) {
        self.0.should_continue.store(false, Ordering::SeqCst);
        *self.0.state.write() = SessionState::Idle;
    }
}

impl Shared {
    fn notify(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.event_tx.send(event);
    }

    fn should_continue(&self) -> bool {
        self.should_continue.load(Ordering::SeqCst)
    }

    /// Worker body: rotate segments, then return to idle and report
    fn run_session(&self, session_id: Uuid, output_dir: PathBuf) -> SessionSummary {
        let summary = {
            let _idle = ReturnToIdle(self);
            self.rotate(session_id, &output_dir)
        };

        match &summary.error {
            None => {
                tracing::info!(
                    %session_id,
                    "Session stopped after {} segment(s)",
                    summary.segments.len()
                );
                self.notify(SessionEvent::Stopped {
                    session_id,
                    segment_count: summary.segments.len(),
                });
            }
            Some(error) => {
                self.notify(SessionEvent::Failed {
                    session_id: Some(session_id),
                    error: error.clone(),
                });
            }
        }

        summary
    }

    /// The rotation loop. The first segment always runs, so a STOP that
    /// races START still produces one (short) segment.
    fn rotate(&self, session_id: Uuid, output_dir: &Path) -> SessionSummary {
        let clock = self.deps.clock.as_ref();
        let recorder = SegmentRecorder::new(
            self.deps.factory.as_ref(),
            clock,
            self.settings.poll_interval,
        );
        let should_continue = || self.should_continue();
        let mut summary = SessionSummary::new(session_id);

        loop {
            let index = summary.segments.len();
            // Fresh config and resource every segment
            let config = select_encoder_config(self.deps.probe.tier(), &self.settings.encoding);
            let path = self.namer.next_path(output_dir, config.extension);

            tracing::info!(
                %session_id,
                "Starting segment {} ({:?}/{:?}) -> {:?}",
                index,
                config.codec,
                config.container,
                path
            );

            let began = clock.now();
            let result = recorder.run_segment(&config, &path, &should_continue);

            let (record, error) = match result {
                Ok(outcome) => (
                    SegmentRecord {
                        index,
                        path: outcome.path,
                        config,
                        reason: outcome.reason,
                        elapsed: outcome.elapsed,
                    },
                    None,
                ),
                Err(error) => (
                    SegmentRecord {
                        index,
                        path,
                        config,
                        reason: TerminationReason::Error,
                        elapsed: clock.now().saturating_duration_since(began),
                    },
                    Some(error),
                ),
            };

            let reason = record.reason;
            summary.segments.push(record.clone());
            self.notify(SessionEvent::SegmentCompleted { session_id, record });

            if let Some(error) = error {
                match &error {
                    RecordingError::Finalization(_) => {
                        tracing::warn!(%session_id, "Ending session after finalize failure: {}", error)
                    }
                    _ => tracing::error!(%session_id, "Ending session after segment failure: {}", error),
                }
                summary.error = Some(error);
                break;
            }

            if reason == TerminationReason::UserStop || !self.should_continue() {
                break;
            }
        }

        summary
    }
}

/// Manages the single capture session
pub struct SessionController {
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<SessionSummary>>>,
}

impl SessionController {
    /// Create a new session controller
    pub fn new(deps: SessionDeps, settings: SessionSettings) -> Self {
        let (event_tx, _) = broadcast::channel(100);
        Self {
            shared: Arc::new(Shared {
                state: RwLock::new(SessionState::Idle),
                should_continue: AtomicBool::new(false),
                deps,
                settings,
                namer: SegmentNamer::new(),
                event_tx,
            }),
            worker: Mutex::new(None),
        }
    }

    /// Get the current session state
    pub fn state(&self) -> SessionState {
        *self.shared.state.read()
    }

    /// Whether a session is running or still finalizing
    pub fn is_active(&self) -> bool {
        self.state().is_active()
    }

    /// Subscribe to session events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.shared.event_tx.subscribe()
    }

    /// Handle START
    ///
    /// Returns immediately; segments are recorded on a blocking worker.
    /// Must be called from within a Tokio runtime.
    pub fn start(&self) -> RecordingResult<StartOutcome> {
        // Serializes STARTs. Only a START moves the state out of Idle, so the
        // state lock is free while the collaborators run.
        let mut worker = self.worker.lock();

        let current = self.state();
        if current != SessionState::Idle {
            tracing::debug!("START ignored, session is {:?}", current);
            return Ok(StartOutcome::AlreadyActive);
        }

        if !self.shared.deps.authorizer.is_capture_authorized() {
            let error = RecordingError::Authorization(
                "Microphone capture permission not granted".to_string(),
            );
            return Err(self.reject(error));
        }

        let output_dir = self
            .shared
            .deps
            .storage
            .prepare()
            .map_err(|e| self.reject(e))?;

        let session_id = Uuid::new_v4();
        {
            let mut state = self.shared.state.write();
            self.shared.should_continue.store(true, Ordering::SeqCst);
            *state = SessionState::Running;
        }
        tracing::info!(%session_id, "Session started, writing to {:?}", output_dir);
        self.shared.notify(SessionEvent::Started { session_id });

        let shared = Arc::clone(&self.shared);
        *worker = Some(tokio::task::spawn_blocking(move || {
            shared.run_session(session_id, output_dir)
        }));

        Ok(StartOutcome::Started { session_id })
    }

    fn reject(&self, error: RecordingError) -> RecordingError {
        tracing::error!("START rejected: {}", error);
        self.shared.notify(SessionEvent::Failed {
            session_id: None,
            error: error.clone(),
        });
        error
    }

    /// Handle STOP
    ///
    /// Cooperative: the in-flight segment finalizes within one poll interval
    /// plus the resource's own stop time.
    pub fn stop(&self) -> StopOutcome {
        let mut state = self.shared.state.write();
        match *state {
            SessionState::Running => {
                self.shared.should_continue.store(false, Ordering::SeqCst);
                *state = SessionState::Stopping;
                tracing::info!("Stopping session");
                StopOutcome::Stopping
            }
            SessionState::Stopping => StopOutcome::Stopping,
            SessionState::Idle => {
                tracing::debug!("STOP ignored, no active session");
                StopOutcome::NotRunning
            }
        }
    }

    /// Wait for the current worker to finish and return what it recorded
    ///
    /// Returns `None` if no session was started since the last wait, or if
    /// the worker panicked.
    pub async fn wait_until_idle(&self) -> Option<SessionSummary> {
        let handle = self.worker.lock().take()?;
        match handle.await {
            Ok(summary) => Some(summary),
            Err(e) => {
                tracing::error!("Session worker panicked: {}", e);
                None
            }
        }
    }

    /// Stop any session and wait for its last segment to be finalized
    pub async fn shutdown(&self) -> Option<SessionSummary> {
        self.stop();
        self.wait_until_idle().await
    }
}
