//! Shared fixtures for session tests
#![allow(dead_code)]

use audiodriver_lib::capture::{
    CapabilityTier, CaptureAuthorizer, EncoderConfig, EncodingParams, FixedTier,
    RecordingResource, ResourceFactory, ResourceStatus, StaticAuthorizer,
};
use audiodriver_lib::recorder::{
    Clock, RecordingError, RecordingResult, SessionController, SessionDeps, SessionSettings,
    SystemClock,
};
use audiodriver_lib::storage::{list_segments, DirectoryStorage, OutputStorage, SegmentFile};
use parking_lot::Mutex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use tempfile::TempDir;

/// Lifecycle call counters across every resource a factory hands out
#[derive(Default)]
pub struct Calls {
    pub created: AtomicUsize,
    pub started: AtomicUsize,
    pub stopped: AtomicUsize,
    pub released: AtomicUsize,
}

impl Calls {
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    pub fn stopped(&self) -> usize {
        self.stopped.load(Ordering::SeqCst)
    }
}

/// Per-segment failures, keyed by the segment's creation index
#[derive(Debug, Clone, Copy, Default)]
pub struct Script {
    pub fail_start_on: Option<usize>,
    /// (segment, polls before the storage error)
    pub fail_poll_on: Option<(usize, usize)>,
    pub fail_stop_on: Option<usize>,
}

/// Writes an empty file at start so segments show up on disk
pub struct FakeResource {
    index: usize,
    calls: Arc<Calls>,
    script: Script,
    path: Option<PathBuf>,
    polls: usize,
}

impl RecordingResource for FakeResource {
    fn configure(&mut self, _config: &EncoderConfig, output_path: &Path) -> RecordingResult<()> {
        self.path = Some(output_path.to_path_buf());
        Ok(())
    }

    fn start(&mut self) -> RecordingResult<()> {
        self.calls.started.fetch_add(1, Ordering::SeqCst);
        if self.script.fail_start_on == Some(self.index) {
            return Err(RecordingError::ResourceAcquisition("device busy".into()));
        }
        let path = self
            .path
            .as_ref()
            .ok_or_else(|| RecordingError::ResourceAcquisition("not configured".into()))?;
        fs::write(path, b"").map_err(|e| RecordingError::Storage(e.to_string()))
    }

    fn poll(&mut self) -> RecordingResult<ResourceStatus> {
        self.polls += 1;
        match self.script.fail_poll_on {
            Some((index, after)) if index == self.index && self.polls > after => {
                Err(RecordingError::Storage("No space left on device".into()))
            }
            _ => Ok(ResourceStatus::Recording),
        }
    }

    fn stop(&mut self) -> RecordingResult<()> {
        self.calls.stopped.fetch_add(1, Ordering::SeqCst);
        if self.script.fail_stop_on == Some(self.index) {
            return Err(RecordingError::Finalization("trailer not written".into()));
        }
        Ok(())
    }

    fn release(&mut self) {
        self.calls.released.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct FakeFactory {
    pub calls: Arc<Calls>,
    pub script: Script,
}

impl ResourceFactory for FakeFactory {
    fn create(&self) -> RecordingResult<Box<dyn RecordingResource>> {
        let index = self.calls.created.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeResource {
            index,
            calls: Arc::clone(&self.calls),
            script: self.script,
            path: None,
            polls: 0,
        }))
    }
}

/// Virtual clock: sleeping advances time instantly and fires a hook once
/// virtual time reaches its deadline
pub struct ScriptedClock {
    base: Instant,
    offset: Mutex<Duration>,
    hook: Mutex<Option<(Duration, Box<dyn FnOnce() + Send>)>>,
}

impl ScriptedClock {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
            hook: Mutex::new(None),
        }
    }

    pub fn at(&self, deadline: Duration, hook: impl FnOnce() + Send + 'static) {
        *self.hook.lock() = Some((deadline, Box::new(hook)));
    }

    pub fn elapsed(&self) -> Duration {
        *self.offset.lock()
    }
}

impl Clock for ScriptedClock {
    fn now(&self) -> Instant {
        self.base + *self.offset.lock()
    }

    fn sleep(&self, duration: Duration) {
        let now = {
            let mut offset = self.offset.lock();
            *offset += duration;
            *offset
        };

        let due = {
            let mut hook = self.hook.lock();
            match hook.as_ref() {
                Some((deadline, _)) if now >= *deadline => hook.take(),
                _ => None,
            }
        };
        if let Some((_, fire)) = due {
            fire();
        }
    }
}

/// Authorizer that parks inside the check until the test lets it go
pub struct GatedAuthorizer {
    pub gate: std::sync::Barrier,
}

impl GatedAuthorizer {
    pub fn new() -> Self {
        Self {
            gate: std::sync::Barrier::new(2),
        }
    }
}

impl CaptureAuthorizer for GatedAuthorizer {
    fn is_capture_authorized(&self) -> bool {
        // Entered, then wait to be released
        self.gate.wait();
        self.gate.wait();
        true
    }
}

/// Storage that always fails, standing in for an unwritable volume
pub struct BrokenStorage;

impl OutputStorage for BrokenStorage {
    fn prepare(&self) -> RecordingResult<PathBuf> {
        Err(RecordingError::Storage("volume is read-only".into()))
    }
}

pub struct Harness {
    pub dir: TempDir,
    pub controller: Arc<SessionController>,
    pub calls: Arc<Calls>,
}

impl Harness {
    pub fn files(&self) -> Vec<SegmentFile> {
        list_segments(self.dir.path()).unwrap()
    }
}

pub struct HarnessBuilder {
    script: Script,
    authorizer: Option<Arc<dyn CaptureAuthorizer>>,
    authorized: bool,
    storage: Option<Arc<dyn OutputStorage>>,
    clock: Arc<dyn Clock>,
    segment: Duration,
    poll: Duration,
}

impl HarnessBuilder {
    pub fn new() -> Self {
        Self {
            script: Script::default(),
            authorizer: None,
            authorized: true,
            storage: None,
            clock: Arc::new(SystemClock),
            segment: Duration::from_secs(10),
            poll: Duration::from_secs(1),
        }
    }

    pub fn script(mut self, script: Script) -> Self {
        self.script = script;
        self
    }

    pub fn authorized(mut self, authorized: bool) -> Self {
        self.authorized = authorized;
        self
    }

    pub fn authorizer(mut self, authorizer: Arc<dyn CaptureAuthorizer>) -> Self {
        self.authorizer = Some(authorizer);
        self
    }

    pub fn storage(mut self, storage: Arc<dyn OutputStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn segment(mut self, segment: Duration) -> Self {
        self.segment = segment;
        self
    }

    pub fn poll(mut self, poll: Duration) -> Self {
        self.poll = poll;
        self
    }

    pub fn build(self) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let calls = Arc::new(Calls::default());
        let storage = self
            .storage
            .unwrap_or_else(|| Arc::new(DirectoryStorage::new(dir.path())));

        let authorizer = self
            .authorizer
            .unwrap_or_else(|| Arc::new(StaticAuthorizer(self.authorized)));

        let deps = SessionDeps {
            factory: Arc::new(FakeFactory {
                calls: Arc::clone(&calls),
                script: self.script,
            }),
            authorizer,
            storage,
            probe: Arc::new(FixedTier(CapabilityTier::Modern)),
            clock: self.clock,
        };
        let settings = SessionSettings {
            encoding: EncodingParams {
                segment_duration: self.segment,
                ..EncodingParams::default()
            },
            poll_interval: self.poll,
        };

        Harness {
            dir,
            controller: Arc::new(SessionController::new(deps, settings)),
            calls,
        }
    }
}

/// Virtual-time harness that issues STOP once `stop_at` has elapsed
pub fn scripted(stop_at: Duration, script: Script) -> (Harness, Arc<ScriptedClock>) {
    let clock = Arc::new(ScriptedClock::new());
    let harness = HarnessBuilder::new()
        .clock(clock.clone())
        .script(script)
        .build();

    let controller: Weak<SessionController> = Arc::downgrade(&harness.controller);
    clock.at(stop_at, move || {
        if let Some(controller) = controller.upgrade() {
            controller.stop();
        }
    });

    (harness, clock)
}
