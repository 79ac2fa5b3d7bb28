//! Segment recorder
//!
//! Runs exactly one recording resource through configure, start, wait and
//! finalize. The resource is held by a `ResourceGuard`, so it is stopped and
//! released exactly once on every exit path, including early returns and
//! unwinding.

use crate::capture::capability::EncoderConfig;
use crate::capture::traits::{RecordingResource, ResourceFactory, ResourceStatus};
use crate::recorder::clock::Clock;
use crate::recorder::error::{RecordingError, RecordingResult};
use crate::recorder::state::{SegmentOutcome, TerminationReason};
use std::path::Path;
use std::time::Duration;

/// Scoped ownership of one recording resource
struct ResourceGuard {
    resource: Option<Box<dyn RecordingResource>>,
    started: bool,
}

impl ResourceGuard {
    fn new(resource: Box<dyn RecordingResource>) -> Self {
        Self {
            resource: Some(resource),
            started: false,
        }
    }

    fn resource(&mut self) -> RecordingResult<&mut Box<dyn RecordingResource>> {
        self.resource.as_mut().ok_or_else(|| {
            RecordingError::ResourceAcquisition("Resource already released".to_string())
        })
    }

    fn configure(&mut self, config: &EncoderConfig, output_path: &Path) -> RecordingResult<()> {
        self.resource()?.configure(config, output_path)
    }

    fn start(&mut self) -> RecordingResult<()> {
        self.resource()?.start()?;
        self.started = true;
        Ok(())
    }

    fn poll(&mut self) -> RecordingResult<ResourceStatus> {
        self.resource()?.poll()
    }

    /// Stop (if started) then release. Release happens even if stop fails.
    fn finalize(&mut self) -> RecordingResult<()> {
        let Some(mut resource) = self.resource.take() else {
            return Ok(());
        };

        let stopped = if self.started {
            resource.stop()
        } else {
            Ok(())
        };
        resource.release();
        stopped
    }
}

impl Drop for ResourceGuard {
    fn drop(&mut self) {
        if self.resource.is_some() {
            tracing::warn!("Recording resource dropped without finalize, releasing");
            if let Err(e) = self.finalize() {
                tracing::warn!("Best-effort finalize failed: {}", e);
            }
        }
    }
}

/// Records one bounded segment at a time
pub struct SegmentRecorder<'a> {
    factory: &'a dyn ResourceFactory,
    clock: &'a dyn Clock,
    poll_interval: Duration,
}

impl<'a> SegmentRecorder<'a> {
    pub fn new(factory: &'a dyn ResourceFactory, clock: &'a dyn Clock, poll_interval: Duration) -> Self {
        Self {
            factory,
            clock,
            poll_interval,
        }
    }

    /// Record one segment to `output_path`
    ///
    /// Blocks until the configured maximum duration elapses or
    /// `should_continue` returns false, checked every poll interval.
    /// Configure and start failures are returned as-is, never retried.
    pub fn run_segment(
        &self,
        config: &EncoderConfig,
        output_path: &Path,
        should_continue: &dyn Fn() -> bool,
    ) -> RecordingResult<SegmentOutcome> {
        let mut guard = ResourceGuard::new(self.factory.create()?);
        let started_at = self.clock.now();

        let recorded = self.record(&mut guard, config, output_path, should_continue);
        let finalized = guard.finalize();
        let elapsed = self.clock.now().saturating_duration_since(started_at);

        match (recorded, finalized) {
            (Ok(reason), Ok(())) => {
                tracing::info!(
                    "Segment {:?} finished after {:?} ({:?})",
                    output_path,
                    elapsed,
                    reason
                );
                Ok(SegmentOutcome {
                    path: output_path.to_path_buf(),
                    reason,
                    elapsed,
                })
            }
            (Ok(_), Err(e)) => Err(e),
            (Err(e), finalized) => {
                if let Err(fin) = finalized {
                    tracing::warn!("Finalize after failed segment also failed: {}", fin);
                }
                Err(e)
            }
        }
    }

    fn record(
        &self,
        guard: &mut ResourceGuard,
        config: &EncoderConfig,
        output_path: &Path,
        should_continue: &dyn Fn() -> bool,
    ) -> RecordingResult<TerminationReason> {
        guard.configure(config, output_path)?;
        guard.start()?;

        let started_at = self.clock.now();
        loop {
            if !should_continue() {
                return Ok(TerminationReason::UserStop);
            }

            let elapsed = self.clock.now().saturating_duration_since(started_at);
            if elapsed >= config.max_duration {
                return Ok(TerminationReason::NaturalTimeout);
            }

            // The resource enforces the ceiling too and may get there first
            if guard.poll()? == ResourceStatus::Completed {
                tracing::debug!("Resource reached its duration ceiling at {:?}", elapsed);
                return Ok(TerminationReason::NaturalTimeout);
            }

            let remaining = config.max_duration - elapsed;
            self.clock.sleep(self.poll_interval.min(remaining));
        }
    }
}
