//! Time source for the segment wait loop
//!
//! The recorder never calls `std::thread::sleep` directly so the rotation loop
//! can be driven by a virtual clock in tests.

use std::time::{Duration, Instant};

/// Monotonic clock with a blocking sleep
pub trait Clock: Send + Sync {
    /// Current instant
    fn now(&self) -> Instant;

    /// Block the calling thread for `duration`
    fn sleep(&self, duration: Duration);
}

/// Wall clock backed by the operating system
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}
