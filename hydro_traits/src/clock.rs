use chrono::NaiveDateTime;
use std::thread;
use std::time::{Duration, Instant};

/// Monotonic clock abstraction for loop pacing and timed pump runs.
///
/// - now(): returns a monotonic Instant
/// - sleep(): sleeps for the provided duration (implementations may simulate)
/// - ms_since(): helper to compute elapsed milliseconds from an epoch Instant
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, d: Duration);

    /// Milliseconds elapsed since `epoch`, saturating at 0 on underflow.
    fn ms_since(&self, epoch: Instant) -> u64 {
        let dur = self.now().saturating_duration_since(epoch);
        dur.as_millis() as u64
    }
}

/// Default, real-time monotonic clock backed by std::time::Instant.
#[derive(Debug, Default, Clone, Copy)]
pub struct MonotonicClock;

impl MonotonicClock {
    #[inline]
    pub fn new() -> Self {
        Self
    }
}

impl Clock for MonotonicClock {
    #[inline]
    fn now(&self) -> Instant {
        Instant::now()
    }

    #[inline]
    fn sleep(&self, d: Duration) {
        if d.is_zero() {
            return;
        }
        thread::sleep(d);
    }
}

/// Wall-clock time source for daily schedules and dosing timestamps.
///
/// Returns local civil time without a zone; schedules are expressed as local
/// times of day.
pub trait WallClock {
    fn now(&self) -> NaiveDateTime;
}

/// Wall clock backed by the host's local time zone.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalWallClock;

impl WallClock for LocalWallClock {
    fn now(&self) -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }
}

#[cfg(any(test, feature = "test-clock"))]
pub mod test_clock {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Deterministic test clock whose time can be advanced manually.
    ///
    /// now() = origin + offset
    /// sleep(d) advances internal time by d without actually sleeping.
    #[derive(Debug, Clone)]
    pub struct TestClock {
        origin: Instant,
        offset: Arc<Mutex<Duration>>,
    }

    impl Default for TestClock {
        fn default() -> Self {
            Self::new()
        }
    }

    impl TestClock {
        pub fn new() -> Self {
            Self {
                origin: Instant::now(),
                offset: Arc::new(Mutex::new(Duration::ZERO)),
            }
        }

        /// Advance the clock by the given duration.
        pub fn advance(&self, d: Duration) {
            if let Ok(mut off) = self.offset.lock() {
                *off = off.saturating_add(d);
            }
        }

        /// Total simulated time slept or advanced so far.
        pub fn elapsed(&self) -> Duration {
            self.offset.lock().map(|g| *g).unwrap_or(Duration::ZERO)
        }
    }

    impl Clock for TestClock {
        fn now(&self) -> Instant {
            self.origin + self.elapsed()
        }

        fn sleep(&self, d: Duration) {
            self.advance(d);
        }
    }

    /// Wall clock pinned to a settable instant; clones share the same time.
    #[derive(Debug, Clone)]
    pub struct ManualWallClock {
        now: Arc<Mutex<NaiveDateTime>>,
    }

    impl ManualWallClock {
        pub fn new(start: NaiveDateTime) -> Self {
            Self {
                now: Arc::new(Mutex::new(start)),
            }
        }

        pub fn set(&self, t: NaiveDateTime) {
            if let Ok(mut now) = self.now.lock() {
                *now = t;
            }
        }

        pub fn advance(&self, d: chrono::TimeDelta) {
            if let Ok(mut now) = self.now.lock() {
                *now += d;
            }
        }
    }

    impl WallClock for ManualWallClock {
        fn now(&self) -> NaiveDateTime {
            // A poisoned lock only happens after a panicking test; fall back to the epoch.
            self.now.lock().map(|g| *g).unwrap_or_default()
        }
    }
}
