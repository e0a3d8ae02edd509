//! # Clock Module
//!
//! Monotonic millisecond clock and blocking sleep, injected into calibration
//! and the motor ramp so they can be driven by a fake clock in tests.
//!
//! Timestamps are `u32` milliseconds and wrap after ~49.7 days, the same as an
//! embedded `millis()` counter. Always compare them with [`elapsed_ms`], which
//! uses wrapping subtraction.

use std::time::{Duration, Instant};

/// Monotonic time source with a blocking sleep.
pub trait Clock {
    /// Milliseconds since an arbitrary origin, wrapping at `u32::MAX`.
    fn now_ms(&self) -> u32;

    /// Blocks the caller for `ms` milliseconds.
    fn sleep_ms(&self, ms: u32);
}

/// Milliseconds elapsed from `since` to `now`, tolerant of counter wraparound.
///
/// # Examples
///
/// ```
/// use joydrive::clock::elapsed_ms;
///
/// assert_eq!(elapsed_ms(150, 100), 50);
/// // Counter wrapped between the two readings
/// assert_eq!(elapsed_ms(10, u32::MAX - 9), 20);
/// ```
#[inline]
#[must_use]
pub fn elapsed_ms(now: u32, since: u32) -> u32 {
    now.wrapping_sub(since)
}

/// Real-time clock backed by [`std::time::Instant`].
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemClock {
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u32 {
        // Truncation is the wraparound
        self.origin.elapsed().as_millis() as u32
    }

    fn sleep_ms(&self, ms: u32) {
        if ms == 0 {
            return;
        }
        std::thread::sleep(Duration::from_millis(u64::from(ms)));
    }
}

#[cfg(test)]
pub mod mocks {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    /// Deterministic clock whose time only moves when advanced or slept on.
    ///
    /// Clones share the same counter, so a test can hold one handle while the
    /// components under test own the others.
    #[derive(Debug, Clone, Default)]
    pub struct ManualClock {
        now: Arc<AtomicU32>,
    }

    impl ManualClock {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn starting_at(ms: u32) -> Self {
            let clock = Self::new();
            clock.set(ms);
            clock
        }

        pub fn advance(&self, ms: u32) {
            let now = self.now.load(Ordering::SeqCst);
            self.now.store(now.wrapping_add(ms), Ordering::SeqCst);
        }

        pub fn set(&self, ms: u32) {
            self.now.store(ms, Ordering::SeqCst);
        }
    }

    impl Clock for ManualClock {
        fn now_ms(&self) -> u32 {
            self.now.load(Ordering::SeqCst)
        }

        fn sleep_ms(&self, ms: u32) {
            self.advance(ms);
        }
    }
}
