//! Monotonic time sources.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// A monotonic time source.
///
/// `now()` returns the time since an arbitrary, fixed origin. Successive
/// calls never go backwards.
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// Returns the current monotonic reading.
    fn now(&self) -> Duration;
}

/// Clock backed by `tokio::time::Instant`.
///
/// Under a paused tokio runtime (`#[tokio::test(start_paused = true)]`) this
/// clock follows virtual time, so sleeps performed by intentional delays
/// advance it exactly.
#[derive(Debug, Clone, Copy)]
pub struct TokioClock {
    origin: tokio::time::Instant,
}

impl TokioClock {
    pub fn new() -> Self {
        Self {
            origin: tokio::time::Instant::now(),
        }
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TokioClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Clock advanced explicitly by the caller.
///
/// Stores nanoseconds in an atomic so it can be shared between the code
/// under test and the test driving it.
#[derive(Debug, Default)]
pub struct ManualClock {
    nanos: AtomicU64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves the clock forward by `by`, saturating at the maximum reading.
    pub fn advance(&self, by: Duration) {
        let delta = u64::try_from(by.as_nanos()).unwrap_or(u64::MAX);
        let _ = self
            .nanos
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                Some(n.saturating_add(delta))
            });
    }

    /// Moves the clock forward by `ms` milliseconds.
    pub fn advance_ms(&self, ms: u64) {
        self.advance(Duration::from_millis(ms));
    }

    /// Sets the absolute reading in milliseconds. Ignored if it would move
    /// the clock backwards.
    pub fn set_ms(&self, ms: u64) {
        let target = ms.saturating_mul(1_000_000);
        self.nanos.fetch_max(target, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.nanos.load(Ordering::SeqCst))
    }
}

/// Converts a duration to fractional milliseconds.
pub(crate) fn as_millis_f64(d: Duration) -> f64 {
    d.as_secs_f64() * 1_000.0
}
