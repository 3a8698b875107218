//! Monotonic time source for cooperative polling loops.

use embassy_time::{Duration, Instant};

/// Source of the current monotonic time.
///
/// Polling code reads the clock instead of sleeping, so a single
/// cooperative loop can drive several components.
pub trait Clock {
    /// Current instant.
    fn now(&self) -> Instant;

    /// Time elapsed since `earlier`, or zero if the source went backwards.
    fn elapsed_since(&self, earlier: Instant) -> Duration {
        self.now()
            .checked_duration_since(earlier)
            .unwrap_or(Duration::from_ticks(0))
    }
}

impl<T: Clock + ?Sized> Clock for &T {
    fn now(&self) -> Instant {
        (**self).now()
    }
}

/// Clock backed by the embassy time driver.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}
