//! Time source used for the inter-command interval and reply deadlines.

use fugit::{MillisDurationU64, TimerInstantU64};

/// Millisecond instant as seen by a [`Clock`].
pub type Instant = TimerInstantU64<1_000>;
/// Millisecond duration used throughout the crate.
pub type Millis = MillisDurationU64;

/// A monotonic clock which can also block for a while.
///
/// Implement this on top of a hardware timer on embedded targets. With the `std`
/// feature, [`StdClock`] uses the operating system.
pub trait Clock {
    /// Current time. Must never go backwards.
    fn now(&mut self) -> Instant;

    /// Block for `duration`.
    fn delay(&mut self, duration: Millis);
}

impl<C: Clock + ?Sized> Clock for &mut C {
    fn now(&mut self) -> Instant {
        (**self).now()
    }

    fn delay(&mut self, duration: Millis) {
        (**self).delay(duration)
    }
}

/// [`Clock`] backed by [`std::time::Instant`] and [`std::thread::sleep`].
#[cfg(feature = "std")]
#[derive(Debug, Clone, Copy)]
pub struct StdClock {
    origin: std::time::Instant,
}

#[cfg(feature = "std")]
impl StdClock {
    pub fn new() -> Self {
        Self {
            origin: std::time::Instant::now(),
        }
    }
}

#[cfg(feature = "std")]
impl Default for StdClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "std")]
impl Clock for StdClock {
    fn now(&mut self) -> Instant {
        let elapsed = self.origin.elapsed().as_millis();
        Instant::from_ticks(u64::try_from(elapsed).unwrap_or(u64::MAX))
    }

    fn delay(&mut self, duration: Millis) {
        std::thread::sleep(std::time::Duration::from_millis(duration.ticks()));
    }
}
