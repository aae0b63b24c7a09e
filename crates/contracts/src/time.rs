//! Tick clock shared by all feeds of a session.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// Offset from FeedStart in 100 ns units.
pub type Tick = i64;

pub const TICKS_PER_SECOND: Tick = 10_000_000;
pub const TICKS_PER_MILLISECOND: Tick = 10_000;

/// Convert a duration to ticks, saturating at `Tick::MAX`.
pub fn ticks_from_duration(duration: Duration) -> Tick {
    let ticks = duration.as_nanos() / 100;
    Tick::try_from(ticks).unwrap_or(Tick::MAX)
}

/// Convert milliseconds to ticks.
pub fn ticks_from_millis(millis: u64) -> Tick {
    Tick::try_from(millis)
        .unwrap_or(Tick::MAX)
        .saturating_mul(TICKS_PER_MILLISECOND)
}

/// Convert ticks to a duration. Negative ticks map to zero.
pub fn duration_from_ticks(ticks: Tick) -> Duration {
    if ticks <= 0 {
        return Duration::ZERO;
    }
    Duration::from_nanos((ticks as u64).saturating_mul(100))
}

/// One timestamped reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample<T> {
    pub value: T,
    pub tick: Tick,
}

impl<T> Sample<T> {
    #[inline]
    pub fn new(value: T, tick: Tick) -> Self {
        Self { value, tick }
    }
}

/// Session clock capturing the FeedStart epoch.
///
/// Created once when a pipeline starts and handed to every live source so
/// that all channels stamp readings against the same origin.
#[derive(Debug, Clone, Copy)]
pub struct FeedClock {
    start: Instant,
}

impl FeedClock {
    /// Capture FeedStart now.
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Build a clock from an existing epoch.
    pub fn from_instant(start: Instant) -> Self {
        Self { start }
    }

    pub fn started_at(&self) -> Instant {
        self.start
    }

    /// Ticks elapsed since FeedStart.
    pub fn ticks_since_start(&self) -> Tick {
        ticks_from_duration(self.start.elapsed())
    }
}

impl Default for FeedClock {
    fn default() -> Self {
        Self::start()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_conversions() {
        assert_eq!(ticks_from_duration(Duration::from_secs(1)), TICKS_PER_SECOND);
        assert_eq!(ticks_from_millis(100), 1_000_000);
        assert_eq!(duration_from_ticks(100_000_000), Duration::from_secs(10));
        assert_eq!(duration_from_ticks(-5), Duration::ZERO);
    }

    #[test]
    fn test_feed_clock_monotonic() {
        let clock = FeedClock::start();
        let a = clock.ticks_since_start();
        let b = clock.ticks_since_start();
        assert!(a >= 0);
        assert!(b >= a);
    }
}
