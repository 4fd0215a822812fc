//! A small logical-clock abstraction, so timers and FSMs can be driven by a
//! fake clock in tests (grounded on `nakamoto_common::block::time::Clock`,
//! referenced throughout the teacher's `fsm.rs` / sub-managers).
use std::ops;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// A point in time, measured in milliseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct LocalTime(u64);

impl LocalTime {
    /// The Unix epoch.
    pub const EPOCH: LocalTime = LocalTime(0);

    /// Construct from milliseconds since the Unix epoch.
    pub fn from_millis(ms: u64) -> Self {
        Self(ms)
    }

    /// Milliseconds since the Unix epoch.
    pub fn as_millis(&self) -> u64 {
        self.0
    }
}

impl From<SystemTime> for LocalTime {
    fn from(t: SystemTime) -> Self {
        let ms = t
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        Self(ms)
    }
}

impl ops::Add<LocalDuration> for LocalTime {
    type Output = LocalTime;

    fn add(self, rhs: LocalDuration) -> LocalTime {
        LocalTime(self.0.saturating_add(rhs.as_millis()))
    }
}

impl ops::Sub for LocalTime {
    type Output = LocalDuration;

    fn sub(self, rhs: LocalTime) -> LocalDuration {
        LocalDuration::from_millis(self.0.saturating_sub(rhs.0))
    }
}

/// A span of time, measured in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct LocalDuration(u64);

impl LocalDuration {
    /// The zero duration.
    pub const ZERO: LocalDuration = LocalDuration(0);

    /// Construct from a millisecond count.
    pub fn from_millis(ms: u64) -> Self {
        Self(ms)
    }

    /// Construct from a second count.
    pub fn from_secs(s: u64) -> Self {
        Self(s * 1000)
    }

    /// Milliseconds in this duration.
    pub fn as_millis(&self) -> u64 {
        self.0
    }
}

impl From<Duration> for LocalDuration {
    fn from(d: Duration) -> Self {
        Self(d.as_millis() as u64)
    }
}

impl From<LocalDuration> for Duration {
    fn from(d: LocalDuration) -> Self {
        Duration::from_millis(d.0)
    }
}

/// A source of the current time. Implementations may be wall-clock backed
/// (`SystemClock`) or deterministic, for driving FSMs and timers in tests.
pub trait Clock: Clone {
    /// The current time.
    fn local_time(&self) -> LocalTime;
}

/// A clock backed by [`SystemTime::now`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn local_time(&self) -> LocalTime {
        SystemTime::now().into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_arithmetic_round_trips() {
        let t0 = LocalTime::from_millis(1_000);
        let t1 = t0 + LocalDuration::from_secs(5);

        assert_eq!(t1.as_millis(), 6_000);
        assert_eq!(t1 - t0, LocalDuration::from_secs(5));
    }
}
