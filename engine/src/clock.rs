//! Simulation clock. `now()` is read-only to everyone except
//! the scheduler, which is the only component allowed to `advance()` it.

use std::ops::Add;

/// A monotonically increasing tick count.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct Tick(pub u64);

impl Tick {
    pub fn succ(self) -> Tick {
        Tick(self.0 + 1)
    }
}

/// A non-negative span of simulated seconds.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct TimeDelta(pub u64);

impl TimeDelta {
    pub const ZERO: TimeDelta = TimeDelta(0);

    pub fn from_hms(days: u64, hours: u64, minutes: u64, seconds: u64) -> TimeDelta {
        TimeDelta(days * 86_400 + hours * 3_600 + minutes * 60 + seconds)
    }

    pub fn seconds(self) -> u64 {
        self.0
    }
}

impl Add for TimeDelta {
    type Output = TimeDelta;
    fn add(self, rhs: TimeDelta) -> TimeDelta {
        TimeDelta(self.0.saturating_add(rhs.0))
    }
}

/// A point in simulated time: a `TimeDelta` offset from simulation start.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct DateTime(pub u64);

impl DateTime {
    pub const EPOCH: DateTime = DateTime(0);

    pub fn epoch_seconds(self) -> u64 {
        self.0
    }

    pub fn saturating_add(self, delta: TimeDelta) -> DateTime {
        DateTime(self.0.saturating_add(delta.0))
    }

    /// Saturating subtraction, clamped to `TimeDelta::ZERO`.
    pub fn saturating_sub(self, other: DateTime) -> TimeDelta {
        TimeDelta(self.0.saturating_sub(other.0))
    }
}

impl Add<TimeDelta> for DateTime {
    type Output = DateTime;
    fn add(self, rhs: TimeDelta) -> DateTime {
        self.saturating_add(rhs)
    }
}

/// Maps integer tick counts to simulated wall-clock time.
#[derive(Debug, Clone)]
pub struct Clock {
    seconds_per_tick: u32,
    current_tick: Tick,
}

impl Clock {
    pub fn new(seconds_per_tick: u32) -> Clock {
        Clock { seconds_per_tick, current_tick: Tick(0) }
    }

    pub fn now(&self) -> DateTime {
        DateTime(self.current_tick.0 * self.seconds_per_tick as u64)
    }

    pub fn tick(&self) -> Tick {
        self.current_tick
    }

    pub fn seconds_per_tick(&self) -> u32 {
        self.seconds_per_tick
    }

    /// Advance simulated time by one tick. Only the scheduler calls this,
    /// and only as the first phase of a tick.
    pub fn advance(&mut self) {
        self.current_tick = self.current_tick.succ();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_derives_from_tick_and_seconds_per_tick() {
        let mut clock = Clock::new(60);
        assert_eq!(clock.now(), DateTime(0));
        clock.advance();
        assert_eq!(clock.now(), DateTime(60));
        clock.advance();
        assert_eq!(clock.now(), DateTime(120));
    }

    #[test]
    fn datetime_subtraction_saturates_at_zero() {
        let earlier = DateTime(10);
        let later = DateTime(100);
        assert_eq!(earlier.saturating_sub(later), TimeDelta::ZERO);
        assert_eq!(later.saturating_sub(earlier), TimeDelta(90));
    }

    #[test]
    fn time_delta_from_hms() {
        assert_eq!(TimeDelta::from_hms(1, 2, 3, 4), TimeDelta(86_400 + 7_200 + 180 + 4));
    }
}
