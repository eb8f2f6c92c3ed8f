//! Patient entry source, grounded on
//! `examples/original_source/src/entry.cpp`'s `patients_waiting()`. The
//! pro-rata formula `expected = 1 + (seconds_into_bin * adm[day][bin] /
//! interval_length)` is algebraically equivalent to the original's
//! `expected = 1 + bin_offset / rate` where `rate = interval_length /
//! interval_admission_target`; this is written the simpler way and relies
//! on the same integer-division behavior at bin boundaries.

use crate::clock::{Clock, DateTime, TimeDelta};
use crate::random::RandomWrapper;

/// Per-day, per-interval admission targets and infection probability,
/// loaded from the patient distribution JSON.
pub struct AdmissionHistogram {
    pub daily: Vec<Vec<u32>>,
    pub infected_chance: Vec<f64>,
    pub interval_length: TimeDelta,
}

impl AdmissionHistogram {
    fn day_index(&self, day: u64) -> usize {
        (day as usize) % self.daily.len().max(1)
    }
}

/// Owns the running `generated[day][interval]` counters.
pub struct EntrySource {
    histogram: AdmissionHistogram,
    generated: Vec<Vec<u32>>,
}

impl EntrySource {
    pub fn new(histogram: AdmissionHistogram) -> EntrySource {
        let generated = histogram.daily.iter().map(|bins| vec![0u32; bins.len()]).collect();
        EntrySource { histogram, generated }
    }

    /// Number of new patients to create this tick, and whether each should
    /// start `Sick`. Does not mutate agent state; the caller
    /// creates the patients and this only advances the internal counter.
    pub fn patients_waiting(&mut self, clock: &Clock, rng: &mut RandomWrapper) -> Vec<bool> {
        let now = clock.now();
        let interval_length = self.histogram.interval_length.seconds().max(1);
        let day = now.epoch_seconds() / 86_400;
        let seconds_into_day = now.epoch_seconds() % 86_400;
        let bin = (seconds_into_day / interval_length) as usize;
        let seconds_into_bin = seconds_into_day % interval_length;

        let day_index = self.histogram.day_index(day);
        let bins = &self.histogram.daily[day_index];
        if bin >= bins.len() {
            return Vec::new();
        }
        let target = bins[bin];
        let expected = 1 + (seconds_into_bin * target as u64) / interval_length;

        let already_generated = self.generated[day_index][bin] as u64;
        let to_create = expected.saturating_sub(already_generated);
        self.generated[day_index][bin] += to_create as u32;

        let infected_chance = self.histogram.infected_chance.get(day_index).copied().unwrap_or(0.0);
        (0..to_create).map(|_| rng.bernoulli(infected_chance)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn histogram() -> AdmissionHistogram {
        AdmissionHistogram { daily: vec![vec![4, 4, 4, 4]], infected_chance: vec![0.0], interval_length: TimeDelta(21_600) }
    }

    #[test]
    fn generates_at_most_expected_minus_generated() {
        let mut source = EntrySource::new(histogram());
        let mut rng = RandomWrapper::new(1, 0);
        let mut clock = Clock::new(60);

        let first = source.patients_waiting(&clock, &mut rng);
        assert_eq!(first.len(), 1);

        clock.advance();
        let second = source.patients_waiting(&clock, &mut rng);
        assert!(second.len() <= 1);
    }

    #[test]
    fn out_of_histogram_day_produces_nothing() {
        let mut source = EntrySource::new(AdmissionHistogram { daily: vec![vec![1]], infected_chance: vec![0.0], interval_length: TimeDelta(60) });
        let mut rng = RandomWrapper::new(1, 0);
        let mut clock = Clock::new(120);
        clock.advance();
        let result = source.patients_waiting(&clock, &mut rng);
        assert!(result.is_empty());
    }
}
