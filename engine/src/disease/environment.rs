//! Environmental infection source:
//! currently only the ICU, whose hazard is linear in occupancy rather than
//! point-to-point proximity. Grounded on
//! `examples/original_source/src/infection_logic/icu_environment.cpp`.

use crate::disease::params::EnvironmentParams;

#[derive(Debug, Clone)]
pub struct IcuEnvironment {
    params: EnvironmentParams,
}

impl IcuEnvironment {
    pub fn new(params: EnvironmentParams) -> IcuEnvironment {
        IcuEnvironment { params }
    }

    /// Linear in occupancy, saturating at 1.
    pub fn get_probability(&self, beds_occupied: u32, capacity: u32) -> f64 {
        if capacity == 0 {
            return 0.0;
        }
        let occupancy = beds_occupied as f64 / capacity as f64;
        (self.params.infection_chance * occupancy).min(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probability_scales_with_occupancy() {
        let env = IcuEnvironment::new(EnvironmentParams { infection_chance: 0.5 });
        assert_eq!(env.get_probability(0, 10), 0.0);
        assert_eq!(env.get_probability(5, 10), 0.25);
        assert_eq!(env.get_probability(10, 10), 0.5);
    }

    #[test]
    fn probability_saturates_at_one() {
        let env = IcuEnvironment::new(EnvironmentParams { infection_chance: 1.5 });
        assert_eq!(env.get_probability(10, 10), 1.0);
    }

    #[test]
    fn zero_capacity_is_zero_probability() {
        let env = IcuEnvironment::new(EnvironmentParams { infection_chance: 0.9 });
        assert_eq!(env.get_probability(0, 0), 0.0);
    }
}
