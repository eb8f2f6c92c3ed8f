//! Human infection cycle, grounded line-for-line on
//! `examples/original_source/src/infection_logic/human_infection_cycle.cpp`.

use crate::clock::DateTime;
use crate::disease::params::HumanDiseaseParams;
use crate::geography::coord::DiscreteCoord;
use crate::random::RandomWrapper;

#[derive(Copy, Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Stage {
    Healthy,
    Incubating,
    Sick,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Mode {
    Normal,
    Immune,
    Coma,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct HumanInfectionCycle {
    pub stage: Stage,
    pub mode: Mode,
    pub infection_time: Option<DateTime>,
    pub incubation_end: Option<DateTime>,
    pub infected_by: Option<String>,
    pub infect_location: Option<DiscreteCoord>,
}

impl HumanInfectionCycle {
    pub fn healthy() -> HumanInfectionCycle {
        HumanInfectionCycle {
            stage: Stage::Healthy,
            mode: Mode::Normal,
            infection_time: None,
            incubation_end: None,
            infected_by: None,
            infect_location: None,
        }
    }

    pub fn sick_from_start(now: DateTime) -> HumanInfectionCycle {
        HumanInfectionCycle {
            stage: Stage::Sick,
            mode: Mode::Normal,
            infection_time: Some(now),
            incubation_end: Some(now),
            infected_by: Some("entry:seed".to_string()),
            infect_location: None,
        }
    }

    pub fn immune() -> HumanInfectionCycle {
        let mut cycle = HumanInfectionCycle::healthy();
        cycle.mode = Mode::Immune;
        cycle
    }

    /// `p` is `infect_probability` when contagious and within `infect_distance`,
    /// else `0.0`.
    pub fn get_infect_probability(&self, params: &HumanDiseaseParams, distance: f64) -> f64 {
        if self.stage == Stage::Healthy || distance > params.infect_distance {
            return 0.0;
        }
        params.infect_probability
    }

    pub fn get_contamination_probability(&self, params: &HumanDiseaseParams) -> f64 {
        if self.stage == Stage::Healthy {
            0.0
        } else {
            params.contamination_probability
        }
    }

    /// One neighbor candidate for exposure: its infection-probability draw
    /// and its identifying label, used by `tick`'s neighbor scan.
    pub fn expose(
        &mut self,
        params: &HumanDiseaseParams,
        now: DateTime,
        source_label: String,
        source_location: DiscreteCoord,
        rng: &mut RandomWrapper,
    ) {
        self.stage = Stage::Incubating;
        self.infection_time = Some(now);
        let min = params.min_incubation_time.seconds();
        let max = params.max_incubation_time.seconds();
        let draw = rng.uniform_range_inclusive(min, max);
        self.incubation_end = Some(now.saturating_add(crate::clock::TimeDelta(draw)));
        self.infected_by = Some(source_label);
        self.infect_location = Some(source_location);
    }

    /// The per-tick transition `neighbors` carries, for each
    /// spatially nearby contagious agent, its infect probability at the
    /// caller's position plus an identifying label and cell.
    pub fn tick(
        &mut self,
        params: &HumanDiseaseParams,
        environment_probability: f64,
        now: DateTime,
        my_cell: DiscreteCoord,
        neighbors: &[(f64, String, DiscreteCoord)],
        rng: &mut RandomWrapper,
    ) {
        if self.mode == Mode::Immune {
            return;
        }

        match self.stage {
            Stage::Healthy => {
                if rng.bernoulli(environment_probability) {
                    self.expose(params, now, "environment:icu".to_string(), my_cell, rng);
                    return;
                }
                for (p, label, location) in neighbors {
                    let u = rng.uniform();
                    if *p > u {
                        self.expose(params, now, label.clone(), *location, rng);
                        break;
                    }
                }
            }
            Stage::Incubating => {
                if let Some(end) = self.incubation_end {
                    if now >= end {
                        self.stage = Stage::Sick;
                    }
                }
            }
            Stage::Sick => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::TimeDelta;

    fn params() -> HumanDiseaseParams {
        HumanDiseaseParams {
            infect_probability: 1.0,
            infect_distance: 2.0,
            contamination_probability: 0.5,
            min_incubation_time: TimeDelta(10),
            max_incubation_time: TimeDelta(20),
        }
    }

    #[test]
    fn immune_never_transitions() {
        let mut human = HumanInfectionCycle::immune();
        let mut rng = RandomWrapper::new(1, 0);
        human.tick(&params(), 1.0, DateTime(0), DiscreteCoord::new(0, 0), &[], &mut rng);
        assert_eq!(human.stage, Stage::Healthy);
    }

    #[test]
    fn environment_exposure_sets_incubation_window() {
        let mut human = HumanInfectionCycle::healthy();
        let mut rng = RandomWrapper::new(1, 0);
        human.tick(&params(), 1.0, DateTime(100), DiscreteCoord::new(0, 0), &[], &mut rng);
        assert_eq!(human.stage, Stage::Incubating);
        let end = human.incubation_end.unwrap();
        assert!(end.epoch_seconds() >= 110 && end.epoch_seconds() <= 120);
    }

    #[test]
    fn incubating_becomes_sick_once_window_elapses() {
        let mut human = HumanInfectionCycle::healthy();
        human.stage = Stage::Incubating;
        human.incubation_end = Some(DateTime(50));
        let mut rng = RandomWrapper::new(1, 0);
        human.tick(&params(), 0.0, DateTime(50), DiscreteCoord::new(0, 0), &[], &mut rng);
        assert_eq!(human.stage, Stage::Sick);
    }

    #[test]
    fn sick_has_no_transitions() {
        let mut human = HumanInfectionCycle::sick_from_start(DateTime(0));
        let mut rng = RandomWrapper::new(1, 0);
        human.tick(&params(), 1.0, DateTime(1000), DiscreteCoord::new(0, 0), &[], &mut rng);
        assert_eq!(human.stage, Stage::Sick);
    }
}
