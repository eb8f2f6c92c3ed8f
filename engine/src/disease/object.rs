//! Object infection cycle, grounded on
//! `examples/original_source/src/infection_logic/object_infection_cycle.cpp`.
//! Between the two cleaning-reset semantics the original offers, this
//! keeps `next_clean += cleaning_interval` over resetting from the current
//! tick, so a backlog of contamination events cannot push an object's
//! clean time out indefinitely.

use crate::clock::DateTime;
use crate::disease::params::ObjectDiseaseParams;
use crate::random::RandomWrapper;

#[derive(Copy, Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ObjectStage {
    Clean,
    Contaminated,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct ObjectInfectionCycle {
    pub type_tag: String,
    pub stage: ObjectStage,
    pub next_clean: DateTime,
    pub infected_by: Vec<(String, DateTime)>,
}

impl ObjectInfectionCycle {
    pub fn new(type_tag: impl Into<String>, first_clean: DateTime) -> ObjectInfectionCycle {
        ObjectInfectionCycle {
            type_tag: type_tag.into(),
            stage: ObjectStage::Clean,
            next_clean: first_clean,
            infected_by: Vec::new(),
        }
    }

    /// `infect_probability` when `Contaminated` and within contact range of
    /// the requesting position (≈0.2 cells), else `0.0`.
    pub fn get_infect_probability(&self, params: &ObjectDiseaseParams, distance: f64) -> f64 {
        const CONTACT_DISTANCE: f64 = 0.2;
        if self.stage == ObjectStage::Contaminated && distance <= CONTACT_DISTANCE {
            params.infect_probability
        } else {
            0.0
        }
    }

    /// `nearby_humans` carries, for each human within `params.radius`, its
    /// id label and contamination probability.
    pub fn tick(
        &mut self,
        params: &ObjectDiseaseParams,
        now: DateTime,
        nearby_humans: &[(String, f64)],
        rng: &mut RandomWrapper,
    ) {
        if self.stage == ObjectStage::Clean && self.next_clean <= now {
            self.next_clean = self.next_clean.saturating_add(params.cleaning_interval);
            return;
        }

        for (human_id, contamination_probability) in nearby_humans {
            if *contamination_probability <= 0.0 {
                continue;
            }
            let u = rng.uniform();
            if *contamination_probability > u {
                self.stage = ObjectStage::Contaminated;
                self.infected_by.push((human_id.clone(), now));
                break;
            }
        }

        if self.stage == ObjectStage::Contaminated && self.next_clean <= now {
            self.stage = ObjectStage::Clean;
            self.next_clean = self.next_clean.saturating_add(params.cleaning_interval);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::TimeDelta;

    fn params() -> ObjectDiseaseParams {
        ObjectDiseaseParams { infect_probability: 0.9, radius: 1.0, cleaning_interval: TimeDelta(100) }
    }

    #[test]
    fn contamination_records_source_and_timestamp() {
        let mut object = ObjectInfectionCycle::new("chair", DateTime(100));
        let mut rng = RandomWrapper::new(1, 0);
        object.tick(&params(), DateTime(10), &[("patient-1".to_string(), 1.0)], &mut rng);
        assert_eq!(object.stage, ObjectStage::Contaminated);
        assert_eq!(object.infected_by, vec![("patient-1".to_string(), DateTime(10))]);
    }

    #[test]
    fn cleaning_resets_to_clean_and_advances_next_clean() {
        let mut object = ObjectInfectionCycle::new("chair", DateTime(100));
        object.stage = ObjectStage::Contaminated;
        let mut rng = RandomWrapper::new(1, 0);
        object.tick(&params(), DateTime(150), &[], &mut rng);
        assert_eq!(object.stage, ObjectStage::Clean);
        assert_eq!(object.next_clean, DateTime(200));
    }

    #[test]
    fn get_infect_probability_requires_contact_distance() {
        let mut object = ObjectInfectionCycle::new("chair", DateTime(100));
        object.stage = ObjectStage::Contaminated;
        assert_eq!(object.get_infect_probability(&params(), 0.1), 0.9);
        assert_eq!(object.get_infect_probability(&params(), 1.0), 0.0);
    }
}
