//! Exit sink: collects and disposes of agents that reached
//! the exit tile, producing the rows that back `results.csv`.

use crate::agents::factory::Patient;
use crate::clock::DateTime;
use crate::disease::human::Stage;
use crate::geography::coord::DiscreteCoord;
use crate::geography::space::Space;

#[derive(Debug, Clone, serde::Serialize)]
pub struct ExitRecord {
    pub agent_local_id: u32,
    pub final_stage: String,
    pub infection_time: Option<u64>,
    pub infected_by: Option<String>,
}

#[derive(Default)]
pub struct ExitSink {
    records: Vec<ExitRecord>,
}

impl ExitSink {
    pub fn new() -> ExitSink {
        ExitSink::default()
    }

    pub fn records(&self) -> &[ExitRecord] {
        &self.records
    }

    /// Removes every patient standing on `exit_cell` from `space`, recording
    /// an `ExitRecord` for each. Patients are passed in
    /// separately from `space` since `Space` only tracks positions, not
    /// agent payloads. A patient already absent from `space` (the `Morgue`
    /// transition removes deceased patients directly) is swept out the same
    /// way, so it doesn't linger in `patients` forever.
    pub fn collect(&mut self, space: &mut Space, exit_cell: DiscreteCoord, patients: &mut Vec<Patient>) {
        let mut remaining = Vec::with_capacity(patients.len());
        for patient in patients.drain(..) {
            match space.get_discrete_location(patient.id) {
                Some(location) if location == exit_cell => {
                    self.records.push(ExitRecord {
                        agent_local_id: patient.id.local_id,
                        final_stage: format!("{:?}", patient.infection.stage),
                        infection_time: patient.infection.infection_time.map(DateTime::epoch_seconds),
                        infected_by: patient.infection.infected_by.clone(),
                    });
                    space.remove(patient.id);
                }
                None => {
                    self.records.push(ExitRecord {
                        agent_local_id: patient.id.local_id,
                        final_stage: format!("{:?}", patient.infection.stage),
                        infection_time: patient.infection.infection_time.map(DateTime::epoch_seconds),
                        infected_by: patient.infection.infected_by.clone(),
                    });
                }
                Some(_) => remaining.push(patient),
            }
        }
        *patients = remaining;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::factory::AgentFactory;
    use crate::geography::space::Region;

    #[test]
    fn collects_patients_standing_on_exit_cell() {
        let mut factory = AgentFactory::new(0);
        let mut space = Space::new(Region { min: DiscreteCoord::new(0, 0), max: DiscreteCoord::new(9, 9) });
        let exit_cell = DiscreteCoord::new(5, 5);

        let patient = factory.new_patient(DiscreteCoord::new(0, 0), false, DateTime::EPOCH);
        space.insert(patient.id, exit_cell);
        let mut patients = vec![patient];

        let mut sink = ExitSink::new();
        sink.collect(&mut space, exit_cell, &mut patients);

        assert!(patients.is_empty());
        assert_eq!(sink.records().len(), 1);
    }

    #[test]
    fn sweeps_up_patients_already_removed_from_space() {
        let mut factory = AgentFactory::new(0);
        let mut space = Space::new(Region { min: DiscreteCoord::new(0, 0), max: DiscreteCoord::new(9, 9) });
        let exit_cell = DiscreteCoord::new(5, 5);

        let patient = factory.new_patient(DiscreteCoord::new(0, 0), false, DateTime::EPOCH);
        // never inserted into space, as happens when the Morgue transition
        // removes a deceased patient directly.
        let mut patients = vec![patient];

        let mut sink = ExitSink::new();
        sink.collect(&mut space, exit_cell, &mut patients);

        assert!(patients.is_empty());
        assert_eq!(sink.records().len(), 1);
    }

    #[test]
    fn leaves_patients_not_on_exit_cell() {
        let mut factory = AgentFactory::new(0);
        let mut space = Space::new(Region { min: DiscreteCoord::new(0, 0), max: DiscreteCoord::new(9, 9) });
        let exit_cell = DiscreteCoord::new(5, 5);

        let patient = factory.new_patient(DiscreteCoord::new(0, 0), false, DateTime::EPOCH);
        space.insert(patient.id, DiscreteCoord::new(1, 1));
        let mut patients = vec![patient];

        let mut sink = ExitSink::new();
        sink.collect(&mut space, exit_cell, &mut patients);

        assert_eq!(patients.len(), 1);
        assert!(sink.records().is_empty());
    }
}
