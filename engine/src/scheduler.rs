//! Tick scheduler: strict phase order, once per call.
//! Manager sync order within the barrier is a fixed `const` array so the
//! `mpi_base_tag + {0,1,2}` arithmetic never collides.

use crate::agents::factory::{AgentFactory, FixedPerson, Object, Patient};
use crate::agents::exit_sink::ExitSink;
use crate::agents::id::AgentId;
use crate::clock::{Clock, Tick};
use crate::disease::params::HumanDiseaseParams;
use crate::disease::{DiseaseParams, IcuEnvironment};
use crate::entry::EntrySource;
use crate::error::SimResult;
use crate::geography::coord::{ContinuousCoord, DiscreteCoord};
use crate::geography::pathfinder::Pathfinder;
use crate::geography::plan::HospitalPlan;
use crate::geography::space::Space;
use crate::managers::chair::ChairManager;
use crate::managers::doctors::DoctorManager;
use crate::managers::icu::IcuManager;
use crate::managers::queue::QueueManager;
use crate::managers::transport::ManagerChannel;
use crate::migration::MigrationTransport;
use crate::patient_fsm::FsmCtx;
use crate::random::RandomWrapper;

/// Fixed manager sync order for phase 5b: chairs, reception,
/// triage, doctors, ICU.
pub const MANAGER_SYNC_ORDER: [&str; 5] = ["chairs", "reception", "triage", "doctors", "icu"];

pub struct Scheduler<'a> {
    pub clock: Clock,
    pub factory: AgentFactory,
    pub space: Space,
    pub pathfinder: Pathfinder,
    pub plan: &'a HospitalPlan,
    pub rng: RandomWrapper,
    pub entry_source: EntrySource,
    pub exit_sink: ExitSink,
    pub patients: Vec<Patient>,
    pub staff: Vec<FixedPerson>,
    pub objects: Vec<Object>,
    pub disease: DiseaseParams,
    pub environment: IcuEnvironment,

    pub chairs: &'a mut dyn ChairManager,
    pub reception: &'a mut dyn QueueManager,
    pub triage: &'a mut dyn QueueManager,
    pub doctors: &'a mut dyn DoctorManager,
    pub icu: &'a mut dyn IcuManager,
    pub channel: &'a mut dyn ManagerChannel,
    pub migration: &'a mut dyn MigrationTransport,

    pub reception_attention_time: crate::clock::TimeDelta,
    pub triage_attention_time: crate::clock::TimeDelta,
    pub doctor_attention_time: crate::clock::TimeDelta,
    pub walk_speed: f64,
}

fn human_label(id: AgentId) -> String {
    format!("{:?}:{}:{}", id.kind, id.home_rank, id.local_id)
}

/// Neighbor candidates for a human infection tick: every agent within
/// `params.infect_distance` of `center` that carries a `HumanInfectionCycle`
/// (patients or staff), excluding `exclude` itself. Takes both halves of a
/// `split_at_mut` borrow for patients and for staff so one function serves
/// both the patient loop and the staff loop; callers that don't need one
/// side pass `&[]`.
#[allow(clippy::too_many_arguments)]
fn gather_human_neighbors(
    space: &Space,
    center: ContinuousCoord,
    params: &HumanDiseaseParams,
    exclude: AgentId,
    patients_a: &[Patient],
    patients_b: &[Patient],
    staff_a: &[FixedPerson],
    staff_b: &[FixedPerson],
) -> Vec<(f64, String, DiscreteCoord)> {
    space
        .agents_around(center, params.infect_distance)
        .into_iter()
        .filter(|agent| agent.id != exclude)
        .filter_map(|agent| {
            let cycle = patients_a
                .iter()
                .chain(patients_b.iter())
                .find(|p| p.id == agent.id)
                .map(|p| &p.infection)
                .or_else(|| staff_a.iter().chain(staff_b.iter()).find(|s| s.id == agent.id).map(|s| &s.infection))?;
            let distance = agent.continuous.distance(center);
            let probability = cycle.get_infect_probability(params, distance);
            (probability > 0.0).then(|| (probability, human_label(agent.id), agent.discrete))
        })
        .collect()
}

/// Nearby humans for an object's contamination tick: id label plus
/// contamination probability, for every human within `radius` of `center`.
fn gather_nearby_humans(
    space: &Space,
    center: ContinuousCoord,
    radius: f64,
    human_params: &HumanDiseaseParams,
    patients: &[Patient],
    staff: &[FixedPerson],
) -> Vec<(String, f64)> {
    space
        .agents_around(center, radius)
        .into_iter()
        .filter_map(|agent| {
            let cycle = patients
                .iter()
                .find(|p| p.id == agent.id)
                .map(|p| &p.infection)
                .or_else(|| staff.iter().find(|s| s.id == agent.id).map(|s| &s.infection))?;
            let probability = cycle.get_contamination_probability(human_params);
            (probability > 0.0).then(|| (human_label(agent.id), probability))
        })
        .collect()
}

impl<'a> Scheduler<'a> {
    /// Executes the six tick phases exactly once, unconditionally.
    pub fn run_tick(&mut self) -> SimResult<()> {
        // 1. Advance clock.
        self.clock.advance();

        // 2. Entry source.
        let starts_sick = self.entry_source.patients_waiting(&self.clock, &mut self.rng);
        for sick in starts_sick {
            let patient = self.factory.new_patient(self.plan.entry, sick, self.clock.now());
            self.space.insert(patient.id, self.plan.entry);
            self.patients.push(patient);
        }

        // 3. Per-agent behavior: patients in local insertion order, then the
        // infection cycle for patients, staff (no behavior, only infection)
        // and objects.
        for index in 0..self.patients.len() {
            let (before, rest) = self.patients.split_at_mut(index);
            let (patient, after) = rest.split_first_mut().expect("index in bounds");
            let mut ctx = FsmCtx {
                id: patient.id,
                space: &mut self.space,
                pathfinder: &mut self.pathfinder,
                plan: self.plan,
                clock: &self.clock,
                rng: &mut self.rng,
                chairs: &mut *self.chairs,
                reception: &mut *self.reception,
                triage: &mut *self.triage,
                doctors: &mut *self.doctors,
                icu: &mut *self.icu,
                reception_attention_time: self.reception_attention_time,
                triage_attention_time: self.triage_attention_time,
                doctor_attention_time: self.doctor_attention_time,
                walk_speed: self.walk_speed,
            };
            patient.fsm.step(&mut ctx)?;

            let my_location = self.space.get_discrete_location(patient.id).unwrap_or(self.plan.entry);
            let my_point = self.space.get_continuous_location(patient.id).unwrap_or(my_location.to_continuous());
            let human_params = &self.disease.human;
            let neighbors =
                gather_human_neighbors(&self.space, my_point, human_params, patient.id, before, after, &self.staff, &[]);
            let icu_occupancy = self.icu.occupancy();
            let environment_probability = if my_location == self.plan.icu_entry {
                self.environment.get_probability(icu_occupancy.0, icu_occupancy.1)
            } else {
                0.0
            };
            patient.infection.tick(human_params, environment_probability, self.clock.now(), my_location, &neighbors, &mut self.rng);
        }

        for index in 0..self.staff.len() {
            let (before, rest) = self.staff.split_at_mut(index);
            let (person, after) = rest.split_first_mut().expect("index in bounds");
            let point = person.home_cell.to_continuous();
            let human_params = &self.disease.human;
            let neighbors =
                gather_human_neighbors(&self.space, point, human_params, person.id, &self.patients, &[], before, after);
            let icu_occupancy = self.icu.occupancy();
            let environment_probability = if person.home_cell == self.plan.icu_entry {
                self.environment.get_probability(icu_occupancy.0, icu_occupancy.1)
            } else {
                0.0
            };
            person.infection.tick(human_params, environment_probability, self.clock.now(), person.home_cell, &neighbors, &mut self.rng);
        }

        for object in self.objects.iter_mut() {
            let home_point = object.home_cell.to_continuous();
            if let Some(object_params) = self.disease.objects.get(&object.infection.type_tag) {
                let nearby =
                    gather_nearby_humans(&self.space, home_point, object_params.radius, &self.disease.human, &self.patients, &self.staff);
                object.infection.tick(object_params, self.clock.now(), &nearby, &mut self.rng);
            }
        }

        // 4. Exit sink.
        self.exit_sink.collect(&mut self.space, self.plan.exit, &mut self.patients);

        // 5a. Space migration.
        self.space.balance(&mut *self.migration);

        // 5b. Manager sync, fixed order.
        self.chairs.sync(&mut *self.channel);
        self.reception.sync(&mut *self.channel);
        self.triage.sync(&mut *self.channel);
        self.doctors.sync(&mut *self.channel);
        let now = self.clock.now();
        self.icu.sync(&mut *self.channel, now, &mut self.rng);

        Ok(())
    }

    pub fn run(&mut self, stop_at: Tick) -> SimResult<()> {
        while self.clock.tick() < stop_at {
            self.run_tick()?;
        }
        Ok(())
    }
}
