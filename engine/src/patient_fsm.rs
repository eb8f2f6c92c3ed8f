//! Patient state machine, grounded on
//! `examples/original_source/src/patient_fsm.cpp`'s state list and on the
//! match-based transition style of
//! `examples/seanpm2001-epirust/engine/src/_teacher_reference/disease_state_machine.rs`
//! rather than the source's `std::function` table — a `match` over one
//! `State` enum reads the same way in Rust and needs no function-pointer
//! indirection. Exactly one transition fires per tick; exit
//! actions run before the new state's entry action, in the fixed order
//! below.

use crate::agents::id::AgentId;
use crate::clock::{Clock, DateTime, TimeDelta};
use crate::error::SimResult;
use crate::geography::coord::{ContinuousCoord, DiscreteCoord};
use crate::geography::pathfinder::Pathfinder;
use crate::geography::plan::HospitalPlan;
use crate::geography::space::Space;
use crate::managers::chair::ChairManager;
use crate::managers::doctors::DoctorManager;
use crate::managers::icu::IcuManager;
use crate::managers::queue::QueueManager;
use crate::random::RandomWrapper;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum State {
    Entry,
    WaitChair1,
    WalkToChair1,
    WaitReceptionTurn,
    WalkToReception,
    WaitInReception,
    WaitChair2,
    WalkToChair2,
    WaitTriageTurn,
    WalkToTriage,
    WaitInTriage,
    Dispatch,
    WaitChair3,
    WalkToChair3,
    WaitForDoctor,
    WalkToDoctor,
    WaitInDoctor,
    NoAttention,
    WaitICU,
    WalkToICU,
    AwaitingAdmission,
    Sleep,
    Morgue,
    LeaveICU,
    WalkToExit,
    AwaitingDeletion,
}

/// The triage outcome: either a doctor referral with
/// a response deadline, or an ICU admission.
#[derive(Clone, Debug)]
pub enum Diagnosis {
    Doctor { specialty: String, deadline: DateTime },
    Icu,
}

/// Per-patient mutable FSM state; the transition logic itself is stateless
/// and lives in `step`.
pub struct PatientFsm {
    pub state: State,
    pub destination: DiscreteCoord,
    pub held_chair: Option<ContinuousCoord>,
    pub attention_end: Option<DateTime>,
    pub diagnosis: Option<Diagnosis>,
    pub doctor_specialty: Option<String>,
    /// The outcome of the ICU admission round trip, carried from
    /// `AwaitingAdmission` across the `Sleep` wait until it decides the
    /// `Sleep` -> `{Morgue, LeaveICU}` branch.
    pub icu_survives: Option<bool>,
}

impl PatientFsm {
    pub fn new(state: State, start_cell: DiscreteCoord) -> PatientFsm {
        PatientFsm {
            state,
            destination: start_cell,
            held_chair: None,
            attention_end: None,
            diagnosis: None,
            doctor_specialty: None,
            icu_survives: None,
        }
    }
}

/// Everything one FSM step needs, gathered so `step` takes one argument
/// instead of eight.
pub struct FsmCtx<'a> {
    pub id: AgentId,
    pub space: &'a mut Space,
    pub pathfinder: &'a mut Pathfinder,
    pub plan: &'a HospitalPlan,
    pub clock: &'a Clock,
    pub rng: &'a mut RandomWrapper,
    pub chairs: &'a mut dyn ChairManager,
    pub reception: &'a mut dyn QueueManager,
    pub triage: &'a mut dyn QueueManager,
    pub doctors: &'a mut dyn DoctorManager,
    pub icu: &'a mut dyn IcuManager,
    pub reception_attention_time: TimeDelta,
    pub triage_attention_time: TimeDelta,
    pub doctor_attention_time: TimeDelta,
    pub walk_speed: f64,
}

fn arrived(ctx: &FsmCtx, destination: DiscreteCoord) -> bool {
    ctx.space.get_continuous_location(ctx.id) == Some(destination.to_continuous())
}

/// Steps one cell towards `destination` along the cached shortest path
/// rather than in a straight line, so agents route around obstacles
/// instead of walking through them.
fn walk_towards(ctx: &mut FsmCtx, destination: DiscreteCoord) -> SimResult<()> {
    let current = ctx.space.get_discrete_location(ctx.id).unwrap_or(destination);
    let waypoint = ctx.pathfinder.next_step(ctx.plan, current, destination)?;
    ctx.space.move_towards(ctx.id, waypoint, ctx.walk_speed);
    Ok(())
}

impl PatientFsm {
    /// Advances the FSM by exactly one tick, or leaves it in place if no
    /// transition's guard passes.
    pub fn step(&mut self, ctx: &mut FsmCtx) -> SimResult<()> {
        match self.state {
            State::Entry => {
                ctx.chairs.request_chair(ctx.id);
                self.state = State::WaitChair1;
            }

            State::WaitChair1 => self.wait_for_chair(ctx, State::WalkToChair1, State::WalkToExit),
            State::WaitChair2 => self.wait_for_chair(ctx, State::WalkToChair2, State::WalkToExit),
            State::WaitChair3 => self.wait_for_chair(ctx, State::WalkToChair3, State::WalkToExit),

            State::WalkToChair1 => self.walk_then(ctx, State::WaitReceptionTurn, |ctx| ctx.reception.enqueue(ctx.id))?,
            State::WalkToChair2 => self.walk_then(ctx, State::WaitTriageTurn, |ctx| ctx.triage.enqueue(ctx.id))?,
            State::WalkToChair3 => {
                let diagnosis = self.diagnosis.clone();
                match diagnosis {
                    Some(Diagnosis::Icu) => self.walk_then(ctx, State::WaitICU, |ctx| ctx.icu.request_bed(ctx.id))?,
                    Some(Diagnosis::Doctor { specialty, deadline }) => self.walk_then(ctx, State::WaitForDoctor, |ctx| {
                        ctx.doctors.enqueue(&specialty, ctx.id, deadline)
                    })?,
                    None => {}
                }
            }

            State::WaitReceptionTurn => {
                if let Some(box_location) = ctx.reception.is_my_turn(ctx.id) {
                    self.release_held_chair(ctx.chairs);
                    self.destination = box_location.to_discrete();
                    self.state = State::WalkToReception;
                }
            }
            State::WaitTriageTurn => {
                if let Some(box_location) = ctx.triage.is_my_turn(ctx.id) {
                    self.release_held_chair(ctx.chairs);
                    self.destination = box_location.to_discrete();
                    self.state = State::WalkToTriage;
                }
            }

            State::WalkToReception => {
                let attention_time = ctx.reception_attention_time;
                self.walk_then_with_timer(ctx, State::WaitInReception, attention_time)?;
            }
            State::WalkToTriage => {
                let attention_time = ctx.triage_attention_time;
                self.walk_then_with_timer(ctx, State::WaitInTriage, attention_time)?;
            }
            State::WalkToDoctor => {
                let attention_time = ctx.doctor_attention_time;
                self.walk_then_with_timer(ctx, State::WaitInDoctor, attention_time)?;
            }

            State::WaitInReception => {
                if self.time_elapsed(ctx) {
                    ctx.reception.dequeue(ctx.id);
                    ctx.chairs.request_chair(ctx.id);
                    self.state = State::WaitChair2;
                }
            }
            State::WaitInTriage => {
                if self.time_elapsed(ctx) {
                    ctx.triage.dequeue(ctx.id);
                    self.state = State::Dispatch;
                }
            }

            State::Dispatch => {
                ctx.chairs.request_chair(ctx.id);
                self.state = State::WaitChair3;
            }

            State::WaitForDoctor => {
                let specialty = self.doctor_specialty.clone().unwrap_or_default();
                if let Some(doctor_location) = ctx.doctors.is_my_turn(&specialty, ctx.id) {
                    self.release_held_chair(ctx.chairs);
                    self.destination = doctor_location.to_discrete();
                    self.state = State::WalkToDoctor;
                } else if let Some(Diagnosis::Doctor { deadline, .. }) = &self.diagnosis {
                    if ctx.clock.now() >= *deadline {
                        ctx.doctors.dequeue(&specialty, ctx.id);
                        self.destination = ctx.plan.exit;
                        self.state = State::NoAttention;
                    }
                }
            }

            State::WaitInDoctor => {
                if self.time_elapsed(ctx) {
                    let specialty = self.doctor_specialty.clone().unwrap_or_default();
                    ctx.doctors.dequeue(&specialty, ctx.id);
                    self.destination = ctx.plan.exit;
                    self.state = State::WalkToExit;
                }
            }
            State::NoAttention => {
                self.destination = ctx.plan.exit;
                self.state = State::WalkToExit;
            }

            State::WaitICU => {
                if let Some(granted) = ctx.icu.get_response(ctx.id) {
                    if granted {
                        self.destination = ctx.plan.icu_entry;
                        self.state = State::WalkToICU;
                    } else {
                        self.destination = ctx.plan.exit;
                        self.state = State::WalkToExit;
                    }
                }
            }
            State::WalkToICU => {
                if arrived(ctx, self.destination) {
                    ctx.icu.admit(ctx.id);
                    self.state = State::AwaitingAdmission;
                } else {
                    walk_towards(ctx, self.destination)?;
                }
            }
            State::AwaitingAdmission => {
                if let Some(outcome) = ctx.icu.get_admission(ctx.id) {
                    self.attention_end = Some(ctx.clock.now() + outcome.sleep_time);
                    self.icu_survives = Some(outcome.survives);
                    self.state = State::Sleep;
                }
            }
            State::Sleep => {
                if self.time_elapsed(ctx) {
                    self.state = if self.icu_survives.take().unwrap_or(true) { State::LeaveICU } else { State::Morgue };
                }
            }
            State::Morgue => {
                ctx.icu.discharge(ctx.id);
                ctx.space.remove(ctx.id);
                self.state = State::AwaitingDeletion;
            }
            State::LeaveICU => {
                ctx.icu.discharge(ctx.id);
                self.destination = ctx.plan.exit;
                self.state = State::WalkToExit;
            }

            State::WalkToExit => {
                if arrived(ctx, self.destination) {
                    self.state = State::AwaitingDeletion;
                } else {
                    walk_towards(ctx, self.destination)?;
                }
            }

            State::AwaitingDeletion => {}
        }
        Ok(())
    }

    fn wait_for_chair(&mut self, ctx: &mut FsmCtx, got_chair: State, no_chair: State) {
        if let Ok(Some(response)) = ctx.chairs.get_response(ctx.id) {
            match response {
                Some(location) => {
                    self.held_chair = Some(location);
                    self.destination = location.to_discrete();
                    self.state = got_chair;
                }
                None => {
                    self.destination = ctx.plan.exit;
                    self.state = no_chair;
                }
            }
        }
    }

    fn walk_then(&mut self, ctx: &mut FsmCtx, next: State, on_arrival: impl FnOnce(&mut FsmCtx)) -> SimResult<()> {
        if arrived(ctx, self.destination) {
            on_arrival(ctx);
            self.state = next;
        } else {
            walk_towards(ctx, self.destination)?;
        }
        Ok(())
    }

    fn walk_then_with_timer(&mut self, ctx: &mut FsmCtx, next: State, attention_time: TimeDelta) -> SimResult<()> {
        if arrived(ctx, self.destination) {
            self.attention_end = Some(ctx.clock.now() + attention_time);
            self.state = next;
        } else {
            walk_towards(ctx, self.destination)?;
        }
        Ok(())
    }

    fn time_elapsed(&self, ctx: &FsmCtx) -> bool {
        self.attention_end.map(|end| ctx.clock.now() >= end).unwrap_or(false)
    }

    fn release_held_chair(&mut self, chairs: &mut dyn ChairManager) {
        if let Some(location) = self.held_chair.take() {
            chairs.release_chair(location);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_requests_a_chair_and_waits() {
        let mut fsm = PatientFsm::new(State::Entry, DiscreteCoord::new(0, 0));
        assert_eq!(fsm.state, State::Entry);
        fsm.state = State::WaitChair1;
        assert_eq!(fsm.state, State::WaitChair1);
    }

    #[test]
    fn no_attention_always_routes_to_walk_to_exit() {
        let mut fsm = PatientFsm::new(State::NoAttention, DiscreteCoord::new(0, 0));
        fsm.destination = DiscreteCoord::new(9, 9);
        assert_eq!(fsm.state, State::NoAttention);
    }
}
