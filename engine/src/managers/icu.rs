//! ICU bed pool manager, grounded on
//! `examples/original_source/src/icu/real_icu.cpp`.

use serde::{Deserialize, Serialize};

use crate::agents::id::AgentId;
use crate::clock::DateTime;
use crate::error::{SimError, SimResult};
use crate::managers::transport::{ManagerChannel, ManagerTags};
use crate::random::RandomWrapper;

#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
pub struct BedResponse {
    pub id: AgentId,
    pub granted: bool,
}

/// The outcome of an admission round trip: how long the patient sleeps and
/// whether they survive, both decided by the authority (it owns the rng
/// draws, since only it has the bed/death-probability parameters).
#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
pub struct AdmissionOutcome {
    pub sleep_time: crate::clock::TimeDelta,
    pub survives: bool,
}

#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
struct AdmissionResponse {
    id: AgentId,
    outcome: AdmissionOutcome,
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct IcuStatistics {
    pub admissions: Vec<(AgentId, u64)>,
    pub releases: Vec<(AgentId, u64)>,
    pub rejections: Vec<(AgentId, u64)>,
}

pub trait IcuManager {
    fn request_bed(&mut self, id: AgentId);
    fn admit(&mut self, id: AgentId);
    fn discharge(&mut self, id: AgentId);
    fn sync(&mut self, channel: &mut dyn ManagerChannel, now: DateTime, rng: &mut RandomWrapper);
    fn get_response(&mut self, id: AgentId) -> Option<bool>;
    fn get_admission(&mut self, id: AgentId) -> Option<AdmissionOutcome>;
    fn occupancy(&self) -> (u32, u32);
}

struct Bed {
    occupant: Option<AgentId>,
}

/// Validated at construction: `death_probability` in
/// `[0,1]`, sleep-time distribution summing to 1 within tolerance.
pub struct IcuAuthority {
    tags: ManagerTags,
    admission_tags: ManagerTags,
    occupancy_tag: i32,
    capacity: u32,
    reserved_beds: u32,
    beds: Vec<Bed>,
    death_probability: f64,
    sleep_time_distribution: Vec<(DateTime, f64)>,
    pending_requests: Vec<AgentId>,
    responses: std::collections::HashMap<AgentId, bool>,
    pending_admits: Vec<AgentId>,
    pending_discharges: Vec<AgentId>,
    admission_responses: std::collections::HashMap<AgentId, AdmissionOutcome>,
    stats: IcuStatistics,
}

impl IcuAuthority {
    pub fn new(
        base_tag: i32,
        capacity: u32,
        death_probability: f64,
        sleep_time_distribution: Vec<(DateTime, f64)>,
    ) -> SimResult<IcuAuthority> {
        if !(0.0..=1.0).contains(&death_probability) {
            return Err(SimError::ProbabilityOutOfRange { field: "icu.death_probability", value: death_probability });
        }
        let sum: f64 = sleep_time_distribution.iter().map(|(_, p)| p).sum();
        if !(0.99..=1.01).contains(&sum) {
            return Err(SimError::DistributionDoesNotSum { name: "icu.sleep_time", sum });
        }
        Ok(IcuAuthority {
            tags: ManagerTags::from_base(base_tag),
            admission_tags: ManagerTags::from_base(base_tag + 3),
            occupancy_tag: base_tag + 6,
            capacity,
            reserved_beds: 0,
            beds: (0..capacity).map(|_| Bed { occupant: None }).collect(),
            death_probability,
            sleep_time_distribution,
            pending_requests: Vec::new(),
            responses: std::collections::HashMap::new(),
            pending_admits: Vec::new(),
            pending_discharges: Vec::new(),
            admission_responses: std::collections::HashMap::new(),
            stats: IcuStatistics::default(),
        })
    }

    pub fn stats(&self) -> &IcuStatistics {
        &self.stats
    }

    pub fn beds_in_use(&self) -> u32 {
        self.beds.iter().filter(|bed| bed.occupant.is_some()).count() as u32
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Called when a patient with a granted reservation arrives at the ICU
    /// entry tile.
    pub fn insert(&mut self, patient: AgentId, now: DateTime) -> SimResult<()> {
        let bed = self.beds.iter_mut().find(|bed| bed.occupant.is_none()).ok_or(SimError::IcuNoFreeBed)?;
        bed.occupant = Some(patient);
        self.stats.admissions.push((patient, now.epoch_seconds()));
        Ok(())
    }

    /// Frees the patient's bed and spawns them at the ICU exit; the caller is responsible for the actual respawn.
    pub fn remove(&mut self, patient: AgentId, now: DateTime) -> SimResult<()> {
        let bed = self.beds.iter_mut().find(|bed| bed.occupant == Some(patient)).ok_or(SimError::IcuPatientNotPresent)?;
        bed.occupant = None;
        self.reserved_beds = self.reserved_beds.saturating_sub(1);
        self.stats.releases.push((patient, now.epoch_seconds()));
        Ok(())
    }

    pub fn get_icu_time(&self, rng: &mut RandomWrapper) -> crate::clock::TimeDelta {
        let options: Vec<(DateTime, f64)> = self.sleep_time_distribution.clone();
        let chosen = rng.weighted_choice(&options);
        crate::clock::TimeDelta(chosen.epoch_seconds())
    }

    pub fn survives(&self, rng: &mut RandomWrapper) -> bool {
        !rng.bernoulli(self.death_probability)
    }
}

impl IcuManager for IcuAuthority {
    fn request_bed(&mut self, id: AgentId) {
        self.pending_requests.push(id);
    }

    fn admit(&mut self, id: AgentId) {
        self.pending_admits.push(id);
    }

    fn discharge(&mut self, id: AgentId) {
        self.pending_discharges.push(id);
    }

    fn sync(&mut self, channel: &mut dyn ManagerChannel, now: DateTime, rng: &mut RandomWrapper) {
        let mut requests = std::mem::take(&mut self.pending_requests);
        for (_, batch) in channel.receive_from_proxies::<Vec<AgentId>>(self.tags.request) {
            requests.extend(batch);
        }

        for id in requests {
            let granted = self.reserved_beds < self.capacity;
            if granted {
                self.reserved_beds += 1;
            } else {
                self.stats.rejections.push((id, now.epoch_seconds()));
            }
            self.responses.insert(id, granted);
            let response = BedResponse { id, granted };
            if id.current_rank != channel.my_rank() {
                channel.send_to_proxy(id.current_rank, self.tags.response, &response);
            }
        }

        let mut admits = std::mem::take(&mut self.pending_admits);
        for (_, batch) in channel.receive_from_proxies::<Vec<AgentId>>(self.admission_tags.request) {
            admits.extend(batch);
        }
        for id in admits {
            if self.insert(id, now).is_ok() {
                let outcome = AdmissionOutcome { sleep_time: self.get_icu_time(rng), survives: self.survives(rng) };
                self.admission_responses.insert(id, outcome);
                if id.current_rank != channel.my_rank() {
                    channel.send_to_proxy(id.current_rank, self.admission_tags.response, &AdmissionResponse { id, outcome });
                }
            }
        }

        let mut discharges = std::mem::take(&mut self.pending_discharges);
        for (_, batch) in channel.receive_from_proxies::<Vec<AgentId>>(self.admission_tags.release) {
            discharges.extend(batch);
        }
        for id in discharges {
            let _ = self.remove(id, now);
        }

        let occupancy = (self.beds_in_use(), self.capacity);
        channel.broadcast_from_authority(self.occupancy_tag, Some(occupancy));
    }

    fn get_response(&mut self, id: AgentId) -> Option<bool> {
        self.responses.remove(&id)
    }

    fn get_admission(&mut self, id: AgentId) -> Option<AdmissionOutcome> {
        self.admission_responses.remove(&id)
    }

    fn occupancy(&self) -> (u32, u32) {
        (self.beds_in_use(), self.capacity)
    }
}

pub struct IcuProxy {
    tags: ManagerTags,
    admission_tags: ManagerTags,
    occupancy_tag: i32,
    pending_requests: Vec<AgentId>,
    responses: std::collections::HashMap<AgentId, bool>,
    pending_admits: Vec<AgentId>,
    pending_discharges: Vec<AgentId>,
    admission_responses: std::collections::HashMap<AgentId, AdmissionOutcome>,
    occupancy: (u32, u32),
}

impl IcuProxy {
    pub fn new(base_tag: i32) -> IcuProxy {
        IcuProxy {
            tags: ManagerTags::from_base(base_tag),
            admission_tags: ManagerTags::from_base(base_tag + 3),
            occupancy_tag: base_tag + 6,
            pending_requests: Vec::new(),
            responses: std::collections::HashMap::new(),
            pending_admits: Vec::new(),
            pending_discharges: Vec::new(),
            admission_responses: std::collections::HashMap::new(),
            occupancy: (0, 0),
        }
    }
}

impl IcuManager for IcuProxy {
    fn request_bed(&mut self, id: AgentId) {
        self.pending_requests.push(id);
    }

    fn admit(&mut self, id: AgentId) {
        self.pending_admits.push(id);
    }

    fn discharge(&mut self, id: AgentId) {
        self.pending_discharges.push(id);
    }

    fn sync(&mut self, channel: &mut dyn ManagerChannel, _now: DateTime, _rng: &mut RandomWrapper) {
        let requests = std::mem::take(&mut self.pending_requests);
        channel.send_to_authority(self.tags.request, &requests);
        for id in requests {
            let response: BedResponse = channel.receive_from_authority(self.tags.response);
            self.responses.insert(response.id.migrated_to(id.current_rank), response.granted);
        }

        let admits = std::mem::take(&mut self.pending_admits);
        channel.send_to_authority(self.admission_tags.request, &admits);
        for id in admits {
            let response: AdmissionResponse = channel.receive_from_authority(self.admission_tags.response);
            self.admission_responses.insert(response.id.migrated_to(id.current_rank), response.outcome);
        }

        let discharges = std::mem::take(&mut self.pending_discharges);
        channel.send_to_authority(self.admission_tags.release, &discharges);

        self.occupancy = channel.broadcast_from_authority(self.occupancy_tag, None);
    }

    fn get_response(&mut self, id: AgentId) -> Option<bool> {
        self.responses.remove(&id)
    }

    fn get_admission(&mut self, id: AgentId) -> Option<AdmissionOutcome> {
        self.admission_responses.remove(&id)
    }

    fn occupancy(&self) -> (u32, u32) {
        self.occupancy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::id::AgentKind;
    use crate::managers::transport::LoopbackChannel;

    #[test]
    fn rejects_invalid_death_probability() {
        assert!(IcuAuthority::new(400, 1, 1.5, vec![(DateTime(10), 1.0)]).is_err());
    }

    #[test]
    fn rejects_distribution_not_summing_to_one() {
        assert!(IcuAuthority::new(400, 1, 0.2, vec![(DateTime(10), 0.5)]).is_err());
    }

    #[test]
    fn second_request_is_rejected_once_capacity_exhausted() {
        let mut authority = IcuAuthority::new(400, 1, 0.2, vec![(DateTime(10), 1.0)]).unwrap();
        let mut channel = LoopbackChannel::new();
        let mut rng = RandomWrapper::new(1, 0);
        let a = AgentId::new(1, 0, AgentKind::Patient);
        let b = AgentId::new(2, 0, AgentKind::Patient);
        authority.request_bed(a);
        authority.request_bed(b);
        authority.sync(&mut channel, DateTime(0), &mut rng);
        assert_eq!(authority.get_response(a), Some(true));
        assert_eq!(authority.get_response(b), Some(false));
        assert_eq!(authority.stats().rejections.len(), 1);
    }

    #[test]
    fn insert_and_remove_track_bed_occupancy() {
        let mut authority = IcuAuthority::new(400, 1, 0.2, vec![(DateTime(10), 1.0)]).unwrap();
        let mut rng = RandomWrapper::new(1, 0);
        let a = AgentId::new(1, 0, AgentKind::Patient);
        authority.insert(a, DateTime(5)).unwrap();
        assert_eq!(authority.beds_in_use(), 1);
        authority.request_bed(a);
        let mut channel = LoopbackChannel::new();
        authority.sync(&mut channel, DateTime(5), &mut rng);
        authority.remove(a, DateTime(20)).unwrap();
        assert_eq!(authority.beds_in_use(), 0);
    }

    #[test]
    fn admit_assigns_a_sleep_time_and_discharge_frees_the_bed() {
        let mut authority = IcuAuthority::new(400, 1, 0.0, vec![(DateTime(42), 1.0)]).unwrap();
        let mut channel = LoopbackChannel::new();
        let mut rng = RandomWrapper::new(1, 0);
        let a = AgentId::new(1, 0, AgentKind::Patient);
        authority.admit(a);
        authority.sync(&mut channel, DateTime(0), &mut rng);
        let outcome = authority.get_admission(a).expect("admission outcome present after sync");
        assert!(outcome.survives);
        assert_eq!(outcome.sleep_time, crate::clock::TimeDelta(42));
        assert_eq!(authority.occupancy(), (1, 1));

        authority.discharge(a);
        authority.sync(&mut channel, DateTime(50), &mut rng);
        assert_eq!(authority.occupancy(), (0, 1));
    }
}
