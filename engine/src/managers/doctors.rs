//! Per-specialty doctor queues with the "freeze" invariant, grounded on
//! `examples/original_source/src/doctors/real_doctors.cpp`'s
//! `insert_in_order`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::clock::DateTime;
use crate::agents::id::AgentId;
use crate::geography::coord::ContinuousCoord;
use crate::managers::transport::{ManagerChannel, ManagerTags};

#[derive(Copy, Clone, Serialize, Deserialize)]
struct Entry {
    id: AgentId,
    deadline: DateTime,
}

#[derive(Clone, Serialize, Deserialize)]
struct Enqueue {
    specialty: String,
    id: AgentId,
    deadline: DateTime,
}

#[derive(Clone, Serialize, Deserialize)]
struct Dequeue {
    specialty: String,
    id: AgentId,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct DoctorFrontEntry {
    pub specialty: String,
    pub doctor_location: ContinuousCoord,
    pub id: AgentId,
}

pub trait DoctorManager {
    fn enqueue(&mut self, specialty: &str, id: AgentId, deadline: DateTime);
    fn dequeue(&mut self, specialty: &str, id: AgentId);
    fn sync(&mut self, channel: &mut dyn ManagerChannel);
    fn is_my_turn(&self, specialty: &str, id: AgentId) -> Option<ContinuousCoord>;
}

struct Specialty {
    doctor_positions: Vec<ContinuousCoord>,
    queue: Vec<Entry>,
}

impl Specialty {
    /// Inserts `entry` after the first `D` (frozen) positions, sorted
    /// ascending by deadline among the non-frozen tail.
    fn insert_in_order(&mut self, entry: Entry) {
        let frozen = self.doctor_positions.len().min(self.queue.len());
        let insert_at = self.queue[frozen..]
            .iter()
            .position(|queued| queued.deadline > entry.deadline)
            .map(|offset| frozen + offset)
            .unwrap_or(self.queue.len());
        self.queue.insert(insert_at, entry);
    }

    fn remove(&mut self, id: AgentId) {
        self.queue.retain(|entry| entry.id != id);
    }

    fn published_front(&self) -> Vec<(ContinuousCoord, AgentId)> {
        self.doctor_positions
            .iter()
            .zip(self.queue.iter())
            .map(|(pos, entry)| (*pos, entry.id))
            .collect()
    }
}

pub struct DoctorAuthority {
    tags: ManagerTags,
    specialties: HashMap<String, Specialty>,
    pending_enqueues: Vec<Enqueue>,
    pending_dequeues: Vec<Dequeue>,
    fronts: HashMap<String, Vec<(ContinuousCoord, AgentId)>>,
}

impl DoctorAuthority {
    pub fn new(base_tag: i32, doctor_positions: HashMap<String, Vec<ContinuousCoord>>) -> DoctorAuthority {
        let specialties = doctor_positions
            .into_iter()
            .map(|(specialty, doctor_positions)| (specialty, Specialty { doctor_positions, queue: Vec::new() }))
            .collect();
        DoctorAuthority {
            tags: ManagerTags::from_base(base_tag),
            specialties,
            pending_enqueues: Vec::new(),
            pending_dequeues: Vec::new(),
            fronts: HashMap::new(),
        }
    }
}

impl DoctorManager for DoctorAuthority {
    fn enqueue(&mut self, specialty: &str, id: AgentId, deadline: DateTime) {
        self.pending_enqueues.push(Enqueue { specialty: specialty.to_string(), id, deadline });
    }

    fn dequeue(&mut self, specialty: &str, id: AgentId) {
        self.pending_dequeues.push(Dequeue { specialty: specialty.to_string(), id });
    }

    fn sync(&mut self, channel: &mut dyn ManagerChannel) {
        let mut enqueues = std::mem::take(&mut self.pending_enqueues);
        let mut dequeues = std::mem::take(&mut self.pending_dequeues);
        for (_, batch) in channel.receive_from_proxies::<Vec<Enqueue>>(self.tags.request) {
            enqueues.extend(batch);
        }
        for (_, batch) in channel.receive_from_proxies::<Vec<Dequeue>>(self.tags.release) {
            dequeues.extend(batch);
        }

        for dequeue in dequeues {
            if let Some(specialty) = self.specialties.get_mut(&dequeue.specialty) {
                specialty.remove(dequeue.id);
            }
        }
        for enqueue in enqueues {
            if let Some(specialty) = self.specialties.get_mut(&enqueue.specialty) {
                specialty.insert_in_order(Entry { id: enqueue.id, deadline: enqueue.deadline });
            }
        }

        self.fronts = self.specialties.iter().map(|(name, s)| (name.clone(), s.published_front())).collect();
        let fronts = self.fronts.clone();
        channel.broadcast_from_authority(self.tags.response, Some(fronts));
    }

    fn is_my_turn(&self, specialty: &str, id: AgentId) -> Option<ContinuousCoord> {
        self.fronts.get(specialty)?.iter().find(|(_, front_id)| *front_id == id).map(|(pos, _)| *pos)
    }
}

pub struct DoctorProxy {
    tags: ManagerTags,
    pending_enqueues: Vec<Enqueue>,
    pending_dequeues: Vec<Dequeue>,
    fronts: HashMap<String, Vec<(ContinuousCoord, AgentId)>>,
}

impl DoctorProxy {
    pub fn new(base_tag: i32) -> DoctorProxy {
        DoctorProxy { tags: ManagerTags::from_base(base_tag), pending_enqueues: Vec::new(), pending_dequeues: Vec::new(), fronts: HashMap::new() }
    }
}

impl DoctorManager for DoctorProxy {
    fn enqueue(&mut self, specialty: &str, id: AgentId, deadline: DateTime) {
        self.pending_enqueues.push(Enqueue { specialty: specialty.to_string(), id, deadline });
    }

    fn dequeue(&mut self, specialty: &str, id: AgentId) {
        self.pending_dequeues.push(Dequeue { specialty: specialty.to_string(), id });
    }

    fn sync(&mut self, channel: &mut dyn ManagerChannel) {
        let enqueues = std::mem::take(&mut self.pending_enqueues);
        let dequeues = std::mem::take(&mut self.pending_dequeues);
        channel.send_to_authority(self.tags.request, &enqueues);
        channel.send_to_authority(self.tags.release, &dequeues);
        self.fronts = channel.broadcast_from_authority(self.tags.response, None);
    }

    fn is_my_turn(&self, specialty: &str, id: AgentId) -> Option<ContinuousCoord> {
        self.fronts.get(specialty)?.iter().find(|(_, front_id)| *front_id == id).map(|(pos, _)| *pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::id::AgentKind;
    use crate::managers::transport::LoopbackChannel;

    fn one_doctor_authority() -> DoctorAuthority {
        let mut positions = HashMap::new();
        positions.insert("general".to_string(), vec![ContinuousCoord::new(0.5, 0.5)]);
        DoctorAuthority::new(300, positions)
    }

    #[test]
    fn first_d_positions_are_never_reordered() {
        let mut authority = one_doctor_authority();
        let mut channel = LoopbackChannel::new();
        let a = AgentId::new(1, 0, AgentKind::Patient);
        let b = AgentId::new(2, 0, AgentKind::Patient);

        authority.enqueue("general", a, DateTime(100));
        authority.sync(&mut channel);
        assert_eq!(authority.is_my_turn("general", a), Some(ContinuousCoord::new(0.5, 0.5)));

        authority.enqueue("general", b, DateTime(1));
        authority.sync(&mut channel);
        assert_eq!(authority.is_my_turn("general", a), Some(ContinuousCoord::new(0.5, 0.5)));
        assert_eq!(authority.is_my_turn("general", b), None);
    }

    #[test]
    fn waiting_entries_sort_by_deadline() {
        let mut positions = HashMap::new();
        positions.insert("general".to_string(), Vec::new());
        let mut authority = DoctorAuthority::new(300, positions);
        let mut channel = LoopbackChannel::new();
        let urgent = AgentId::new(1, 0, AgentKind::Patient);
        let routine = AgentId::new(2, 0, AgentKind::Patient);

        authority.enqueue("general", routine, DateTime(500));
        authority.enqueue("general", urgent, DateTime(10));
        authority.sync(&mut channel);

        let specialty = authority.specialties.get("general").unwrap();
        assert_eq!(specialty.queue[0].id, urgent);
        assert_eq!(specialty.queue[1].id, routine);
    }
}
