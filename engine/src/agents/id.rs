//! Agent identity. An `AgentId` is stable across the
//! migrations a mobile agent makes between processes: `current_rank`
//! changes every time the agent crosses a partition boundary, but
//! `local_id`/`home_rank`/`kind` never do, so two copies of the same agent
//! compare equal regardless of which rank currently hosts them.

use serde::{Deserialize, Serialize};

/// The three agent kinds: `FixedPerson` covers both
/// receptionists and doctors, `Object` covers both chairs and ICU beds.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgentKind {
    Patient,
    FixedPerson,
    Object,
}

impl AgentKind {
    pub fn code(self) -> u8 {
        match self {
            AgentKind::Patient => 0,
            AgentKind::FixedPerson => 1,
            AgentKind::Object => 2,
        }
    }

    pub fn from_code(code: u8) -> Option<AgentKind> {
        match code {
            0 => Some(AgentKind::Patient),
            1 => Some(AgentKind::FixedPerson),
            2 => Some(AgentKind::Object),
            _ => None,
        }
    }
}

#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
pub struct AgentId {
    pub local_id: u32,
    pub home_rank: i32,
    pub kind: AgentKind,
    pub current_rank: i32,
}

impl AgentId {
    pub fn new(local_id: u32, home_rank: i32, kind: AgentKind) -> AgentId {
        AgentId { local_id, home_rank, kind, current_rank: home_rank }
    }

    pub fn migrated_to(self, rank: i32) -> AgentId {
        AgentId { current_rank: rank, ..self }
    }
}

impl PartialEq for AgentId {
    fn eq(&self, other: &Self) -> bool {
        self.local_id == other.local_id && self.home_rank == other.home_rank && self.kind.code() == other.kind.code()
    }
}
impl Eq for AgentId {}

impl std::hash::Hash for AgentId {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.local_id.hash(state);
        self.home_rank.hash(state);
        self.kind.code().hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_ignores_current_rank() {
        let a = AgentId::new(7, 2, AgentKind::Patient);
        let b = a.migrated_to(5);
        assert_eq!(a, b);
    }

    #[test]
    fn kind_code_round_trips() {
        for kind in [AgentKind::Patient, AgentKind::FixedPerson, AgentKind::Object] {
            assert_eq!(AgentKind::from_code(kind.code()).unwrap().code(), kind.code());
        }
    }
}
