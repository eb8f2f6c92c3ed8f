//! Agent positions and neighborhood queries. Grounded on
//! the region-keyed migration batching in
//! `orchestrator/src/travel_plan.rs`, generalized here from "commuters
//! between regions" to "any agent crossing a spatial partition boundary".

use std::collections::HashMap;

use crate::agents::id::AgentId;
use crate::geography::coord::{ContinuousCoord, DiscreteCoord};
use crate::migration::MigrationTransport;

#[derive(Copy, Clone, Debug)]
pub struct AgentRef {
    pub id: AgentId,
    pub discrete: DiscreteCoord,
    pub continuous: ContinuousCoord,
}

/// An axis-aligned rectangle of grid cells owned by this process (spec
/// §4.3's "ownership transfer across process boundaries").
#[derive(Copy, Clone, Debug)]
pub struct Region {
    pub min: DiscreteCoord,
    pub max: DiscreteCoord,
}

impl Region {
    pub fn contains(&self, c: DiscreteCoord) -> bool {
        c.x >= self.min.x && c.x <= self.max.x && c.y >= self.min.y && c.y <= self.max.y
    }
}

struct Position {
    discrete: DiscreteCoord,
    continuous: ContinuousCoord,
}

/// Per-process agent positions, keyed by stable `AgentId`.
pub struct Space {
    region: Region,
    positions: HashMap<AgentId, Position>,
}

impl Space {
    pub fn new(region: Region) -> Space {
        Space { region, positions: HashMap::new() }
    }

    pub fn region(&self) -> Region {
        self.region
    }

    pub fn insert(&mut self, id: AgentId, discrete: DiscreteCoord) {
        self.positions.insert(id, Position { discrete, continuous: discrete.to_continuous() });
    }

    pub fn remove(&mut self, id: AgentId) {
        self.positions.remove(&id);
    }

    pub fn contains(&self, id: AgentId) -> bool {
        self.positions.contains_key(&id)
    }

    pub fn get_discrete_location(&self, id: AgentId) -> Option<DiscreteCoord> {
        self.positions.get(&id).map(|p| p.discrete)
    }

    pub fn get_continuous_location(&self, id: AgentId) -> Option<ContinuousCoord> {
        self.positions.get(&id).map(|p| p.continuous)
    }

    pub fn agents_around(&self, center: ContinuousCoord, radius: f64) -> Vec<AgentRef> {
        self.positions
            .iter()
            .filter(|(_, p)| p.continuous.distance(center) <= radius)
            .map(|(id, p)| AgentRef { id: *id, discrete: p.discrete, continuous: p.continuous })
            .collect()
    }

    pub fn agents_in_cell(&self, cell: DiscreteCoord) -> Vec<AgentRef> {
        self.positions
            .iter()
            .filter(|(_, p)| p.discrete == cell)
            .map(|(id, p)| AgentRef { id: *id, discrete: p.discrete, continuous: p.continuous })
            .collect()
    }

    pub fn move_to(&mut self, id: AgentId, point: ContinuousCoord) {
        if let Some(position) = self.positions.get_mut(&id) {
            position.continuous = point;
            position.discrete = point.to_discrete();
        }
    }

    /// Moves the agent up to `speed` units towards the center of `target`,
    /// clamped to not overshoot, and returns the new position.
    pub fn move_towards(&mut self, id: AgentId, target: DiscreteCoord, speed: f64) -> Option<ContinuousCoord> {
        let current = self.positions.get(&id)?.continuous;
        let next = current.step_towards(target.to_continuous(), speed);
        self.move_to(id, next);
        Some(next)
    }

    /// Partitions agents whose continuous position left `self.region` and
    /// hands them to `transport` for delivery to their new owning rank.
    /// Only the scheduler calls this, inside the synchronization barrier.
    pub fn balance(&mut self, transport: &mut dyn MigrationTransport) {
        let departing: Vec<AgentId> = self
            .positions
            .iter()
            .filter(|(_, p)| !self.region.contains(p.discrete))
            .map(|(id, _)| *id)
            .collect();

        for id in departing {
            if let Some(position) = self.positions.remove(&id) {
                transport.send(id, position.discrete, position.continuous);
            }
        }

        for (id, discrete, continuous) in transport.receive() {
            self.positions.insert(id, Position { discrete, continuous });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::id::AgentKind;
    use crate::migration::InMemoryMigrationTransport;

    fn region() -> Region {
        Region { min: DiscreteCoord::new(0, 0), max: DiscreteCoord::new(4, 4) }
    }

    #[test]
    fn agents_around_uses_euclidean_distance() {
        let mut space = Space::new(region());
        let id = AgentId::new(1, 0, AgentKind::Patient);
        space.insert(id, DiscreteCoord::new(1, 1));
        let nearby = space.agents_around(ContinuousCoord::new(1.5, 1.5), 1.0);
        assert_eq!(nearby.len(), 1);
        let far = space.agents_around(ContinuousCoord::new(10.0, 10.0), 1.0);
        assert!(far.is_empty());
    }

    #[test]
    fn move_towards_updates_both_coordinate_systems() {
        let mut space = Space::new(region());
        let id = AgentId::new(1, 0, AgentKind::Patient);
        space.insert(id, DiscreteCoord::new(0, 0));
        space.move_towards(id, DiscreteCoord::new(3, 0), 1.0);
        let continuous = space.get_continuous_location(id).unwrap();
        assert!((continuous.x - 1.5).abs() < 1e-9);
    }

    #[test]
    fn balance_moves_out_of_region_agents_through_transport() {
        let mut space = Space::new(region());
        let id = AgentId::new(1, 0, AgentKind::Patient);
        space.insert(id, DiscreteCoord::new(0, 0));
        space.move_to(id, ContinuousCoord::new(10.0, 10.0));
        let mut transport = InMemoryMigrationTransport::new();
        space.balance(&mut transport);
        assert!(!space.contains(id));
        assert_eq!(transport.sent.len(), 1);
    }
}
