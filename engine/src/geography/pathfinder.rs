//! A* pathfinding over the hospital grid, grounded on
//! `examples/original_source/src/pathfinder.cpp`. Paths are cached by goal
//! and reused across agents heading to the same fixture, since a hospital
//! floor has a handful of destinations (triage, reception, a doctor's
//! office, the exit) shared by hundreds of patients.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use crate::error::{SimError, SimResult};
use crate::geography::coord::DiscreteCoord;
use crate::geography::plan::HospitalPlan;

#[derive(Debug, Default, Clone, Copy)]
pub struct PathfinderStats {
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub nodes_expanded: u64,
}

/// A* open-set entry. `sequence` is a strictly increasing insertion counter
/// used only to break ties between equal `f_score`s deterministically,
/// since `BinaryHeap` does not guarantee FIFO order among equal keys.
struct OpenEntry {
    f_score: i64,
    sequence: u64,
    node: DiscreteCoord,
}

impl PartialEq for OpenEntry {
    fn eq(&self, other: &Self) -> bool {
        self.f_score == other.f_score && self.sequence == other.sequence
    }
}
impl Eq for OpenEntry {}

impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed so `BinaryHeap` (a max-heap) pops the smallest f_score
        // first; ties broken by earliest insertion.
        other.f_score.cmp(&self.f_score).then_with(|| other.sequence.cmp(&self.sequence))
    }
}
impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Caches the full predecessor tree computed for each goal the first time
/// it is requested; `path` then only needs a lookup for the caller's start
/// node unless that node was never reached (e.g. an island the original
/// search never expanded), in which case it recomputes from that start.
#[derive(Default)]
pub struct Pathfinder {
    cache: HashMap<DiscreteCoord, HashMap<DiscreteCoord, DiscreteCoord>>,
    stats: PathfinderStats,
}

impl Pathfinder {
    pub fn new() -> Pathfinder {
        Pathfinder::default()
    }

    pub fn stats(&self) -> PathfinderStats {
        self.stats
    }

    /// The single next cell to step onto when walking from `from` towards
    /// `goal`, i.e. `path(from, goal)[1]` (or `from` itself if already at
    /// the goal). Callers take one step per tick rather than the whole
    /// route so that position updates still go through `Space`'s
    /// per-tick speed clamp.
    pub fn next_step(&mut self, plan: &HospitalPlan, from: DiscreteCoord, goal: DiscreteCoord) -> SimResult<DiscreteCoord> {
        let path = self.path(plan, from, goal)?;
        Ok(*path.get(1).unwrap_or(&from))
    }

    pub fn path(&mut self, plan: &HospitalPlan, from: DiscreteCoord, goal: DiscreteCoord) -> SimResult<Vec<DiscreteCoord>> {
        if from == goal {
            return Ok(vec![from]);
        }

        if let Some(came_from) = self.cache.get(&goal) {
            if came_from.contains_key(&from) || from == goal {
                self.stats.cache_hits += 1;
                return Ok(reconstruct(came_from, from, goal));
            }
        }

        self.stats.cache_misses += 1;
        let came_from = self.search(plan, from, goal)?;
        let path = reconstruct(&came_from, from, goal);
        self.cache.insert(goal, came_from);
        Ok(path)
    }

    fn search(
        &mut self,
        plan: &HospitalPlan,
        start: DiscreteCoord,
        goal: DiscreteCoord,
    ) -> SimResult<HashMap<DiscreteCoord, DiscreteCoord>> {
        let mut open = BinaryHeap::new();
        let mut sequence = 0u64;
        let mut g_score: HashMap<DiscreteCoord, i64> = HashMap::new();
        let mut came_from: HashMap<DiscreteCoord, DiscreteCoord> = HashMap::new();
        let mut closed: HashMap<DiscreteCoord, bool> = HashMap::new();

        g_score.insert(start, 0);
        open.push(OpenEntry { f_score: start.manhattan_distance(goal), sequence, node: start });

        while let Some(OpenEntry { node, .. }) = open.pop() {
            if *closed.get(&node).unwrap_or(&false) {
                continue;
            }
            closed.insert(node, true);
            self.stats.nodes_expanded += 1;

            if node == goal {
                return Ok(came_from);
            }

            let current_g = *g_score.get(&node).unwrap_or(&i64::MAX);
            for neighbor in node.neighbors4() {
                let walkable = neighbor == goal || plan.is_walkable(neighbor);
                if !walkable {
                    continue;
                }
                let tentative_g = current_g + 1;
                if tentative_g < *g_score.get(&neighbor).unwrap_or(&i64::MAX) {
                    g_score.insert(neighbor, tentative_g);
                    came_from.insert(neighbor, node);
                    sequence += 1;
                    open.push(OpenEntry {
                        f_score: tentative_g + neighbor.manhattan_distance(goal),
                        sequence,
                        node: neighbor,
                    });
                }
            }
        }

        Err(SimError::NoPath { from: start, goal })
    }
}

fn reconstruct(came_from: &HashMap<DiscreteCoord, DiscreteCoord>, from: DiscreteCoord, goal: DiscreteCoord) -> Vec<DiscreteCoord> {
    let mut path = vec![goal];
    let mut current = goal;
    while current != from {
        match came_from.get(&current) {
            Some(prev) => {
                current = *prev;
                path.push(current);
            }
            None => break,
        }
    }
    path.reverse();
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geography::plan::BuildingJson;

    fn open_plan() -> HospitalPlan {
        let json: BuildingJson = serde_json::from_str(
            r#"{
                "width": 5, "height": 5,
                "walls": [], "chairs": [],
                "entry": {"x": 0, "y": 0}, "exit": {"x": 4, "y": 4},
                "triages": [], "receptionists": [], "doctors": [],
                "icu": {"entry_location": {"x": 0, "y": 4}, "exit_location": {"x": 4, "y": 0}}
            }"#,
        )
        .unwrap();
        HospitalPlan::from_json(&json).unwrap()
    }

    #[test]
    fn finds_shortest_path_length() {
        let plan = open_plan();
        let mut finder = Pathfinder::new();
        let path = finder.path(&plan, DiscreteCoord::new(0, 0), DiscreteCoord::new(3, 3)).unwrap();
        assert_eq!(path.first().unwrap(), &DiscreteCoord::new(0, 0));
        assert_eq!(path.last().unwrap(), &DiscreteCoord::new(3, 3));
        assert_eq!(path.len() - 1, 6);
    }

    #[test]
    fn repeated_goal_uses_cache() {
        let plan = open_plan();
        let mut finder = Pathfinder::new();
        finder.path(&plan, DiscreteCoord::new(0, 0), DiscreteCoord::new(3, 3)).unwrap();
        finder.path(&plan, DiscreteCoord::new(1, 1), DiscreteCoord::new(3, 3)).unwrap();
        let stats = finder.stats();
        assert_eq!(stats.cache_misses, 1);
        assert_eq!(stats.cache_hits, 1);
    }

    #[test]
    fn same_start_and_goal_is_trivial_path() {
        let plan = open_plan();
        let mut finder = Pathfinder::new();
        let path = finder.path(&plan, DiscreteCoord::new(2, 2), DiscreteCoord::new(2, 2)).unwrap();
        assert_eq!(path, vec![DiscreteCoord::new(2, 2)]);
    }

    #[test]
    fn next_step_is_the_first_hop_not_the_whole_route() {
        let plan = open_plan();
        let mut finder = Pathfinder::new();
        let step = finder.next_step(&plan, DiscreteCoord::new(0, 0), DiscreteCoord::new(3, 3)).unwrap();
        assert_ne!(step, DiscreteCoord::new(3, 3));
        assert_eq!(step.manhattan_distance(DiscreteCoord::new(0, 0)), 1);
    }

    #[test]
    fn next_step_at_goal_is_a_no_op() {
        let plan = open_plan();
        let mut finder = Pathfinder::new();
        let step = finder.next_step(&plan, DiscreteCoord::new(2, 2), DiscreteCoord::new(2, 2)).unwrap();
        assert_eq!(step, DiscreteCoord::new(2, 2));
    }

    #[test]
    fn walled_off_goal_is_an_error() {
        let json: BuildingJson = serde_json::from_str(
            r#"{
                "width": 3, "height": 3,
                "walls": [{"x":1,"y":0},{"x":1,"y":1},{"x":1,"y":2}],
                "chairs": [],
                "entry": {"x": 0, "y": 0}, "exit": {"x": 2, "y": 2},
                "triages": [], "receptionists": [], "doctors": [],
                "icu": {"entry_location": {"x": 0, "y": 1}, "exit_location": {"x": 0, "y": 2}}
            }"#,
        )
        .unwrap();
        let plan = HospitalPlan::from_json(&json).unwrap();
        let mut finder = Pathfinder::new();
        let result = finder.path(&plan, DiscreteCoord::new(0, 0), DiscreteCoord::new(2, 0));
        assert!(result.is_err());
    }
}
