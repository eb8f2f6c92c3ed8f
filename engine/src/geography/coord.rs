//! Discrete/continuous coordinate system, grounded on
//! `examples/original_source/src/coordinates.hpp`'s `coordinates<T>`
//! template -- split here into two concrete types since Rust's generics
//! would otherwise need a `where T: Float` bound smeared across every call
//! site that only ever uses one or the other.

use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DiscreteCoord {
    pub x: i32,
    pub y: i32,
}

impl DiscreteCoord {
    pub fn new(x: i32, y: i32) -> DiscreteCoord {
        DiscreteCoord { x, y }
    }

    pub fn to_continuous(self) -> ContinuousCoord {
        ContinuousCoord { x: self.x as f64 + 0.5, y: self.y as f64 + 0.5 }
    }

    /// The four orthogonal neighbors, in a fixed deterministic order so
    /// that pathfinding tie-breaks are reproducible.
    pub fn neighbors4(self) -> [DiscreteCoord; 4] {
        [
            DiscreteCoord::new(self.x, self.y + 1),
            DiscreteCoord::new(self.x, self.y - 1),
            DiscreteCoord::new(self.x + 1, self.y),
            DiscreteCoord::new(self.x - 1, self.y),
        ]
    }

    pub fn manhattan_distance(self, other: DiscreteCoord) -> i64 {
        (self.x as i64 - other.x as i64).abs() + (self.y as i64 - other.y as i64).abs()
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ContinuousCoord {
    pub x: f64,
    pub y: f64,
}

impl ContinuousCoord {
    pub fn new(x: f64, y: f64) -> ContinuousCoord {
        ContinuousCoord { x, y }
    }

    pub fn to_discrete(self) -> DiscreteCoord {
        DiscreteCoord::new(self.x.floor() as i32, self.y.floor() as i32)
    }

    pub fn distance(self, other: ContinuousCoord) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Move up to `speed` units towards `target`, clamped to not overshoot.
    pub fn step_towards(self, target: ContinuousCoord, speed: f64) -> ContinuousCoord {
        let dx = target.x - self.x;
        let dy = target.y - self.y;
        let distance = (dx * dx + dy * dy).sqrt();
        if distance <= speed || distance == 0.0 {
            return target;
        }
        let ratio = speed / distance;
        ContinuousCoord::new(self.x + dx * ratio, self.y + dy * ratio)
    }
}

// Bitwise float equality is intentional: the FSM's `Arrived` guard (spec
// §4.6) requires exact equality against a destination produced by the same
// `step_towards`/discrete-to-continuous conversion, not an epsilon
// comparison.
impl Eq for ContinuousCoord {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discrete_to_continuous_is_cell_center() {
        let c = DiscreteCoord::new(3, 4).to_continuous();
        assert_eq!(c, ContinuousCoord::new(3.5, 4.5));
    }

    #[test]
    fn continuous_to_discrete_floors() {
        let d = ContinuousCoord::new(3.9, 4.1).to_discrete();
        assert_eq!(d, DiscreteCoord::new(3, 4));
    }

    #[test]
    fn step_towards_clamps_to_not_overshoot() {
        let start = ContinuousCoord::new(0.0, 0.0);
        let target = ContinuousCoord::new(10.0, 0.0);
        let next = start.step_towards(target, 3.0);
        assert!((next.x - 3.0).abs() < 1e-9);
        let arrived = next.step_towards(target, 100.0);
        assert_eq!(arrived, target);
    }

    #[test]
    fn manhattan_distance_is_symmetric() {
        let a = DiscreteCoord::new(0, 0);
        let b = DiscreteCoord::new(3, -4);
        assert_eq!(a.manhattan_distance(b), 7);
        assert_eq!(b.manhattan_distance(a), 7);
    }
}
