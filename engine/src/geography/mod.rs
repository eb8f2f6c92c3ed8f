pub mod coord;
pub mod pathfinder;
pub mod plan;
pub mod space;

pub use coord::{ContinuousCoord, DiscreteCoord};
pub use pathfinder::Pathfinder;
pub use plan::HospitalPlan;
pub use space::Space;
