//! Pre-launch validation: confirms the configured process grid and
//! manager-authority ranks are consistent with the hospital plan and the
//! MPI world size before the scheduler starts.

pub mod topology;

pub use topology::{GridCell, Topology};
