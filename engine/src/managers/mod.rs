pub mod chair;
pub mod doctors;
pub mod icu;
pub mod queue;
pub mod transport;

pub use chair::{ChairAuthority, ChairManager, ChairProxy};
pub use doctors::{DoctorAuthority, DoctorManager, DoctorProxy};
pub use icu::{IcuAuthority, IcuManager, IcuProxy};
pub use queue::{QueueAuthority, QueueManager, QueueProxy};
