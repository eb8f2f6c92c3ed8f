pub mod exit_sink;
pub mod factory;
pub mod id;

pub use exit_sink::{ExitRecord, ExitSink};
pub use factory::{AgentFactory, FixedPerson, Object, Patient};
pub use id::{AgentId, AgentKind};
