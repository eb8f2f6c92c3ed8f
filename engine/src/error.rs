//! Fatal error taxonomy. "No chair"/"no bed"/"timed out" are
//! ordinary `Option::None` results handled by the FSM, never an `Err`.

use thiserror::Error;

/// Errors that abort the whole process group: configuration invariant
/// violations, malformed input, schema mismatches. None of these are
/// retried; the caller prints the message and exits non-zero.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("probability {value} for {field} is outside [0, 1]")]
    ProbabilityOutOfRange { field: &'static str, value: f64 },

    #[error("distribution {name} sums to {sum}, expected within [0.99, 1.01]")]
    DistributionDoesNotSum { name: &'static str, sum: f64 },

    #[error("unknown tile code '{0}' in hospital plan")]
    UnknownTileCode(String),

    #[error("hospital plan failed to load: {0}")]
    PlanLoadFailure(String),

    #[error("{0}")]
    SchemaMismatch(String),

    #[error("unknown agent kind {0} during deserialization")]
    UnknownAgentKind(u8),

    #[error("ICU insert with no free bed")]
    IcuNoFreeBed,

    #[error("ICU remove of patient not present in the bed pool")]
    IcuPatientNotPresent,

    #[error("missing required property '{0}'")]
    MissingProperty(&'static str),

    #[error("property '{key}' has invalid value '{value}'")]
    InvalidProperty { key: &'static str, value: String },

    #[error("no path between {from:?} and {goal:?}")]
    NoPath {
        from: crate::geography::coord::DiscreteCoord,
        goal: crate::geography::coord::DiscreteCoord,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

/// Process-local bug, not a configuration problem: a manager observed two
/// outstanding responses for the same agent id. Terminates this process
/// only, since it indicates a double-request bug in the FSM
/// rather than bad input shared by every rank.
#[derive(Debug, Error)]
#[error("manager invariant violated: two outstanding responses for {agent_id:?}")]
pub struct DoubleResponseError {
    pub agent_id: crate::agents::id::AgentId,
}

pub type SimResult<T> = Result<T, SimError>;
