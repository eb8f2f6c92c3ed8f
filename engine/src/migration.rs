//! Agent-migration transport for `Space::balance()`. Cross-process
//! delivery is an injected trait so `Space` stays transport-agnostic and
//! testable without starting MPI, grounded on
//! `orchestrator/src/travel_plan.rs`'s region-keyed batching pattern.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::agents::id::AgentId;
use crate::geography::coord::{ContinuousCoord, DiscreteCoord};

#[derive(Serialize, Deserialize)]
struct MigrationEnvelope {
    id: AgentId,
    discrete: DiscreteCoord,
    continuous: ContinuousCoord,
}

/// A departing agent's payload, serialized once per migration.
pub trait MigrationTransport {
    fn send(&mut self, id: AgentId, discrete: DiscreteCoord, continuous: ContinuousCoord);
    fn receive(&mut self) -> Vec<(AgentId, DiscreteCoord, ContinuousCoord)>;
}

/// Loopback transport for single-process runs and tests: everything sent
/// is immediately available to receive, without a destination rank lookup.
#[derive(Default)]
pub struct InMemoryMigrationTransport {
    pub sent: Vec<(AgentId, DiscreteCoord, ContinuousCoord)>,
    inbox: Vec<(AgentId, DiscreteCoord, ContinuousCoord)>,
}

impl InMemoryMigrationTransport {
    pub fn new() -> InMemoryMigrationTransport {
        InMemoryMigrationTransport::default()
    }

    /// Test/bootstrap hook: deliver an externally produced migration as if
    /// it arrived over the wire.
    pub fn deliver(&mut self, id: AgentId, discrete: DiscreteCoord, continuous: ContinuousCoord) {
        self.inbox.push((id, discrete, continuous));
    }
}

impl MigrationTransport for InMemoryMigrationTransport {
    fn send(&mut self, id: AgentId, discrete: DiscreteCoord, continuous: ContinuousCoord) {
        self.sent.push((id, discrete, continuous));
    }

    fn receive(&mut self) -> Vec<(AgentId, DiscreteCoord, ContinuousCoord)> {
        std::mem::take(&mut self.inbox)
    }
}

/// MPI-backed transport: agents are grouped by destination rank (derived
/// from the grid partition) and exchanged in a single tagged round per
/// synchronization barrier, mirroring the `reception`/`triage` managers'
/// tag scheme rather than opening a new tag per agent.
pub struct MpiMigrationTransport<'a, C: mpi::topology::Communicator> {
    comm: &'a C,
    tag: i32,
    outbox: HashMap<i32, Vec<MigrationEnvelope>>,
}

impl<'a, C: mpi::topology::Communicator> MpiMigrationTransport<'a, C> {
    pub fn new(comm: &'a C, tag: i32) -> MpiMigrationTransport<'a, C> {
        MpiMigrationTransport { comm, tag, outbox: HashMap::new() }
    }
}

impl<'a, C: mpi::topology::Communicator> MigrationTransport for MpiMigrationTransport<'a, C> {
    fn send(&mut self, id: AgentId, discrete: DiscreteCoord, continuous: ContinuousCoord) {
        let rank = id.current_rank;
        self.outbox.entry(rank).or_default().push(MigrationEnvelope { id, discrete, continuous });
    }

    fn receive(&mut self) -> Vec<(AgentId, DiscreteCoord, ContinuousCoord)> {
        use mpi::point_to_point as p2p;
        use mpi::traits::*;

        let size = self.comm.size();
        let rank = self.comm.rank();

        for (&destination, envelopes) in self.outbox.iter() {
            if destination == rank {
                continue;
            }
            let payload = serde_json::to_vec(envelopes).expect("migration envelope serializes");
            self.comm.process_at_rank(destination).send_with_tag(&payload[..], self.tag);
        }

        let mut received = Vec::new();
        if let Some(local) = self.outbox.remove(&rank) {
            for envelope in local {
                received.push((envelope.id, envelope.discrete, envelope.continuous));
            }
        }
        self.outbox.clear();

        for source in 0..size {
            if source == rank {
                continue;
            }
            let (payload, _status) = self.comm.process_at_rank(source).receive_vec_with_tag::<u8>(self.tag);
            let envelopes: Vec<MigrationEnvelope> = serde_json::from_slice(&payload).expect("migration envelope deserializes");
            for envelope in envelopes {
                received.push((envelope.id, envelope.discrete, envelope.continuous));
            }
        }

        received
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::id::AgentKind;

    #[test]
    fn in_memory_transport_round_trips_payload() {
        let mut transport = InMemoryMigrationTransport::new();
        let id = AgentId::new(1, 0, AgentKind::Patient);
        transport.send(id, DiscreteCoord::new(1, 1), ContinuousCoord::new(1.5, 1.5));
        assert!(transport.receive().is_empty());
        transport.deliver(id, DiscreteCoord::new(2, 2), ContinuousCoord::new(2.5, 2.5));
        let received = transport.receive();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].1, DiscreteCoord::new(2, 2));
    }

    #[test]
    fn envelope_serializes_losslessly() {
        let id = AgentId::new(7, 2, AgentKind::Doctor);
        let envelope = MigrationEnvelope { id, discrete: DiscreteCoord::new(3, 4), continuous: ContinuousCoord::new(3.5, 4.5) };
        let bytes = serde_json::to_vec(&envelope).unwrap();
        let round_tripped: MigrationEnvelope = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(round_tripped.discrete, envelope.discrete);
        assert_eq!(round_tripped.continuous, envelope.continuous);
    }
}
