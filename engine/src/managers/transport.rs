//! The tagged-message channel shared by every resource manager:
//! `tag+0` carries requests/enqueues, `tag+1` carries
//! releases/dequeues, `tag+2` carries the authority's responses or
//! published state. Grounded on
//! `examples/original_source/src/chair_manager.cpp`'s three-message
//! protocol, generalized across all five managers so the tag arithmetic
//! lives in one place.

use mpi::topology::Communicator;
use serde::{de::DeserializeOwned, Serialize};

/// One manager's three reserved tags, derived from a manager-specific base
/// tag.
#[derive(Copy, Clone, Debug)]
pub struct ManagerTags {
    pub request: i32,
    pub release: i32,
    pub response: i32,
}

impl ManagerTags {
    pub fn from_base(base_tag: i32) -> ManagerTags {
        ManagerTags { request: base_tag, release: base_tag + 1, response: base_tag + 2 }
    }
}

/// Point-to-point and collective primitives a manager proxy/authority pair
/// needs, abstracted so managers can be exercised without starting MPI.
pub trait ManagerChannel {
    fn authority_rank(&self) -> i32;
    fn my_rank(&self) -> i32;
    fn world_size(&self) -> i32;

    fn send_to_authority<T: Serialize>(&mut self, tag: i32, payload: &T);
    fn receive_from_proxies<T: DeserializeOwned>(&mut self, tag: i32) -> Vec<(i32, T)>;
    fn send_to_proxy<T: Serialize>(&mut self, destination: i32, tag: i32, payload: &T);
    fn receive_from_authority<T: DeserializeOwned>(&mut self, tag: i32) -> T;
    fn broadcast_from_authority<T: Serialize + DeserializeOwned>(&mut self, tag: i32, payload: Option<T>) -> T;
}

/// In-process loopback channel for single-rank runs and tests: the
/// "authority" and every "proxy" are the same process, so sends are
/// visible to the matching receive within the same barrier phase.
#[derive(Default)]
pub struct LoopbackChannel {
    outgoing: Vec<(i32, Vec<u8>)>,
}

impl LoopbackChannel {
    pub fn new() -> LoopbackChannel {
        LoopbackChannel::default()
    }
}

impl ManagerChannel for LoopbackChannel {
    fn authority_rank(&self) -> i32 {
        0
    }

    fn my_rank(&self) -> i32 {
        0
    }

    fn world_size(&self) -> i32 {
        1
    }

    fn send_to_authority<T: Serialize>(&mut self, tag: i32, payload: &T) {
        self.outgoing.push((tag, serde_json::to_vec(payload).expect("manager payload serializes")));
    }

    fn receive_from_proxies<T: DeserializeOwned>(&mut self, tag: i32) -> Vec<(i32, T)> {
        let mut received = Vec::new();
        self.outgoing.retain(|(t, bytes)| {
            if *t == tag {
                received.push((0, serde_json::from_slice(bytes).expect("manager payload deserializes")));
                false
            } else {
                true
            }
        });
        received
    }

    fn send_to_proxy<T: Serialize>(&mut self, _destination: i32, tag: i32, payload: &T) {
        self.outgoing.push((tag, serde_json::to_vec(payload).expect("manager payload serializes")));
    }

    fn receive_from_authority<T: DeserializeOwned>(&mut self, tag: i32) -> T {
        let index = self.outgoing.iter().position(|(t, _)| *t == tag).expect("authority response pending");
        let (_, bytes) = self.outgoing.remove(index);
        serde_json::from_slice(&bytes).expect("manager payload deserializes")
    }

    fn broadcast_from_authority<T: Serialize + DeserializeOwned>(&mut self, _tag: i32, payload: Option<T>) -> T {
        payload.expect("loopback broadcast always originates locally")
    }
}

/// MPI-backed channel: every proxy sends to the single authority rank and
/// back, one barrier-scoped exchange per tick.
pub struct MpiManagerChannel<'a, C: Communicator> {
    comm: &'a C,
    authority_rank: i32,
}

impl<'a, C: Communicator> MpiManagerChannel<'a, C> {
    pub fn new(comm: &'a C, authority_rank: i32) -> MpiManagerChannel<'a, C> {
        MpiManagerChannel { comm, authority_rank }
    }
}

impl<'a, C: Communicator> ManagerChannel for MpiManagerChannel<'a, C> {
    fn authority_rank(&self) -> i32 {
        self.authority_rank
    }

    fn my_rank(&self) -> i32 {
        self.comm.rank()
    }

    fn world_size(&self) -> i32 {
        self.comm.size()
    }

    fn send_to_authority<T: Serialize>(&mut self, tag: i32, payload: &T) {
        let bytes = serde_json::to_vec(payload).expect("manager payload serializes");
        self.comm.process_at_rank(self.authority_rank).send_with_tag(&bytes[..], tag);
    }

    fn receive_from_proxies<T: DeserializeOwned>(&mut self, tag: i32) -> Vec<(i32, T)> {
        let mut received = Vec::new();
        for source in 0..self.comm.size() {
            if source == self.authority_rank {
                continue;
            }
            let (payload, _status) = self.comm.process_at_rank(source).receive_vec_with_tag::<u8>(tag);
            received.push((source, serde_json::from_slice(&payload).expect("manager payload deserializes")));
        }
        received
    }

    fn send_to_proxy<T: Serialize>(&mut self, destination: i32, tag: i32, payload: &T) {
        let bytes = serde_json::to_vec(payload).expect("manager payload serializes");
        self.comm.process_at_rank(destination).send_with_tag(&bytes[..], tag);
    }

    fn receive_from_authority<T: DeserializeOwned>(&mut self, tag: i32) -> T {
        let (payload, _status) = self.comm.process_at_rank(self.authority_rank).receive_vec_with_tag::<u8>(tag);
        serde_json::from_slice(&payload).expect("manager payload deserializes")
    }

    fn broadcast_from_authority<T: Serialize + DeserializeOwned>(&mut self, tag: i32, payload: Option<T>) -> T {
        if self.my_rank() == self.authority_rank {
            let payload = payload.expect("authority broadcasts with a value");
            let bytes = serde_json::to_vec(&payload).expect("manager payload serializes");
            for destination in 0..self.world_size() {
                if destination != self.authority_rank {
                    self.comm.process_at_rank(destination).send_with_tag(&bytes[..], tag);
                }
            }
            payload
        } else {
            self.receive_from_authority(tag)
        }
    }
}
