//! Chair manager, grounded line-for-line on
//! `examples/original_source/src/chair_manager.cpp`'s
//! `chair_request_msg`/`chair_release_msg`/`chair_response_msg` protocol.
//! Proxy and authority are two separate implementations of one trait,
//! never a single role-flagged type.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::agents::id::AgentId;
use crate::error::DoubleResponseError;
use crate::geography::coord::ContinuousCoord;
use crate::managers::transport::{ManagerChannel, ManagerTags};

#[derive(Serialize, Deserialize)]
struct ChairRequest {
    id: AgentId,
}

#[derive(Serialize, Deserialize)]
struct ChairRelease {
    coord: ContinuousCoord,
}

#[derive(Serialize, Deserialize, Clone)]
struct ChairResponse {
    id: AgentId,
    location: Option<ContinuousCoord>,
}

/// Operations every process needs, whether it hosts the authority or a
/// proxy.
pub trait ChairManager {
    fn request_chair(&mut self, id: AgentId);
    fn release_chair(&mut self, coord: ContinuousCoord);
    /// Applies this tick's buffered operations across the barrier and
    /// makes new responses available to `get_response`.
    fn sync(&mut self, channel: &mut dyn ManagerChannel);
    fn get_response(&mut self, id: AgentId) -> Result<Option<Option<ContinuousCoord>>, DoubleResponseError>;
}

struct Seat {
    location: ContinuousCoord,
    in_use: bool,
}

/// The authoritative owner of the chair pool.
pub struct ChairAuthority {
    tags: ManagerTags,
    pool: Vec<Seat>,
    pending_requests: Vec<AgentId>,
    pending_releases: Vec<ContinuousCoord>,
    responses: HashMap<AgentId, Vec<Option<ContinuousCoord>>>,
}

impl ChairAuthority {
    pub fn new(base_tag: i32, seats: Vec<ContinuousCoord>) -> ChairAuthority {
        ChairAuthority {
            tags: ManagerTags::from_base(base_tag),
            pool: seats.into_iter().map(|location| Seat { location, in_use: false }).collect(),
            pending_requests: Vec::new(),
            pending_releases: Vec::new(),
            responses: HashMap::new(),
        }
    }

    fn apply_releases(&mut self) {
        for coord in self.pending_releases.drain(..) {
            if let Some(seat) = self.pool.iter_mut().find(|s| s.location == coord) {
                seat.in_use = false;
            }
        }
    }

    fn apply_requests(&mut self) -> Vec<ChairResponse> {
        let mut responses = Vec::with_capacity(self.pending_requests.len());
        for id in self.pending_requests.drain(..) {
            let seat = self.pool.iter_mut().find(|s| !s.in_use);
            let location = match seat {
                Some(seat) => {
                    seat.in_use = true;
                    Some(seat.location)
                }
                None => None,
            };
            responses.push(ChairResponse { id, location });
        }
        responses
    }
}

impl ChairManager for ChairAuthority {
    fn request_chair(&mut self, id: AgentId) {
        self.pending_requests.push(id);
    }

    fn release_chair(&mut self, coord: ContinuousCoord) {
        self.pending_releases.push(coord);
    }

    fn sync(&mut self, channel: &mut dyn ManagerChannel) {
        let remote_requests: Vec<(i32, Vec<AgentId>)> = channel
            .receive_from_proxies::<Vec<AgentId>>(self.tags.request)
            .into_iter()
            .collect();
        let remote_releases: Vec<(i32, Vec<ContinuousCoord>)> = channel
            .receive_from_proxies::<Vec<ContinuousCoord>>(self.tags.release)
            .into_iter()
            .collect();

        for (_, coords) in remote_releases {
            self.pending_releases.extend(coords);
        }
        self.apply_releases();

        let mut by_rank: HashMap<i32, Vec<AgentId>> = HashMap::new();
        for (rank, ids) in remote_requests {
            by_rank.entry(rank).or_default().extend(ids);
        }
        let local_requests = std::mem::take(&mut self.pending_requests);
        by_rank.entry(channel.my_rank()).or_default().extend(local_requests);

        for (rank, ids) in by_rank {
            self.pending_requests = ids;
            let responses = self.apply_requests();
            for response in responses {
                if rank == channel.my_rank() {
                    self.responses.entry(response.id).or_default().push(response.location);
                } else {
                    channel.send_to_proxy(rank, self.tags.response, &response);
                }
            }
        }
    }

    fn get_response(&mut self, id: AgentId) -> Result<Option<Option<ContinuousCoord>>, DoubleResponseError> {
        match self.responses.get_mut(&id) {
            None => Ok(None),
            Some(queue) if queue.len() > 1 => Err(DoubleResponseError { agent_id: id }),
            Some(queue) => Ok(queue.pop()),
        }
    }
}

/// A non-authority process's view: buffers requests/releases locally and
/// exchanges them with the authority once per tick.
pub struct ChairProxy {
    tags: ManagerTags,
    pending_requests: Vec<AgentId>,
    pending_releases: Vec<ContinuousCoord>,
    responses: HashMap<AgentId, Option<ContinuousCoord>>,
}

impl ChairProxy {
    pub fn new(base_tag: i32) -> ChairProxy {
        ChairProxy {
            tags: ManagerTags::from_base(base_tag),
            pending_requests: Vec::new(),
            pending_releases: Vec::new(),
            responses: HashMap::new(),
        }
    }
}

impl ChairManager for ChairProxy {
    fn request_chair(&mut self, id: AgentId) {
        self.pending_requests.push(id);
    }

    fn release_chair(&mut self, coord: ContinuousCoord) {
        self.pending_releases.push(coord);
    }

    fn sync(&mut self, channel: &mut dyn ManagerChannel) {
        let requests = std::mem::take(&mut self.pending_requests);
        let releases = std::mem::take(&mut self.pending_releases);
        channel.send_to_authority(self.tags.request, &requests);
        channel.send_to_authority(self.tags.release, &releases);

        for id in requests {
            let response: ChairResponse = channel.receive_from_authority(self.tags.response);
            self.responses.insert(response.id.migrated_to(id.current_rank), response.location);
        }
    }

    fn get_response(&mut self, id: AgentId) -> Result<Option<Option<ContinuousCoord>>, DoubleResponseError> {
        Ok(self.responses.remove(&id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::id::AgentKind;
    use crate::managers::transport::LoopbackChannel;

    #[test]
    fn first_request_gets_a_free_seat_second_is_rejected_when_saturated() {
        let mut authority = ChairAuthority::new(100, vec![ContinuousCoord::new(0.5, 0.5)]);
        let mut channel = LoopbackChannel::new();
        let a = AgentId::new(1, 0, AgentKind::Patient);
        let b = AgentId::new(2, 0, AgentKind::Patient);
        authority.request_chair(a);
        authority.request_chair(b);
        authority.sync(&mut channel);
        assert_eq!(authority.get_response(a).unwrap(), Some(Some(ContinuousCoord::new(0.5, 0.5))));
        assert_eq!(authority.get_response(b).unwrap(), Some(None));
    }

    #[test]
    fn release_before_request_frees_seat_same_tick() {
        let mut authority = ChairAuthority::new(100, vec![ContinuousCoord::new(0.5, 0.5)]);
        let mut channel = LoopbackChannel::new();
        let a = AgentId::new(1, 0, AgentKind::Patient);
        let b = AgentId::new(2, 0, AgentKind::Patient);
        authority.request_chair(a);
        authority.sync(&mut channel);
        authority.get_response(a).unwrap();

        authority.release_chair(ContinuousCoord::new(0.5, 0.5));
        authority.request_chair(b);
        authority.sync(&mut channel);
        assert_eq!(authority.get_response(b).unwrap(), Some(Some(ContinuousCoord::new(0.5, 0.5))));
    }
}
