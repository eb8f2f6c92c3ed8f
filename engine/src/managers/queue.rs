//! Generic FIFO queue manager shared by reception and triage, grounded on
//! `examples/original_source/src/queue_manager/real_queue_manager.cpp`'s
//! box-fronted deque.

use std::collections::{HashMap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::agents::id::AgentId;
use crate::geography::coord::ContinuousCoord;
use crate::managers::transport::{ManagerChannel, ManagerTags};

#[derive(Clone, Serialize, Deserialize)]
pub struct FrontEntry {
    pub box_location: ContinuousCoord,
    pub id: AgentId,
}

pub trait QueueManager {
    fn enqueue(&mut self, id: AgentId);
    fn dequeue(&mut self, id: AgentId);
    fn sync(&mut self, channel: &mut dyn ManagerChannel);
    /// The box assigned to `id` in the most recently published front, if any.
    fn is_my_turn(&self, id: AgentId) -> Option<ContinuousCoord>;
}

/// The authoritative queue + its service boxes (one authority per queue
/// kind: reception has one, triage has another).
pub struct QueueAuthority {
    tags: ManagerTags,
    boxes: Vec<ContinuousCoord>,
    queue: VecDeque<AgentId>,
    pending_enqueues: Vec<AgentId>,
    pending_dequeues: Vec<AgentId>,
    front: Vec<FrontEntry>,
}

impl QueueAuthority {
    pub fn new(base_tag: i32, boxes: Vec<ContinuousCoord>) -> QueueAuthority {
        QueueAuthority {
            tags: ManagerTags::from_base(base_tag),
            boxes,
            queue: VecDeque::new(),
            pending_enqueues: Vec::new(),
            pending_dequeues: Vec::new(),
            front: Vec::new(),
        }
    }

    fn publish_front(&mut self) {
        self.front = self
            .boxes
            .iter()
            .zip(self.queue.iter())
            .map(|(box_location, id)| FrontEntry { box_location: *box_location, id: *id })
            .collect();
    }
}

impl QueueManager for QueueAuthority {
    fn enqueue(&mut self, id: AgentId) {
        self.pending_enqueues.push(id);
    }

    fn dequeue(&mut self, id: AgentId) {
        self.pending_dequeues.push(id);
    }

    fn sync(&mut self, channel: &mut dyn ManagerChannel) {
        let mut enqueues = std::mem::take(&mut self.pending_enqueues);
        let mut dequeues = std::mem::take(&mut self.pending_dequeues);
        for (_, ids) in channel.receive_from_proxies::<Vec<AgentId>>(self.tags.request) {
            enqueues.extend(ids);
        }
        for (_, ids) in channel.receive_from_proxies::<Vec<AgentId>>(self.tags.release) {
            dequeues.extend(ids);
        }

        for id in dequeues {
            self.queue.retain(|queued| *queued != id);
        }
        for id in enqueues {
            self.queue.push_back(id);
        }

        self.publish_front();
        let front = self.front.clone();
        channel.broadcast_from_authority(self.tags.response, Some(front));
    }

    fn is_my_turn(&self, id: AgentId) -> Option<ContinuousCoord> {
        self.front.iter().find(|entry| entry.id == id).map(|entry| entry.box_location)
    }
}

pub struct QueueProxy {
    tags: ManagerTags,
    pending_enqueues: Vec<AgentId>,
    pending_dequeues: Vec<AgentId>,
    front: Vec<FrontEntry>,
}

impl QueueProxy {
    pub fn new(base_tag: i32) -> QueueProxy {
        QueueProxy { tags: ManagerTags::from_base(base_tag), pending_enqueues: Vec::new(), pending_dequeues: Vec::new(), front: Vec::new() }
    }
}

impl QueueManager for QueueProxy {
    fn enqueue(&mut self, id: AgentId) {
        self.pending_enqueues.push(id);
    }

    fn dequeue(&mut self, id: AgentId) {
        self.pending_dequeues.push(id);
    }

    fn sync(&mut self, channel: &mut dyn ManagerChannel) {
        let enqueues = std::mem::take(&mut self.pending_enqueues);
        let dequeues = std::mem::take(&mut self.pending_dequeues);
        channel.send_to_authority(self.tags.request, &enqueues);
        channel.send_to_authority(self.tags.release, &dequeues);
        self.front = channel.broadcast_from_authority::<Vec<FrontEntry>>(self.tags.response, None);
    }

    fn is_my_turn(&self, id: AgentId) -> Option<ContinuousCoord> {
        self.front.iter().find(|entry| entry.id == id).map(|entry| entry.box_location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::id::AgentKind;
    use crate::managers::transport::LoopbackChannel;

    #[test]
    fn front_maps_boxes_to_queue_head() {
        let mut authority = QueueAuthority::new(200, vec![ContinuousCoord::new(0.5, 0.5), ContinuousCoord::new(1.5, 0.5)]);
        let mut channel = LoopbackChannel::new();
        let a = AgentId::new(1, 0, AgentKind::Patient);
        let b = AgentId::new(2, 0, AgentKind::Patient);
        let c = AgentId::new(3, 0, AgentKind::Patient);
        authority.enqueue(a);
        authority.enqueue(b);
        authority.enqueue(c);
        authority.sync(&mut channel);
        assert_eq!(authority.is_my_turn(a), Some(ContinuousCoord::new(0.5, 0.5)));
        assert_eq!(authority.is_my_turn(b), Some(ContinuousCoord::new(1.5, 0.5)));
        assert_eq!(authority.is_my_turn(c), None);
    }

    #[test]
    fn dequeue_advances_the_front() {
        let mut authority = QueueAuthority::new(200, vec![ContinuousCoord::new(0.5, 0.5)]);
        let mut channel = LoopbackChannel::new();
        let a = AgentId::new(1, 0, AgentKind::Patient);
        let b = AgentId::new(2, 0, AgentKind::Patient);
        authority.enqueue(a);
        authority.enqueue(b);
        authority.sync(&mut channel);
        authority.dequeue(a);
        authority.sync(&mut channel);
        assert_eq!(authority.is_my_turn(b), Some(ContinuousCoord::new(0.5, 0.5)));
    }
}
