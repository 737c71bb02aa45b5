// src/pipeline/event_bus.rs
//
// Decoupled event system. Stages report what happened to a track here
// instead of reaching into each other's state.

use crate::types::{AnomalyEvent, ClassGroup, TrackId, TrackStatus};
use serde::Serialize;
use std::collections::VecDeque;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PipelineEvent {
    TrackCreated {
        track_id: TrackId,
        class_group: ClassGroup,
    },

    TrackExpired {
        track_id: TrackId,
    },

    OwnerAssigned {
        bag_id: TrackId,
        owner_id: TrackId,
        distance_px: f32,
    },

    OwnerLost {
        bag_id: TrackId,
        owner_id: TrackId,
    },

    StatusChanged {
        track_id: TrackId,
        from: TrackStatus,
        to: TrackStatus,
    },

    AnomalyRaised(AnomalyEvent),
}

/// Per-frame event queue. Bounded so a burst of track churn cannot grow it
/// without limit; overflow discards the oldest entries and is counted.
pub struct EventBus {
    queue: VecDeque<PipelineEvent>,
    capacity: usize,
    discarded: u64,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: VecDeque::with_capacity(capacity),
            capacity,
            discarded: 0,
        }
    }

    pub fn publish(&mut self, event: PipelineEvent) {
        if self.queue.len() >= self.capacity {
            if let Some(oldest) = self.queue.pop_front() {
                self.discarded += 1;
                debug!("Event queue at capacity {}, discarding {:?}", self.capacity, oldest);
            }
        }
        self.queue.push_back(event);
    }

    /// Everything published since the last drain, oldest first.
    pub fn drain(&mut self) -> Vec<PipelineEvent> {
        self.queue.drain(..).collect()
    }

    /// Events discarded since the last call.
    pub fn take_discarded(&mut self) -> u64 {
        std::mem::take(&mut self.discarded)
    }
}
