// src/analysis/anomaly.rs
//
// Owner-absence state machine for bags.
//
//   New/Owned ──owner absent──▶ Unattended ──elapsed > threshold──▶ Anomaly
//       ▲                            │                                 │
//       └────────owner visible───────┴─────────────────────────────────┘
//
// Only bags whose ownership was established take part: a bag with a live
// owner id, or one that is already mid-episode after its owner track expired.

use super::elapsed_seconds;
use super::track_manager::Track;
use crate::types::{AlertPolicy, AnomalyConfig, AnomalyEvent, TrackId, TrackStatus};
use std::collections::HashMap;
use tracing::{debug, warn};

pub struct AnomalyStateMachine {
    config: AnomalyConfig,
}

impl AnomalyStateMachine {
    pub fn new(config: AnomalyConfig) -> Self {
        Self { config }
    }

    pub fn policy(&self) -> AlertPolicy {
        self.config.alert_policy
    }

    /// Advance every eligible bag by one frame. Returns the alerts to deliver.
    pub fn step(&self, tracks: &mut [Track], now: f64) -> Vec<AnomalyEvent> {
        let person_last_seen: HashMap<TrackId, f64> = tracks
            .iter()
            .filter(|t| t.is_person())
            .map(|t| (t.id, t.last_seen))
            .collect();

        let mut events = Vec::new();

        for bag in tracks.iter_mut().filter(|t| t.is_bag()) {
            if bag.owner.is_none() && !bag.status.is_unattended() {
                continue;
            }

            let owner_present = bag
                .owner
                .and_then(|id| person_last_seen.get(&id))
                .map_or(false, |&seen| {
                    elapsed_seconds(now, seen) <= self.config.owner_grace_period_seconds
                });

            if owner_present {
                if bag.status != TrackStatus::Owned {
                    debug!("Bag T{} back with owner ({})", bag.id, bag.status.as_str());
                }
                bag.status = TrackStatus::Owned;
                bag.timer_start = None;
                bag.alerted = false;
                continue;
            }

            if !bag.status.is_unattended() {
                warn!(
                    "Bag T{} unattended (owner {:?} absent)",
                    bag.id, bag.owner
                );
                bag.status = TrackStatus::Unattended;
                bag.timer_start = Some(now);
                bag.alerted = false;
                continue;
            }

            let start = *bag.timer_start.get_or_insert(now);
            let elapsed = elapsed_seconds(now, start);
            if elapsed <= self.config.unattended_threshold_seconds {
                continue;
            }

            if bag.status != TrackStatus::Anomaly {
                warn!(
                    "🚨 Bag T{} ({}) unattended for {:.1}s - ANOMALY",
                    bag.id, bag.display_name, elapsed
                );
                bag.status = TrackStatus::Anomaly;
            }

            let fire = match self.config.alert_policy {
                AlertPolicy::EveryFrame => true,
                AlertPolicy::OncePerEpisode => !bag.alerted,
            };
            if fire {
                bag.alerted = true;
                events.push(AnomalyEvent {
                    track_id: bag.id,
                    elapsed_seconds: elapsed,
                });
            }
        }

        events
    }
}
