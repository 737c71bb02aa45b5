// src/analysis/ownership.rs
//
// Assigns each bag to the nearest visible person and heals owner ids
// that point at tracks which no longer exist.

use super::track_manager::Track;
use crate::types::{center_distance, OwnershipConfig, TrackId, TrackStatus};
use std::collections::HashSet;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OwnershipChange {
    Assigned {
        bag_id: TrackId,
        owner_id: TrackId,
        distance_px: f32,
    },
    /// The owner track is gone; the reference was cleared. A bag that was
    /// still `Owned` and found no new owner is handed over as `Unattended`.
    Lost { bag_id: TrackId, owner_id: TrackId },
}

pub struct OwnershipResolver {
    search_radius_px: f32,
}

impl OwnershipResolver {
    pub fn new(config: &OwnershipConfig) -> Self {
        Self {
            search_radius_px: config.owner_search_radius_px,
        }
    }

    /// Re-validate and, where needed, re-resolve the owner of every bag.
    ///
    /// Bags with a live owner are left alone, so calling this twice on the same
    /// state changes nothing the second time. Equidistant candidates resolve to
    /// the earliest-created person.
    pub fn resolve(&self, tracks: &mut [Track]) -> Vec<OwnershipChange> {
        let live_people: HashSet<TrackId> = tracks
            .iter()
            .filter(|t| t.is_person())
            .map(|t| t.id)
            .collect();
        let visible_people: Vec<(TrackId, (i32, i32))> = tracks
            .iter()
            .filter(|t| t.is_person() && t.matched_in_frame)
            .map(|t| (t.id, t.center))
            .collect();

        let mut changes = Vec::new();

        for bag in tracks.iter_mut().filter(|t| t.is_bag()) {
            let lost_owner = match bag.owner {
                Some(owner_id) if live_people.contains(&owner_id) => continue,
                Some(owner_id) => {
                    debug!("Bag T{} lost owner T{} (track gone)", bag.id, owner_id);
                    bag.owner = None;
                    changes.push(OwnershipChange::Lost {
                        bag_id: bag.id,
                        owner_id,
                    });
                    Some(owner_id)
                }
                None => None,
            };

            let mut best: Option<(TrackId, f32)> = None;
            for (person_id, center) in &visible_people {
                let distance = center_distance(bag.center, *center);
                if distance >= self.search_radius_px {
                    continue;
                }
                if best.map_or(true, |(_, min)| distance < min) {
                    best = Some((*person_id, distance));
                }
            }

            if let Some((owner_id, distance_px)) = best {
                debug!(
                    "Bag T{} owned by T{} ({:.0}px)",
                    bag.id, owner_id, distance_px
                );
                bag.owner = Some(owner_id);
                bag.status = TrackStatus::Owned;
                bag.timer_start = None;
                bag.alerted = false;
                changes.push(OwnershipChange::Assigned {
                    bag_id: bag.id,
                    owner_id,
                    distance_px,
                });
            } else if let Some(owner_id) = lost_owner {
                if !bag.status.is_unattended() {
                    // The owner expired before the grace check could see it
                    // leave. The anomaly step starts the timer on this frame.
                    warn!(
                        "Bag T{} unattended (owner T{} track expired)",
                        bag.id, owner_id
                    );
                    bag.status = TrackStatus::Unattended;
                    bag.timer_start = None;
                    bag.alerted = false;
                }
            }
        }

        changes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::TrackManager;
    use crate::types::{ClassGroup, Detection, TrackingConfig};

    fn det(group: ClassGroup, cx: i32, cy: i32) -> Detection {
        Detection {
            center: (cx, cy),
            bbox: [cx - 10, cy - 10, cx + 10, cy + 10],
            class_group: group,
            display_name: "x".to_string(),
        }
    }

    fn resolver() -> OwnershipResolver {
        OwnershipResolver::new(&OwnershipConfig::default())
    }

    fn bag(tm: &TrackManager) -> &Track {
        tm.tracks().iter().find(|t| t.is_bag()).unwrap()
    }

    #[test]
    fn test_nearest_visible_person_becomes_owner() {
        let mut tm = TrackManager::new(TrackingConfig::default());
        tm.update(
            &[
                det(ClassGroup::Person, 500, 100),
                det(ClassGroup::Person, 180, 100),
                det(ClassGroup::Bag, 100, 100),
            ],
            0.0,
        );
        let near = tm.tracks()[1].id;

        let changes = resolver().resolve(tm.tracks_mut());
        assert_eq!(changes.len(), 1);
        assert_eq!(bag(&tm).owner, Some(near));
        assert_eq!(bag(&tm).status, TrackStatus::Owned);
    }

    #[test]
    fn test_no_candidate_leaves_bag_alone() {
        let mut tm = TrackManager::new(TrackingConfig::default());
        tm.update(
            &[det(ClassGroup::Person, 400, 100), det(ClassGroup::Bag, 100, 100)],
            0.0,
        );
        // 300px > 250px search radius
        let changes = resolver().resolve(tm.tracks_mut());
        assert!(changes.is_empty());
        assert_eq!(bag(&tm).owner, None);
        assert_eq!(bag(&tm).status, TrackStatus::New);
    }

    #[test]
    fn test_invisible_person_not_a_candidate() {
        let mut tm = TrackManager::new(TrackingConfig::default());
        tm.update(&[det(ClassGroup::Person, 150, 100)], 0.0);
        tm.update(&[det(ClassGroup::Bag, 100, 100)], 0.2);
        resolver().resolve(tm.tracks_mut());
        assert_eq!(bag(&tm).owner, None);
    }

    #[test]
    fn test_equidistant_tie_is_deterministic() {
        let dets = [
            det(ClassGroup::Person, 100, 0),
            det(ClassGroup::Person, 100, 240),
            det(ClassGroup::Bag, 100, 120),
        ];
        let mut owners = Vec::new();
        for _ in 0..3 {
            let mut tm = TrackManager::new(TrackingConfig::default());
            tm.update(&dets, 0.0);
            resolver().resolve(tm.tracks_mut());
            owners.push(bag(&tm).owner);
        }
        assert_eq!(owners[0], Some(1));
        assert!(owners.iter().all(|o| *o == owners[0]));
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let mut tm = TrackManager::new(TrackingConfig::default());
        tm.update(
            &[det(ClassGroup::Person, 150, 100), det(ClassGroup::Bag, 100, 100)],
            0.0,
        );
        let r = resolver();
        r.resolve(tm.tracks_mut());
        let first = bag(&tm).owner;
        let changes = r.resolve(tm.tracks_mut());
        assert!(changes.is_empty());
        assert_eq!(bag(&tm).owner, first);
    }

    #[test]
    fn test_dangling_owner_cleared_and_reresolved() {
        let mut tm = TrackManager::new(TrackingConfig::default());
        tm.update(
            &[det(ClassGroup::Person, 150, 100), det(ClassGroup::Bag, 100, 100)],
            0.0,
        );
        let r = resolver();
        r.resolve(tm.tracks_mut());
        let old_owner = bag(&tm).owner.unwrap();

        // Owner vanishes past the ghost window, bag keeps being seen
        tm.update(&[det(ClassGroup::Bag, 100, 100)], 2.0);
        tm.update(&[det(ClassGroup::Bag, 100, 100)], 3.5);
        assert!(tm.get_track(old_owner).is_none());

        let changes = r.resolve(tm.tracks_mut());
        assert_eq!(
            changes,
            vec![OwnershipChange::Lost {
                bag_id: bag(&tm).id,
                owner_id: old_owner
            }]
        );
        assert_eq!(bag(&tm).owner, None);
        assert_eq!(bag(&tm).status, TrackStatus::Unattended);

        // A new person shows up next to the bag and claims it
        tm.update(
            &[det(ClassGroup::Bag, 100, 100), det(ClassGroup::Person, 60, 100)],
            3.6,
        );
        r.resolve(tm.tracks_mut());
        let new_owner = bag(&tm).owner.unwrap();
        assert_ne!(new_owner, old_owner);
        assert!(tm.get_track(new_owner).unwrap().is_person());
        assert_eq!(bag(&tm).status, TrackStatus::Owned);
    }

    #[test]
    fn test_lost_owner_with_new_owner_nearby_stays_owned() {
        let mut tm = TrackManager::new(TrackingConfig::default());
        tm.update(
            &[det(ClassGroup::Person, 150, 100), det(ClassGroup::Bag, 100, 100)],
            0.0,
        );
        let r = resolver();
        r.resolve(tm.tracks_mut());

        // Owner gone past the ghost window, a stranger is right beside the bag
        tm.update(
            &[det(ClassGroup::Bag, 100, 100), det(ClassGroup::Person, 400, 100)],
            4.0,
        );
        tm.update(
            &[det(ClassGroup::Bag, 100, 100), det(ClassGroup::Person, 60, 100)],
            4.1,
        );
        let changes = r.resolve(tm.tracks_mut());
        assert_eq!(changes.len(), 2);
        assert_eq!(bag(&tm).status, TrackStatus::Owned);
        assert_eq!(bag(&tm).timer_start, None);
    }
}
