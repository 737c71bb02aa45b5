// src/analysis/track_manager.rs
//
// Center-distance multi-object tracker for people and bags.
//
// Design:
//   - Positional matching only, no appearance features
//   - First-match in insertion order by default (cheap, O(dets x tracks));
//     greedy nearest-distance assignment is available as an option
//   - A track absorbs at most one detection per frame
//   - Tracks unseen for longer than the ghost window are dropped for good;
//     ids are never reused

use super::elapsed_seconds;
use crate::types::{
    center_distance, BBox, ClassGroup, Detection, MatchStrategy, TrackId, TrackStatus,
    TrackingConfig,
};
use tracing::debug;

// ============================================================================
// TYPES
// ============================================================================

#[derive(Debug, Clone)]
pub struct Track {
    pub id: TrackId,
    pub center: (i32, i32),
    pub bbox: BBox,
    pub display_name: String,
    /// Fixed at creation
    pub class_group: ClassGroup,
    pub status: TrackStatus,
    /// Id of the owning person track. Only meaningful for bags; must be
    /// re-validated against the live set before use.
    pub owner: Option<TrackId>,
    /// Start of the current owner-absence episode
    pub timer_start: Option<f64>,
    pub last_seen: f64,
    pub matched_in_frame: bool,
    /// Set once an alert has gone out for the current anomaly episode
    pub(crate) alerted: bool,
}

impl Track {
    fn new(id: TrackId, det: &Detection, now: f64) -> Self {
        Self {
            id,
            center: det.center,
            bbox: det.bbox,
            display_name: det.display_name.clone(),
            class_group: det.class_group,
            status: TrackStatus::New,
            owner: None,
            timer_start: None,
            last_seen: now,
            matched_in_frame: true,
            alerted: false,
        }
    }

    pub fn is_bag(&self) -> bool {
        self.class_group == ClassGroup::Bag
    }

    pub fn is_person(&self) -> bool {
        self.class_group == ClassGroup::Person
    }

    /// Seconds since the current unattended episode began, if one is running.
    pub fn seconds_unattended(&self, now: f64) -> Option<f64> {
        if !self.status.is_unattended() {
            return None;
        }
        self.timer_start.map(|start| elapsed_seconds(now, start))
    }

    fn update_with_detection(&mut self, det: &Detection, now: f64) {
        self.center = det.center;
        self.bbox = det.bbox;
        self.display_name = det.display_name.clone();
        self.last_seen = now;
        self.matched_in_frame = true;
    }
}

// ============================================================================
// MAIN TRACKER
// ============================================================================

pub struct TrackManager {
    config: TrackingConfig,
    tracks: Vec<Track>,
    next_id: TrackId,
    created: Vec<TrackId>,
    expired: Vec<TrackId>,
}

impl TrackManager {
    pub fn new(config: TrackingConfig) -> Self {
        Self {
            config,
            tracks: Vec::with_capacity(32),
            next_id: 1,
            created: Vec::new(),
            expired: Vec::new(),
        }
    }

    /// Process one frame of detections. Returns the live track set.
    pub fn update(&mut self, detections: &[Detection], now: f64) -> &[Track] {
        self.created.clear();
        self.expired.clear();

        for track in &mut self.tracks {
            track.matched_in_frame = false;
        }

        // Only tracks alive before this frame are match candidates
        let matched_dets = match self.config.match_strategy {
            MatchStrategy::FirstMatch => self.match_first(detections, now),
            MatchStrategy::Nearest => self.match_nearest(detections, now),
        };

        // ════════════════════════════════════════════════════════════════════
        // UNMATCHED DETECTIONS → NEW TRACKS
        // ════════════════════════════════════════════════════════════════════
        for (det, matched) in detections.iter().zip(&matched_dets) {
            if *matched {
                continue;
            }
            let track = Track::new(self.next_id, det, now);
            debug!(
                "New track T{} created: {} ({:?}) at ({}, {})",
                track.id, track.display_name, track.class_group, track.center.0, track.center.1
            );
            self.created.push(track.id);
            self.next_id += 1;
            self.tracks.push(track);
        }

        // ════════════════════════════════════════════════════════════════════
        // GHOST CLEANUP
        // ════════════════════════════════════════════════════════════════════
        let ghost = self.config.ghost_cleanup_seconds;
        let expired = &mut self.expired;
        self.tracks.retain(|t| {
            let unseen = elapsed_seconds(now, t.last_seen);
            if unseen > ghost {
                debug!("Track T{} expired (unseen {:.2}s)", t.id, unseen);
                expired.push(t.id);
                return false;
            }
            true
        });

        &self.tracks
    }

    /// First track in insertion order with the same group inside the radius.
    fn match_first(&mut self, detections: &[Detection], now: f64) -> Vec<bool> {
        let radius = self.config.match_radius_px;
        let mut matched_dets = vec![false; detections.len()];

        for (di, det) in detections.iter().enumerate() {
            let hit = self.tracks.iter_mut().find(|t| {
                !t.matched_in_frame
                    && t.class_group == det.class_group
                    && center_distance(t.center, det.center) < radius
            });
            if let Some(track) = hit {
                track.update_with_detection(det, now);
                matched_dets[di] = true;
            }
        }

        matched_dets
    }

    /// Greedy global assignment by ascending center distance.
    fn match_nearest(&mut self, detections: &[Detection], now: f64) -> Vec<bool> {
        let radius = self.config.match_radius_px;
        let mut matched_tracks = vec![false; self.tracks.len()];
        let mut matched_dets = vec![false; detections.len()];

        let mut pairs: Vec<(usize, usize, f32)> = Vec::new();
        for (ti, track) in self.tracks.iter().enumerate() {
            for (di, det) in detections.iter().enumerate() {
                if track.class_group != det.class_group {
                    continue;
                }
                let dist = center_distance(track.center, det.center);
                if dist < radius {
                    pairs.push((ti, di, dist));
                }
            }
        }
        // Stable sort: equal distances keep track insertion order
        pairs.sort_by(|a, b| a.2.partial_cmp(&b.2).unwrap_or(std::cmp::Ordering::Equal));

        for (ti, di, _dist) in pairs {
            if matched_tracks[ti] || matched_dets[di] {
                continue;
            }
            matched_tracks[ti] = true;
            matched_dets[di] = true;
            self.tracks[ti].update_with_detection(&detections[di], now);
        }

        matched_dets
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Mutable view for the per-frame stages that follow `update`.
    pub(crate) fn tracks_mut(&mut self) -> &mut [Track] {
        &mut self.tracks
    }

    pub fn get_track(&self, id: TrackId) -> Option<&Track> {
        self.tracks.iter().find(|t| t.id == id)
    }

    /// Ids created by the most recent `update`.
    pub fn last_created(&self) -> &[TrackId] {
        &self.created
    }

    /// Ids removed by the most recent `update`.
    pub fn last_expired(&self) -> &[TrackId] {
        &self.expired
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn det(group: ClassGroup, cx: i32, cy: i32) -> Detection {
        Detection {
            center: (cx, cy),
            bbox: [cx - 10, cy - 10, cx + 10, cy + 10],
            class_group: group,
            display_name: match group {
                ClassGroup::Person => "person".to_string(),
                ClassGroup::Bag => "backpack".to_string(),
            },
        }
    }

    fn manager() -> TrackManager {
        TrackManager::new(TrackingConfig::default())
    }

    #[test]
    fn test_track_creation_and_continuity() {
        let mut tm = manager();
        tm.update(&[det(ClassGroup::Person, 100, 100)], 0.0);
        assert_eq!(tm.tracks().len(), 1);
        let id = tm.tracks()[0].id;
        assert_eq!(tm.last_created(), &[id]);

        tm.update(&[det(ClassGroup::Person, 140, 120)], 0.1);
        assert_eq!(tm.tracks().len(), 1);
        assert_eq!(tm.tracks()[0].id, id);
        assert_eq!(tm.tracks()[0].center, (140, 120));
        assert_eq!(tm.tracks()[0].last_seen, 0.1);
        assert!(tm.last_created().is_empty());
    }

    #[test]
    fn test_match_radius_is_exclusive() {
        let mut tm = manager();
        tm.update(&[det(ClassGroup::Bag, 0, 0)], 0.0);
        // Exactly 75px away → new track
        tm.update(&[det(ClassGroup::Bag, 75, 0)], 0.1);
        assert_eq!(tm.tracks().len(), 2);
    }

    #[test]
    fn test_class_group_never_crosses() {
        let mut tm = manager();
        tm.update(&[det(ClassGroup::Person, 100, 100)], 0.0);
        tm.update(&[det(ClassGroup::Bag, 100, 100)], 0.1);
        assert_eq!(tm.tracks().len(), 2);
        assert_eq!(tm.tracks()[0].class_group, ClassGroup::Person);
        assert!(!tm.tracks()[0].matched_in_frame);
        assert_eq!(tm.tracks()[1].class_group, ClassGroup::Bag);
    }

    #[test]
    fn test_first_match_uses_insertion_order() {
        let mut tm = manager();
        tm.update(
            &[det(ClassGroup::Person, 100, 100), det(ClassGroup::Person, 160, 100)],
            0.0,
        );
        let first = tm.tracks()[0].id;
        // 50px from first, 10px from second: first-match still picks the first
        tm.update(&[det(ClassGroup::Person, 150, 100)], 0.1);
        let t = tm.get_track(first).unwrap();
        assert!(t.matched_in_frame);
        assert_eq!(t.center, (150, 100));
    }

    #[test]
    fn test_nearest_strategy_picks_closest() {
        let mut tm = TrackManager::new(TrackingConfig {
            match_strategy: MatchStrategy::Nearest,
            ..TrackingConfig::default()
        });
        tm.update(
            &[det(ClassGroup::Person, 100, 100), det(ClassGroup::Person, 160, 100)],
            0.0,
        );
        let (first, second) = (tm.tracks()[0].id, tm.tracks()[1].id);
        tm.update(&[det(ClassGroup::Person, 150, 100)], 0.1);
        assert!(!tm.get_track(first).unwrap().matched_in_frame);
        assert_eq!(tm.get_track(second).unwrap().center, (150, 100));
    }

    #[test]
    fn test_track_absorbs_one_detection_per_frame() {
        let mut tm = manager();
        tm.update(&[det(ClassGroup::Bag, 100, 100)], 0.0);
        tm.update(
            &[det(ClassGroup::Bag, 105, 100), det(ClassGroup::Bag, 95, 100)],
            0.1,
        );
        assert_eq!(tm.tracks().len(), 2);
        assert_eq!(tm.tracks()[0].center, (105, 100));
        assert_eq!(tm.tracks()[1].center, (95, 100));
        assert!(tm.tracks().iter().all(|t| t.matched_in_frame));
    }

    #[test]
    fn test_new_track_defaults() {
        let mut tm = manager();
        tm.update(&[det(ClassGroup::Bag, 10, 10)], 2.5);
        let t = &tm.tracks()[0];
        assert_eq!(t.status, TrackStatus::New);
        assert_eq!(t.owner, None);
        assert_eq!(t.timer_start, None);
        assert_eq!(t.last_seen, 2.5);
        assert!(t.matched_in_frame);
    }

    #[test]
    fn test_ghost_cleanup_and_no_id_reuse() {
        let mut tm = manager();
        tm.update(&[det(ClassGroup::Bag, 300, 300)], 0.0);
        let old_id = tm.tracks()[0].id;

        // Exactly at the window: still alive
        tm.update(&[], 3.0);
        assert_eq!(tm.tracks().len(), 1);

        tm.update(&[], 3.1);
        assert!(tm.tracks().is_empty());
        assert_eq!(tm.last_expired(), &[old_id]);

        tm.update(&[det(ClassGroup::Bag, 300, 300)], 3.2);
        assert_eq!(tm.tracks().len(), 1);
        assert_ne!(tm.tracks()[0].id, old_id);
    }

    #[test]
    fn test_ids_unique_across_many_frames() {
        let mut tm = manager();
        let mut seen_ids = HashSet::new();
        for frame in 0..40 {
            let now = frame as f64 * 0.5;
            // Jump far enough every frame to force new tracks
            let x = (frame % 7) * 200;
            let dets = vec![det(ClassGroup::Person, x, 50), det(ClassGroup::Bag, x, 400)];
            tm.update(&dets, now);

            let live: HashSet<TrackId> = tm.tracks().iter().map(|t| t.id).collect();
            assert_eq!(live.len(), tm.tracks().len(), "duplicate live id");
            for id in tm.last_created() {
                assert!(seen_ids.insert(*id), "id {} reused", id);
            }
        }
    }

    #[test]
    fn test_backwards_clock_does_not_expire() {
        let mut tm = manager();
        tm.update(&[det(ClassGroup::Person, 0, 0)], 10.0);
        tm.update(&[], 5.0);
        assert_eq!(tm.tracks().len(), 1);
    }

    #[test]
    fn test_seconds_unattended_only_while_unattended() {
        let mut tm = manager();
        tm.update(&[det(ClassGroup::Bag, 0, 0)], 0.0);
        let track = &mut tm.tracks_mut()[0];
        assert_eq!(track.seconds_unattended(1.0), None);
        track.status = TrackStatus::Unattended;
        track.timer_start = Some(1.0);
        assert_eq!(track.seconds_unattended(2.5), Some(1.5));
    }
}
