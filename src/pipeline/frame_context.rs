// src/pipeline/frame_context.rs
//
// Everything one frame produced, handed to renderers and alert transports.
// Built after the frame's state update completes, so readers never see a
// half-updated track set.

use super::event_bus::PipelineEvent;
use crate::analysis::Track;
use crate::types::{AnomalyEvent, BBox, ClassGroup, TrackId, TrackStatus};
use serde::Serialize;

/// BGR overlay colors for renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlayColor {
    Green,
    Orange,
    Red,
}

impl OverlayColor {
    pub fn bgr(&self) -> (u8, u8, u8) {
        match self {
            Self::Green => (0, 255, 0),
            Self::Orange => (0, 165, 255),
            Self::Red => (0, 0, 255),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackSnapshot {
    pub id: TrackId,
    pub bbox: BBox,
    pub display_name: String,
    pub class_group: ClassGroup,
    pub status: TrackStatus,
    pub owner_id: Option<TrackId>,
    pub seconds_unattended: Option<f64>,
}

impl TrackSnapshot {
    pub fn from_track(track: &Track, now: f64) -> Self {
        Self {
            id: track.id,
            bbox: track.bbox,
            display_name: track.display_name.clone(),
            class_group: track.class_group,
            status: track.status,
            owner_id: track.owner,
            seconds_unattended: track.seconds_unattended(now),
        }
    }

    /// Overlay caption, e.g. `ID:3 backpack Unattended: 2s - ANOMALY!`
    pub fn label(&self) -> String {
        let mut text = format!("ID:{} {}", self.id, self.display_name);
        if let Some(secs) = self.seconds_unattended {
            text.push_str(&format!(" Unattended: {}s", secs as u64));
        }
        if self.status == TrackStatus::Anomaly {
            text.push_str(" - ANOMALY!");
        }
        text
    }

    pub fn color(&self) -> OverlayColor {
        match self.status {
            TrackStatus::Anomaly => OverlayColor::Red,
            TrackStatus::Unattended => OverlayColor::Orange,
            TrackStatus::New | TrackStatus::Owned => OverlayColor::Green,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FrameContext {
    pub frame_id: u64,
    pub timestamp: f64,
    /// Tracks matched in this frame
    pub tracks: Vec<TrackSnapshot>,
    pub alerts: Vec<AnomalyEvent>,
    pub events: Vec<PipelineEvent>,
}

impl FrameContext {
    pub fn new(frame_id: u64, timestamp: f64) -> Self {
        Self {
            frame_id,
            timestamp,
            tracks: Vec::new(),
            alerts: Vec::new(),
            events: Vec::new(),
        }
    }

    pub fn has_alerts(&self) -> bool {
        !self.alerts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(status: TrackStatus, secs: Option<f64>) -> TrackSnapshot {
        TrackSnapshot {
            id: 3,
            bbox: [0, 0, 10, 10],
            display_name: "backpack".to_string(),
            class_group: ClassGroup::Bag,
            status,
            owner_id: None,
            seconds_unattended: secs,
        }
    }

    #[test]
    fn test_labels() {
        assert_eq!(snapshot(TrackStatus::Owned, None).label(), "ID:3 backpack");
        assert_eq!(
            snapshot(TrackStatus::Unattended, Some(1.7)).label(),
            "ID:3 backpack Unattended: 1s"
        );
        assert_eq!(
            snapshot(TrackStatus::Anomaly, Some(2.4)).label(),
            "ID:3 backpack Unattended: 2s - ANOMALY!"
        );
    }

    #[test]
    fn test_colors() {
        assert_eq!(snapshot(TrackStatus::New, None).color(), OverlayColor::Green);
        assert_eq!(
            snapshot(TrackStatus::Unattended, Some(0.5)).color().bgr(),
            (0, 165, 255)
        );
        assert_eq!(snapshot(TrackStatus::Anomaly, Some(3.0)).color(), OverlayColor::Red);
    }
}
