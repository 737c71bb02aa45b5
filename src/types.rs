use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type TrackId = u32;

/// Pixel box as `[x1, y1, x2, y2]`.
pub type BBox = [i32; 4];

// ============================================================================
// CONFIGURATION
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub detection: DetectionConfig,
    pub tracking: TrackingConfig,
    pub ownership: OwnershipConfig,
    pub anomaly: AnomalyConfig,
    pub pipeline: PipelineConfig,
    pub io: IoConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Detections at or below this confidence are dropped
    pub confidence_threshold: f32,
    /// Raw detector label -> semantic group. Labels not listed are ignored.
    pub class_groups: BTreeMap<String, ClassGroup>,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        let class_groups = [
            ("person", ClassGroup::Person),
            ("backpack", ClassGroup::Bag),
            ("handbag", ClassGroup::Bag),
            ("suitcase", ClassGroup::Bag),
            ("bag", ClassGroup::Bag),
        ]
        .into_iter()
        .map(|(label, group)| (label.to_string(), group))
        .collect();

        Self {
            confidence_threshold: 0.5,
            class_groups,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    pub match_radius_px: f32,
    pub ghost_cleanup_seconds: f64,
    pub match_strategy: MatchStrategy,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            match_radius_px: 75.0,
            ghost_cleanup_seconds: 3.0,
            match_strategy: MatchStrategy::FirstMatch,
        }
    }
}

/// How detections are associated with existing tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    /// First track (insertion order) of the same group inside the radius.
    FirstMatch,
    /// Greedy global assignment by ascending center distance.
    Nearest,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OwnershipConfig {
    pub owner_search_radius_px: f32,
}

impl Default for OwnershipConfig {
    fn default() -> Self {
        Self {
            owner_search_radius_px: 250.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnomalyConfig {
    pub owner_grace_period_seconds: f64,
    pub unattended_threshold_seconds: f64,
    pub alert_policy: AlertPolicy,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            owner_grace_period_seconds: 1.0,
            unattended_threshold_seconds: 2.0,
            alert_policy: AlertPolicy::OncePerEpisode,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertPolicy {
    /// One event when a bag enters Anomaly; re-armed once the owner returns.
    OncePerEpisode,
    /// One event per frame for as long as the bag stays in Anomaly.
    EveryFrame,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub event_bus_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            event_bus_capacity: 256,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IoConfig {
    /// JSON Lines file of detector output, one frame per line
    pub input_path: String,
    /// JSON Lines alert output; stdout when unset
    pub alerts_path: Option<String>,
}

impl Default for IoConfig {
    fn default() -> Self {
        Self {
            input_path: "detections.jsonl".to_string(),
            alerts_path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "unattended_detection=info".to_string(),
        }
    }
}

// ============================================================================
// DOMAIN TYPES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassGroup {
    Person,
    Bag,
}

/// Bag lifecycle. Person tracks stay `New` for their whole life.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackStatus {
    New,
    Owned,
    Unattended,
    Anomaly,
}

impl TrackStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::Owned => "OWNED",
            Self::Unattended => "UNATTENDED",
            Self::Anomaly => "ANOMALY",
        }
    }

    /// Owner-absence episode in progress (timer running).
    pub fn is_unattended(&self) -> bool {
        matches!(self, Self::Unattended | Self::Anomaly)
    }
}

/// One box exactly as the detector reported it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDetection {
    pub bbox: BBox,
    pub label: String,
    pub confidence: f32,
}

/// A detection that passed filtering and grouping.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub center: (i32, i32),
    pub bbox: BBox,
    pub class_group: ClassGroup,
    pub display_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AnomalyEvent {
    pub track_id: TrackId,
    pub elapsed_seconds: f64,
}

/// Euclidean distance between two pixel centers.
pub fn center_distance(a: (i32, i32), b: (i32, i32)) -> f32 {
    let dx = (a.0 - b.0) as f32;
    let dy = (a.1 - b.1) as f32;
    (dx * dx + dy * dy).sqrt()
}
