// src/pipeline/metrics.rs
//
// Counters for every stage. Shared handles so a reporter task can read them
// while the frame loop runs.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone)]
pub struct PipelineMetrics {
    pub total_frames: Arc<AtomicU64>,
    pub detections_accepted: Arc<AtomicU64>,
    pub detections_rejected: Arc<AtomicU64>,
    pub tracks_created: Arc<AtomicU64>,
    pub tracks_expired: Arc<AtomicU64>,
    pub owners_assigned: Arc<AtomicU64>,
    pub anomalies_raised: Arc<AtomicU64>,
    pub alerts_delivered: Arc<AtomicU64>,
    pub events_discarded: Arc<AtomicU64>,
    pub frame_time_us: Arc<AtomicU64>,
    pub started_at: Instant,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self {
            total_frames: Arc::new(AtomicU64::new(0)),
            detections_accepted: Arc::new(AtomicU64::new(0)),
            detections_rejected: Arc::new(AtomicU64::new(0)),
            tracks_created: Arc::new(AtomicU64::new(0)),
            tracks_expired: Arc::new(AtomicU64::new(0)),
            owners_assigned: Arc::new(AtomicU64::new(0)),
            anomalies_raised: Arc::new(AtomicU64::new(0)),
            alerts_delivered: Arc::new(AtomicU64::new(0)),
            events_discarded: Arc::new(AtomicU64::new(0)),
            frame_time_us: Arc::new(AtomicU64::new(0)),
            started_at: Instant::now(),
        }
    }

    pub fn inc(&self, counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(&self, counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    pub fn set_timing(&self, counter: &AtomicU64, duration_us: u64) {
        counter.store(duration_us, Ordering::Relaxed);
    }

    pub fn fps(&self) -> f64 {
        let frames = self.total_frames.load(Ordering::Relaxed);
        let elapsed = self.started_at.elapsed().as_secs_f64();
        if elapsed > 0.01 {
            frames as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            total_frames: self.total_frames.load(Ordering::Relaxed),
            fps: self.fps(),
            detections_accepted: self.detections_accepted.load(Ordering::Relaxed),
            detections_rejected: self.detections_rejected.load(Ordering::Relaxed),
            tracks_created: self.tracks_created.load(Ordering::Relaxed),
            tracks_expired: self.tracks_expired.load(Ordering::Relaxed),
            owners_assigned: self.owners_assigned.load(Ordering::Relaxed),
            anomalies_raised: self.anomalies_raised.load(Ordering::Relaxed),
            alerts_delivered: self.alerts_delivered.load(Ordering::Relaxed),
            events_discarded: self.events_discarded.load(Ordering::Relaxed),
            last_frame_us: self.frame_time_us.load(Ordering::Relaxed),
            elapsed_secs: self.started_at.elapsed().as_secs_f64(),
        }
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct MetricsSummary {
    pub total_frames: u64,
    pub fps: f64,
    pub detections_accepted: u64,
    pub detections_rejected: u64,
    pub tracks_created: u64,
    pub tracks_expired: u64,
    pub owners_assigned: u64,
    pub anomalies_raised: u64,
    pub alerts_delivered: u64,
    pub events_discarded: u64,
    pub last_frame_us: u64,
    pub elapsed_secs: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_counters() {
        let metrics = PipelineMetrics::new();
        let reader = metrics.clone();
        metrics.inc(&metrics.total_frames);
        metrics.add(&metrics.detections_accepted, 4);
        let summary = reader.summary();
        assert_eq!(summary.total_frames, 1);
        assert_eq!(summary.detections_accepted, 4);
    }
}
