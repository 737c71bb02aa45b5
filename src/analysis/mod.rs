// src/analysis/mod.rs
//
// Per-frame tracking and anomaly logic.
//
// Signal flow:
//   Detections → track_manager → ownership → anomaly → AnomalyEvent
//
// Orchestrated by pipeline::PipelineOrchestrator.

pub mod anomaly;
pub mod ownership;
pub mod track_manager;

pub use anomaly::AnomalyStateMachine;
pub use ownership::{OwnershipChange, OwnershipResolver};
pub use track_manager::{Track, TrackManager};

use tracing::warn;

/// Seconds from `since` to `now`, clamped at zero when the supplied clock
/// runs backwards.
pub fn elapsed_seconds(now: f64, since: f64) -> f64 {
    let elapsed = now - since;
    if elapsed < 0.0 {
        warn!(
            "Clock went backwards ({:.3}s < {:.3}s), clamping elapsed to 0",
            now, since
        );
        return 0.0;
    }
    elapsed
}
