// src/detection/filter.rs
//
// Turns one frame of raw detector output into grouped detections.
// Pure: nothing here survives past the call.

use super::error::DetectionError;
use crate::types::{ClassGroup, DetectionConfig, Detection, RawDetection};
use std::collections::BTreeMap;
use tracing::{debug, warn};

pub struct DetectionFilter {
    confidence_threshold: f32,
    class_groups: BTreeMap<String, ClassGroup>,
}

/// Result of filtering one frame.
#[derive(Debug, Default)]
pub struct FilteredFrame {
    pub detections: Vec<Detection>,
    /// Detections that broke the input contract and were skipped
    pub rejected: usize,
}

impl DetectionFilter {
    pub fn new(config: &DetectionConfig) -> Self {
        Self {
            confidence_threshold: config.confidence_threshold,
            class_groups: config.class_groups.clone(),
        }
    }

    pub fn class_group(&self, label: &str) -> Option<ClassGroup> {
        self.class_groups.get(label).copied()
    }

    /// Validate and classify a single raw detection.
    ///
    /// `Ok(None)` means the detection is legitimately ignored (low confidence or
    /// a label outside the group table). `Err` means it violated the input
    /// contract.
    pub fn accept(&self, raw: &RawDetection) -> Result<Option<Detection>, DetectionError> {
        if !raw.confidence.is_finite() {
            return Err(DetectionError::NonFiniteConfidence);
        }
        if !(0.0..=1.0).contains(&raw.confidence) {
            return Err(DetectionError::ConfidenceOutOfRange(raw.confidence));
        }
        let [x1, y1, x2, y2] = raw.bbox;
        if x1 < 0 || y1 < 0 || x2 <= x1 || y2 <= y1 {
            return Err(DetectionError::DegenerateBox { bbox: raw.bbox });
        }

        if raw.confidence <= self.confidence_threshold {
            return Ok(None);
        }
        let Some(class_group) = self.class_group(&raw.label) else {
            return Ok(None);
        };

        Ok(Some(Detection {
            // Coordinates are non-negative here, so the span cannot overflow
            center: (x1 + (x2 - x1) / 2, y1 + (y2 - y1) / 2),
            bbox: raw.bbox,
            class_group,
            display_name: raw.label.clone(),
        }))
    }

    pub fn filter(&self, raw: &[RawDetection]) -> FilteredFrame {
        let mut out = FilteredFrame {
            detections: Vec::with_capacity(raw.len()),
            rejected: 0,
        };

        for det in raw {
            match self.accept(det) {
                Ok(Some(detection)) => out.detections.push(detection),
                Ok(None) => {}
                Err(e) => {
                    warn!("Skipping detection '{}': {}", det.label, e);
                    out.rejected += 1;
                }
            }
        }

        debug!(
            "Filter kept {}/{} detections ({} rejected)",
            out.detections.len(),
            raw.len(),
            out.rejected
        );
        out
    }
}
