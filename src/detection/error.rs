// src/detection/error.rs

use crate::types::BBox;
use thiserror::Error;

/// Input-contract violations for a single raw detection. Each one rejects that
/// detection only; the rest of the frame is still processed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DetectionError {
    #[error("confidence {0} is outside [0, 1]")]
    ConfidenceOutOfRange(f32),

    #[error("confidence is not a finite number")]
    NonFiniteConfidence,

    #[error("degenerate bounding box {bbox:?}")]
    DegenerateBox { bbox: BBox },
}
