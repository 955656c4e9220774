//! Hand pose samples and their translation into joint targets.
//!
//! Pose estimation itself happens elsewhere; this module only consumes its
//! output: 21 normalized landmarks, a confidence score and the instant the
//! sample was taken.

mod mapper;
mod slot;
mod source;

pub use mapper::{AxisDirection, AxisRange, HoldReason, MapOutcome, MapperConfig, PoseMapper};
pub use slot::{PosePublisher, PoseSlot, pose_slot};
pub use source::{JsonLinesPoseSource, PoseRecord, PoseSource};

use std::time::Instant;

/// Number of hand landmarks produced per frame.
pub const LANDMARK_COUNT: usize = 21;

/// Indices into [`PoseSample::landmarks`] for the landmarks the mapper uses
/// by default.
pub mod landmark {
    pub const WRIST: usize = 0;
    pub const THUMB_TIP: usize = 4;
    pub const INDEX_TIP: usize = 8;
    pub const MIDDLE_MCP: usize = 9;
}

/// One landmark in normalized image coordinates (x right, y down).
#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct Landmark {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Landmark {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Distance in the image plane; depth is too noisy to trust.
    pub fn planar_distance(&self, other: &Self) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// One frame's hand estimate. Immutable once produced.
#[derive(Debug, Clone, PartialEq)]
pub struct PoseSample {
    pub landmarks: [Landmark; LANDMARK_COUNT],
    /// Detector confidence in `[0, 1]`.
    pub confidence: f64,
    pub timestamp: Instant,
}

impl PoseSample {
    pub fn new(landmarks: [Landmark; LANDMARK_COUNT], confidence: f64, timestamp: Instant) -> Self {
        Self {
            landmarks,
            confidence,
            timestamp,
        }
    }
}
