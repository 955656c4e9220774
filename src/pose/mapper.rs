use super::{Landmark, PoseSample, landmark};
use crate::joints::{JointId, JointMap, SERVO_MAX_ANGLE};
use serde::{Deserialize, Serialize};

const FULL_SWEEP: f64 = SERVO_MAX_ANGLE as f64;

/// Which way a camera axis drives its joint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AxisDirection {
    /// Low coordinate → low angle.
    #[default]
    Direct,
    /// Low coordinate → high angle.
    Inverted,
}

impl AxisDirection {
    fn apply(self, normalized: f64) -> f64 {
        match self {
            Self::Direct => normalized,
            Self::Inverted => 1.0 - normalized,
        }
    }
}

/// A closed interval `low < high` used to rescale an observation to `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AxisRange {
    pub low: f64,
    pub high: f64,
}

impl AxisRange {
    pub fn normalize(&self, value: f64) -> f64 {
        let clamped = value.clamp(self.low, self.high);
        (clamped - self.low) / (self.high - self.low)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapperConfig {
    pub confidence_threshold: f64,
    pub horizontal: AxisRange,
    pub vertical: AxisRange,
    pub shoulder_direction: AxisDirection,
    pub elbow_direction: AxisDirection,
    pub anchor_landmark: usize,
    /// `(from, to)`: the direction from → to is compared against image-up.
    pub rotation_landmarks: (usize, usize),
    pub pinch_landmarks: (usize, usize),
    /// Pinch distance observed fully closed (`low`) and fully open (`high`).
    pub pinch_span: AxisRange,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.7,
            horizontal: AxisRange {
                low: 0.2,
                high: 0.8,
            },
            vertical: AxisRange {
                low: 0.2,
                high: 0.8,
            },
            shoulder_direction: AxisDirection::Direct,
            elbow_direction: AxisDirection::Inverted,
            anchor_landmark: landmark::WRIST,
            rotation_landmarks: (landmark::WRIST, landmark::MIDDLE_MCP),
            pinch_landmarks: (landmark::THUMB_TIP, landmark::INDEX_TIP),
            pinch_span: AxisRange {
                low: 0.02,
                high: 0.25,
            },
        }
    }
}

/// Why a sample produced no new targets.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HoldReason {
    LowConfidence { confidence: f64 },
    NonFiniteLandmark { index: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub enum MapOutcome {
    /// Raw target angle per joint, each within `[0, 180]`.
    Update(JointMap<f64>),
    /// The sample is unreliable; keep driving the previous output.
    NoUpdate(HoldReason),
}

/// Pure mapping from a hand pose to raw joint targets.
#[derive(Debug, Clone)]
pub struct PoseMapper {
    config: MapperConfig,
}

impl PoseMapper {
    pub fn new(config: MapperConfig) -> Self {
        Self { config }
    }

    pub fn map(&self, pose: &PoseSample) -> MapOutcome {
        // NaN confidence fails this comparison too.
        if !(pose.confidence >= self.config.confidence_threshold) {
            return MapOutcome::NoUpdate(HoldReason::LowConfidence {
                confidence: pose.confidence,
            });
        }
        if let Some(index) = pose.landmarks.iter().position(|l| !l.is_finite()) {
            return MapOutcome::NoUpdate(HoldReason::NonFiniteLandmark { index });
        }

        let cfg = &self.config;
        let anchor = &pose.landmarks[cfg.anchor_landmark];
        let (rot_from, rot_to) = cfg.rotation_landmarks;
        let (pinch_a, pinch_b) = cfg.pinch_landmarks;

        let targets = JointMap::from_fn(|joint| {
            let angle = match joint {
                JointId::Shoulder => {
                    cfg.shoulder_direction
                        .apply(cfg.horizontal.normalize(anchor.x))
                        * FULL_SWEEP
                }
                JointId::Elbow => {
                    cfg.elbow_direction.apply(cfg.vertical.normalize(anchor.y)) * FULL_SWEEP
                }
                JointId::Wrist => {
                    rotation_angle(&pose.landmarks[rot_from], &pose.landmarks[rot_to])
                }
                JointId::Hand => {
                    let distance = pose.landmarks[pinch_a].planar_distance(&pose.landmarks[pinch_b]);
                    cfg.pinch_span.normalize(distance) * FULL_SWEEP
                }
            };
            clamp_degrees(angle)
        });

        MapOutcome::Update(targets)
    }
}

/// Tilt of `from → to` against image-up, rescaled from `[-90°, 90°]` to `[0, 180]`.
fn rotation_angle(from: &Landmark, to: &Landmark) -> f64 {
    let dx = to.x - from.x;
    // Image y grows downward; flip so "up" is positive.
    let up = from.y - to.y;
    let tilt = dx.atan2(up).to_degrees().clamp(-90.0, 90.0);
    tilt + 90.0
}

fn clamp_degrees(angle: f64) -> f64 {
    if angle.is_nan() {
        return FULL_SWEEP / 2.0;
    }
    angle.clamp(0.0, FULL_SWEEP)
}
