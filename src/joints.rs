//! Joint identifiers, per-joint limits and the immutable calibration profile.
//!
//! Every component that needs limits, rest angles or tuning parameters
//! receives an `Arc<CalibrationProfile>` built once at startup by
//! [`CalibrationProfile::from_config`](crate::config). Nothing here is mutated
//! after construction.

use serde::Serialize;
use std::ops::{Index, IndexMut};
use std::time::Duration;
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// Highest servo channel the firmware accepts.
pub const MAX_CHANNEL: u8 = 3;

/// Physical servo range understood by the firmware, in degrees.
pub const SERVO_MIN_ANGLE: u8 = 0;
pub const SERVO_MAX_ANGLE: u8 = 180;

/// One independently controlled degree of freedom.
///
/// The discriminant is the wire channel (`S<channel>,<angle>`).
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Display,
    EnumIter,
    EnumString,
    IntoStaticStr,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum JointId {
    Shoulder = 0,
    Elbow = 1,
    Wrist = 2,
    Hand = 3,
}

impl JointId {
    /// All joints in channel order. Commands within a tick go out in this order.
    pub const ALL: [Self; 4] = [Self::Shoulder, Self::Elbow, Self::Wrist, Self::Hand];

    pub const fn channel(self) -> u8 {
        self as u8
    }

    pub const fn index(self) -> usize {
        self as usize
    }

    pub fn from_channel(channel: u8) -> Option<Self> {
        Self::ALL.get(usize::from(channel)).copied()
    }

    pub fn name(self) -> &'static str {
        self.into()
    }
}

/// Fixed-size map with one slot per [`JointId`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct JointMap<T>([T; 4]);

impl<T> JointMap<T> {
    pub const fn new(shoulder: T, elbow: T, wrist: T, hand: T) -> Self {
        Self([shoulder, elbow, wrist, hand])
    }

    pub fn from_fn(mut f: impl FnMut(JointId) -> T) -> Self {
        Self(JointId::ALL.map(&mut f))
    }

    pub fn iter(&self) -> impl Iterator<Item = (JointId, &T)> {
        JointId::ALL.into_iter().zip(self.0.iter())
    }

    pub fn map<U>(&self, mut f: impl FnMut(JointId, &T) -> U) -> JointMap<U> {
        JointMap::from_fn(|joint| f(joint, &self[joint]))
    }
}

impl<T: Copy> JointMap<T> {
    pub const fn splat(value: T) -> Self {
        Self([value; 4])
    }
}

impl<T> Index<JointId> for JointMap<T> {
    type Output = T;

    fn index(&self, joint: JointId) -> &T {
        &self.0[joint.index()]
    }
}

impl<T> IndexMut<JointId> for JointMap<T> {
    fn index_mut(&mut self, joint: JointId) -> &mut T {
        &mut self.0[joint.index()]
    }
}

/// Calibrated bounds for one joint. `min_angle <= max_angle <= 180`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct JointLimits {
    pub min_angle: u8,
    pub max_angle: u8,
    /// Microcontroller pin the servo is attached to.
    pub pin: u8,
}

impl JointLimits {
    pub const FULL_RANGE: Self = Self {
        min_angle: SERVO_MIN_ANGLE,
        max_angle: SERVO_MAX_ANGLE,
        pin: 0,
    };

    pub fn clamp(&self, angle: f64) -> f64 {
        if angle.is_nan() {
            return f64::from(self.min_angle);
        }
        angle.clamp(f64::from(self.min_angle), f64::from(self.max_angle))
    }

    pub fn contains(&self, angle: f64) -> bool {
        angle >= f64::from(self.min_angle) && angle <= f64::from(self.max_angle)
    }
}

/// Smoothing and rate-limiting parameters for [`MotionFilter`](crate::motion::MotionFilter).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FilterParams {
    /// Exponential smoothing factor in `(0, 1]`; `1.0` disables smoothing.
    pub alpha: f64,
    /// Largest change in degrees a joint may make in one tick.
    pub max_delta_per_tick: f64,
    /// Hysteresis below which a new angle is not worth sending.
    pub min_send_delta: f64,
}

/// Serial link parameters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkParams {
    pub port: String,
    pub baud: u32,
    /// How long to wait for the firmware readiness line after opening.
    pub ready_timeout: Duration,
    /// Per-operation I/O timeout on the transport.
    pub io_timeout: Duration,
    pub backoff_initial: Duration,
    pub backoff_max: Duration,
    /// Consecutive failed reconnects tolerated while active before faulting.
    pub max_reconnect_attempts: u32,
}

/// Control-loop timing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SessionParams {
    pub tick_interval: Duration,
    /// Re-send a joint's last command after this long without traffic.
    pub keep_alive: Option<Duration>,
}

/// Everything the control pipeline needs, validated once and then frozen.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalibrationProfile {
    pub limits: JointMap<JointLimits>,
    pub rest: JointMap<u8>,
    pub filter: FilterParams,
    pub mapper: crate::pose::MapperConfig,
    pub link: LinkParams,
    pub session: SessionParams,
}

impl CalibrationProfile {
    pub fn limits(&self, joint: JointId) -> &JointLimits {
        &self.limits[joint]
    }

    pub fn rest_angle(&self, joint: JointId) -> f64 {
        f64::from(self.rest[joint])
    }

    /// Servo pins in channel order.
    pub fn pins(&self) -> [u8; 4] {
        JointId::ALL.map(|joint| self.limits[joint].pin)
    }
}
