use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::pose::AxisDirection;

// ── Serial link ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkConfig {
    /// Serial device (e.g. `/dev/ttyUSB0`, `COM3`)
    #[serde(default = "default_port")]
    pub port: String,
    /// Must match the firmware's `Serial.begin` rate (default: 9600)
    #[serde(default = "default_baud")]
    pub baud: u32,
    /// Wait this long for "Arduino ready" after opening the port
    #[serde(default = "default_ready_timeout_ms")]
    pub ready_timeout_ms: u64,
    /// Read/write timeout applied to the serial port
    #[serde(default = "default_io_timeout_ms")]
    pub io_timeout_ms: u64,
    #[serde(default = "default_backoff_initial_ms")]
    pub backoff_initial_ms: u64,
    #[serde(default = "default_backoff_max_ms")]
    pub backoff_max_ms: u64,
    /// Failed reconnects tolerated mid-session before the session faults
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,
}

fn default_port() -> String {
    if cfg!(windows) {
        "COM3".into()
    } else {
        "/dev/ttyUSB0".into()
    }
}

fn default_baud() -> u32 {
    9600
}

fn default_ready_timeout_ms() -> u64 {
    2000
}

fn default_io_timeout_ms() -> u64 {
    200
}

fn default_backoff_initial_ms() -> u64 {
    500
}

fn default_backoff_max_ms() -> u64 {
    4000
}

fn default_max_reconnect_attempts() -> u32 {
    3
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            baud: default_baud(),
            ready_timeout_ms: default_ready_timeout_ms(),
            io_timeout_ms: default_io_timeout_ms(),
            backoff_initial_ms: default_backoff_initial_ms(),
            backoff_max_ms: default_backoff_max_ms(),
            max_reconnect_attempts: default_max_reconnect_attempts(),
        }
    }
}

// ── Motion filter ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MotionConfig {
    /// Exponential smoothing factor, (0, 1]. 1.0 disables smoothing.
    #[serde(default = "default_smoothing")]
    pub smoothing: f64,
    /// Degrees a joint may move per tick
    #[serde(default = "default_max_delta_per_tick")]
    pub max_delta_per_tick: f64,
    /// Changes smaller than this are not sent
    #[serde(default = "default_min_send_delta")]
    pub min_send_delta: f64,
}

fn default_smoothing() -> f64 {
    0.3
}

fn default_max_delta_per_tick() -> f64 {
    10.0
}

fn default_min_send_delta() -> f64 {
    1.0
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            smoothing: default_smoothing(),
            max_delta_per_tick: default_max_delta_per_tick(),
            min_send_delta: default_min_send_delta(),
        }
    }
}

// ── Pose mapping ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapperSection {
    /// Pose samples below this confidence hold the previous output
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,
    /// Normalized camera x span mapped onto the shoulder's 0..180
    #[serde(default = "default_active_range")]
    pub horizontal_range: [f64; 2],
    /// Normalized camera y span mapped onto the elbow's 0..180
    #[serde(default = "default_active_range")]
    pub vertical_range: [f64; 2],
    #[serde(default)]
    pub shoulder_direction: AxisDirection,
    #[serde(default = "default_elbow_direction")]
    pub elbow_direction: AxisDirection,
    /// Landmark whose position drives shoulder and elbow (default: wrist)
    #[serde(default)]
    pub anchor_landmark: usize,
    /// Landmark pair whose direction gives wrist rotation
    #[serde(default = "default_rotation_landmarks")]
    pub rotation_landmarks: [usize; 2],
    /// Landmark pair whose distance gives gripper opening
    #[serde(default = "default_pinch_landmarks")]
    pub pinch_landmarks: [usize; 2],
    /// Observed closed/open pinch distances
    #[serde(default = "default_pinch_span")]
    pub pinch_span: [f64; 2],
}

fn default_confidence_threshold() -> f64 {
    0.7
}

fn default_active_range() -> [f64; 2] {
    [0.2, 0.8]
}

fn default_elbow_direction() -> AxisDirection {
    AxisDirection::Inverted
}

fn default_rotation_landmarks() -> [usize; 2] {
    [crate::pose::landmark::WRIST, crate::pose::landmark::MIDDLE_MCP]
}

fn default_pinch_landmarks() -> [usize; 2] {
    [crate::pose::landmark::THUMB_TIP, crate::pose::landmark::INDEX_TIP]
}

fn default_pinch_span() -> [f64; 2] {
    [0.02, 0.25]
}

impl Default for MapperSection {
    fn default() -> Self {
        Self {
            confidence_threshold: default_confidence_threshold(),
            horizontal_range: default_active_range(),
            vertical_range: default_active_range(),
            shoulder_direction: AxisDirection::default(),
            elbow_direction: default_elbow_direction(),
            anchor_landmark: crate::pose::landmark::WRIST,
            rotation_landmarks: default_rotation_landmarks(),
            pinch_landmarks: default_pinch_landmarks(),
            pinch_span: default_pinch_span(),
        }
    }
}

// ── Session timing ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Control tick period (default: 33 ms, ~30 Hz camera rate)
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
    /// Re-send idle joints after this many ms; 0 disables keep-alive
    #[serde(default)]
    pub keep_alive_ms: u64,
}

fn default_tick_ms() -> u64 {
    33
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tick_ms: default_tick_ms(),
            keep_alive_ms: 0,
        }
    }
}

// ── Status output ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusConfig {
    /// Periodically write a JSON status snapshot here
    #[serde(default)]
    pub file: Option<PathBuf>,
    #[serde(default = "default_status_flush_secs")]
    pub flush_secs: u64,
}

fn default_status_flush_secs() -> u64 {
    5
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            file: None,
            flush_secs: default_status_flush_secs(),
        }
    }
}

// ── Joints ────────────────────────────────────────────────────────

/// Raw per-joint calibration. Angles are read wide so that out-of-range
/// values reach validation instead of failing deserialization.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct JointSection {
    pub pin: u8,
    #[serde(default)]
    pub min_angle: u16,
    #[serde(default = "default_max_angle")]
    pub max_angle: u16,
    pub rest: u16,
}

fn default_max_angle() -> u16 {
    180
}

impl JointSection {
    const fn with(pin: u8, rest: u16) -> Self {
        Self {
            pin,
            min_angle: 0,
            max_angle: 180,
            rest,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JointsConfig {
    #[serde(default = "default_shoulder")]
    pub shoulder: JointSection,
    #[serde(default = "default_elbow")]
    pub elbow: JointSection,
    #[serde(default = "default_wrist")]
    pub wrist: JointSection,
    /// Gripper: 0 = closed, 180 = open
    #[serde(default = "default_hand")]
    pub hand: JointSection,
}

fn default_shoulder() -> JointSection {
    JointSection::with(2, 90)
}

fn default_elbow() -> JointSection {
    JointSection::with(3, 90)
}

fn default_wrist() -> JointSection {
    JointSection::with(4, 90)
}

fn default_hand() -> JointSection {
    JointSection::with(5, 0)
}

impl Default for JointsConfig {
    fn default() -> Self {
        Self {
            shoulder: default_shoulder(),
            elbow: default_elbow(),
            wrist: default_wrist(),
            hand: default_hand(),
        }
    }
}
