//! Per-joint smoothing, rate limiting and range clamping.
//!
//! The filter is the first of two independent range gates between a pose and
//! the servos (the second is [`encode`](crate::protocol::encode)). Whatever a
//! caller feeds in, [`MotionFilter::filter`] only ever returns angles inside
//! the joint's calibrated limits.

use crate::joints::{CalibrationProfile, JointId, JointMap};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Command history for one joint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointCommandState {
    /// Previous filter output; the base for smoothing and rate limiting.
    pub last_output: f64,
    pub last_sent_angle: f64,
    pub last_sent_time: Option<Instant>,
}

impl JointCommandState {
    fn at(angle: f64, sent_at: Option<Instant>) -> Self {
        Self {
            last_output: angle,
            last_sent_angle: angle,
            last_sent_time: sent_at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterOutput {
    pub safe_angle: f64,
    pub should_send: bool,
}

#[derive(Debug)]
pub struct MotionFilter {
    profile: Arc<CalibrationProfile>,
    state: JointMap<Option<JointCommandState>>,
}

impl MotionFilter {
    pub fn new(profile: Arc<CalibrationProfile>) -> Self {
        Self {
            profile,
            state: JointMap::splat(None),
        }
    }

    /// Advance `joint` one tick toward `raw_angle`.
    ///
    /// Smoothing, then per-tick rate clamp, then range clamp. The first call
    /// for a joint starts from its rest angle, not from `raw_angle`.
    pub fn filter(&mut self, joint: JointId, raw_angle: f64, now: Instant) -> FilterOutput {
        let params = self.profile.filter;
        let limits = *self.profile.limits(joint);
        let rest = self.profile.rest_angle(joint);
        let state = self.state[joint].get_or_insert_with(|| JointCommandState::at(rest, None));

        let prev = state.last_output;
        let target = if raw_angle.is_nan() { prev } else { raw_angle };

        let smoothed = prev + params.alpha * (target - prev);
        let step = (smoothed - prev).clamp(-params.max_delta_per_tick, params.max_delta_per_tick);
        let safe_angle = limits.clamp(prev + step);

        state.last_output = safe_angle;
        let should_send = (safe_angle - state.last_sent_angle).abs() >= params.min_send_delta;
        if should_send {
            state.last_sent_angle = safe_angle;
            state.last_sent_time = Some(now);
        }

        FilterOutput {
            safe_angle,
            should_send,
        }
    }

    /// Last safe angle produced for `joint` (its rest angle before any tick).
    pub fn last_output(&self, joint: JointId) -> f64 {
        self.state[joint].map_or_else(|| self.profile.rest_angle(joint), |s| s.last_output)
    }

    pub fn state(&self, joint: JointId) -> Option<&JointCommandState> {
        self.state[joint].as_ref()
    }

    /// Record that every joint was just commanded to its rest angle.
    pub fn settle_at_rest(&mut self, now: Instant) {
        let profile = Arc::clone(&self.profile);
        self.state = JointMap::from_fn(|joint| {
            Some(JointCommandState::at(profile.rest_angle(joint), Some(now)))
        });
    }

    /// If `joint` has been quiet for at least `interval`, mark it re-sent and
    /// return the angle to repeat.
    pub fn keep_alive_due(&mut self, joint: JointId, now: Instant, interval: Duration) -> Option<f64> {
        let state = self.state[joint].as_mut()?;
        let last = state.last_sent_time?;
        if now.saturating_duration_since(last) < interval {
            return None;
        }
        state.last_sent_time = Some(now);
        Some(state.last_sent_angle)
    }
}
