//! Validation of a loaded [`Config`] into a frozen [`CalibrationProfile`].
//!
//! Any violation rejects the whole profile. Values are never clamped into
//! shape here: an actuator must not start moving on a limit set nobody wrote.

use super::{Config, JointSection, MapperSection};
use crate::error::ConfigError;
use crate::joints::{
    CalibrationProfile, FilterParams, JointId, JointLimits, JointMap, LinkParams, SERVO_MAX_ANGLE,
    SessionParams,
};
use crate::pose::{AxisRange, LANDMARK_COUNT, MapperConfig};
use std::time::Duration;

impl CalibrationProfile {
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let sections = JointMap::new(
            config.joints.shoulder,
            config.joints.elbow,
            config.joints.wrist,
            config.joints.hand,
        );

        let mut limits = JointMap::splat(JointLimits::FULL_RANGE);
        let mut rest = JointMap::splat(0_u8);
        for (joint, section) in sections.iter() {
            let (joint_limits, rest_angle) = validate_joint(joint, section)?;
            limits[joint] = joint_limits;
            rest[joint] = rest_angle;
        }
        check_unique_pins(&limits)?;

        Ok(Self {
            limits,
            rest,
            filter: validate_filter(config)?,
            mapper: validate_mapper(&config.mapper)?,
            link: validate_link(config)?,
            session: validate_session(config)?,
        })
    }
}

fn validate_joint(
    joint: JointId,
    section: &JointSection,
) -> Result<(JointLimits, u8), ConfigError> {
    let JointSection {
        pin,
        min_angle: min,
        max_angle: max,
        rest,
    } = *section;

    if min > max {
        return Err(ConfigError::InvertedLimits { joint, min, max });
    }
    if max > u16::from(SERVO_MAX_ANGLE) {
        return Err(ConfigError::LimitOutOfRange { joint, max });
    }
    if !(min..=max).contains(&rest) {
        return Err(ConfigError::RestOutsideLimits {
            joint,
            rest,
            min,
            max,
        });
    }

    // All three are <= 180 past the checks above.
    let narrow = |v: u16| u8::try_from(v).unwrap_or(SERVO_MAX_ANGLE);
    Ok((
        JointLimits {
            min_angle: narrow(min),
            max_angle: narrow(max),
            pin,
        },
        narrow(rest),
    ))
}

fn check_unique_pins(limits: &JointMap<JointLimits>) -> Result<(), ConfigError> {
    for (joint, a) in limits.iter() {
        for (other, b) in limits.iter() {
            if other > joint && a.pin == b.pin {
                return Err(ConfigError::DuplicatePin {
                    joint,
                    other,
                    pin: a.pin,
                });
            }
        }
    }
    Ok(())
}

fn validate_filter(config: &Config) -> Result<FilterParams, ConfigError> {
    let motion = &config.motion;
    if !(motion.smoothing > 0.0 && motion.smoothing <= 1.0) {
        return Err(ConfigError::Validation(format!(
            "motion.smoothing must be in (0, 1], got {}",
            motion.smoothing
        )));
    }
    if !(motion.max_delta_per_tick.is_finite() && motion.max_delta_per_tick > 0.0) {
        return Err(ConfigError::Validation(format!(
            "motion.max_delta_per_tick must be positive, got {}",
            motion.max_delta_per_tick
        )));
    }
    if !(motion.min_send_delta.is_finite() && motion.min_send_delta >= 0.0) {
        return Err(ConfigError::Validation(format!(
            "motion.min_send_delta must be non-negative, got {}",
            motion.min_send_delta
        )));
    }
    Ok(FilterParams {
        alpha: motion.smoothing,
        max_delta_per_tick: motion.max_delta_per_tick,
        min_send_delta: motion.min_send_delta,
    })
}

fn axis_range(name: &str, [low, high]: [f64; 2]) -> Result<AxisRange, ConfigError> {
    if !(low.is_finite() && high.is_finite() && low < high) {
        return Err(ConfigError::Validation(format!(
            "mapper.{name} must be an increasing pair, got [{low}, {high}]"
        )));
    }
    Ok(AxisRange { low, high })
}

fn landmark_index(name: &str, index: usize) -> Result<usize, ConfigError> {
    if index >= LANDMARK_COUNT {
        return Err(ConfigError::Validation(format!(
            "mapper.{name} refers to landmark {index}, only 0..{LANDMARK_COUNT} exist"
        )));
    }
    Ok(index)
}

fn landmark_pair(name: &str, [a, b]: [usize; 2]) -> Result<(usize, usize), ConfigError> {
    let a = landmark_index(name, a)?;
    let b = landmark_index(name, b)?;
    if a == b {
        return Err(ConfigError::Validation(format!(
            "mapper.{name} needs two distinct landmarks, got {a} twice"
        )));
    }
    Ok((a, b))
}

fn validate_mapper(section: &MapperSection) -> Result<MapperConfig, ConfigError> {
    if !(0.0..=1.0).contains(&section.confidence_threshold) {
        return Err(ConfigError::Validation(format!(
            "mapper.confidence_threshold must be in [0, 1], got {}",
            section.confidence_threshold
        )));
    }
    let pinch_span = axis_range("pinch_span", section.pinch_span)?;
    if pinch_span.low < 0.0 {
        return Err(ConfigError::Validation(
            "mapper.pinch_span cannot start below zero".into(),
        ));
    }

    Ok(MapperConfig {
        confidence_threshold: section.confidence_threshold,
        horizontal: axis_range("horizontal_range", section.horizontal_range)?,
        vertical: axis_range("vertical_range", section.vertical_range)?,
        shoulder_direction: section.shoulder_direction,
        elbow_direction: section.elbow_direction,
        anchor_landmark: landmark_index("anchor_landmark", section.anchor_landmark)?,
        rotation_landmarks: landmark_pair("rotation_landmarks", section.rotation_landmarks)?,
        pinch_landmarks: landmark_pair("pinch_landmarks", section.pinch_landmarks)?,
        pinch_span,
    })
}

fn validate_link(config: &Config) -> Result<LinkParams, ConfigError> {
    let link = &config.link;
    if link.port.trim().is_empty() {
        return Err(ConfigError::Validation("link.port is empty".into()));
    }
    if link.baud == 0 {
        return Err(ConfigError::Validation("link.baud must be non-zero".into()));
    }
    if link.ready_timeout_ms == 0 || link.io_timeout_ms == 0 {
        return Err(ConfigError::Validation(
            "link timeouts must be non-zero".into(),
        ));
    }
    if link.backoff_initial_ms == 0 || link.backoff_initial_ms > link.backoff_max_ms {
        return Err(ConfigError::Validation(format!(
            "link backoff must satisfy 0 < initial ({}) <= max ({})",
            link.backoff_initial_ms, link.backoff_max_ms
        )));
    }
    Ok(LinkParams {
        port: link.port.clone(),
        baud: link.baud,
        ready_timeout: Duration::from_millis(link.ready_timeout_ms),
        io_timeout: Duration::from_millis(link.io_timeout_ms),
        backoff_initial: Duration::from_millis(link.backoff_initial_ms),
        backoff_max: Duration::from_millis(link.backoff_max_ms),
        max_reconnect_attempts: link.max_reconnect_attempts,
    })
}

fn validate_session(config: &Config) -> Result<SessionParams, ConfigError> {
    let session = &config.session;
    if session.tick_ms == 0 {
        return Err(ConfigError::Validation(
            "session.tick_ms must be non-zero".into(),
        ));
    }
    Ok(SessionParams {
        tick_interval: Duration::from_millis(session.tick_ms),
        keep_alive: (session.keep_alive_ms > 0)
            .then(|| Duration::from_millis(session.keep_alive_ms)),
    })
}
