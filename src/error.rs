use crate::joints::JointId;
use crate::link::LinkState;
use std::time::Duration;
use thiserror::Error;

// ─── Config errors ───────────────────────────────────────────────────────────

/// A calibration profile that must not be used to actuate anything.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{joint}: min_angle {min} exceeds max_angle {max}")]
    InvertedLimits { joint: JointId, min: u16, max: u16 },

    #[error("{joint}: max_angle {max} is beyond the servo range 0..=180")]
    LimitOutOfRange { joint: JointId, max: u16 },

    #[error("{joint}: rest angle {rest} lies outside limits {min}..={max}")]
    RestOutsideLimits {
        joint: JointId,
        rest: u16,
        min: u16,
        max: u16,
    },

    #[error("{joint} and {other} share pin {pin}")]
    DuplicatePin {
        joint: JointId,
        other: JointId,
        pin: u8,
    },

    #[error("validation failed: {0}")]
    Validation(String),
}

// ─── Link errors ─────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("failed to open {port}: {source}")]
    Open {
        port: String,
        #[source]
        source: std::io::Error,
    },

    #[error("no readiness line from {port} within {waited:?}")]
    ReadyTimeout { port: String, waited: Duration },

    #[error("transport i/o failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("link is {0}, not ready")]
    NotReady(LinkState),

    #[error("reconnect backoff pending ({retry_in:?} left)")]
    BackoffPending { retry_in: Duration },

    #[error(transparent)]
    Encode(#[from] EncodeError),
}

impl LinkError {
    /// Encode failures are local programming errors; everything else means
    /// the transport can no longer be trusted.
    pub fn is_transport_failure(&self) -> bool {
        matches!(
            self,
            Self::Open { .. } | Self::ReadyTimeout { .. } | Self::Io(_)
        )
    }
}

// ─── Protocol errors ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    #[error("angle {0} outside 0..=180")]
    AngleOutOfRange(u8),

    #[error("channel {0} outside 0..=3")]
    InvalidChannel(u8),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("command is not newline-terminated")]
    MissingTerminator,

    #[error("command does not start with 'S'")]
    MissingPrefix,

    #[error("command has no ',' between id and angle")]
    MissingDelimiter,

    #[error("servo id {0:?} is not a valid joint")]
    InvalidJointId(String),

    #[error("angle {0:?} is not an integer")]
    InvalidAngle(String),

    #[error("angle {0} outside 0..=180")]
    AngleOutOfRange(u32),
}
