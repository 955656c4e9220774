use crate::error::{DecodeError, EncodeError};
use crate::joints::{JointId, JointLimits, MAX_CHANNEL, SERVO_MAX_ANGLE, SERVO_MIN_ANGLE};
use std::fmt;

/// Line the firmware prints once after setup.
pub const READY_LINE: &str = "Arduino ready";

const PREFIX: u8 = b'S';
const DELIMITER: u8 = b',';
const TERMINATOR: u8 = b'\n';

/// Longest line the host bothers to assemble while reading from the firmware.
pub const MAX_LINE_LEN: usize = 128;

/// A single servo position command, in whole degrees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Command {
    pub joint: JointId,
    pub angle: u8,
}

impl Command {
    pub const fn new(joint: JointId, angle: u8) -> Self {
        Self { joint, angle }
    }

    /// Round a safe angle to whole degrees and force it into `limits`.
    ///
    /// Applied regardless of where `angle` came from; upstream clamping is
    /// not trusted.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn bounded(joint: JointId, angle: f64, limits: &JointLimits) -> Self {
        let low = f64::from(limits.min_angle.max(SERVO_MIN_ANGLE));
        let high = f64::from(limits.max_angle.min(SERVO_MAX_ANGLE));
        let rounded = if angle.is_nan() { low } else { angle.round() };
        Self {
            joint,
            // In 0..=180 after the clamp, so the cast is exact.
            angle: rounded.clamp(low, high) as u8,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S{},{}", self.joint.channel(), self.angle)
    }
}

/// Wire form: `S<channel>,<angle>\n`.
pub fn encode(command: &Command) -> Result<Vec<u8>, EncodeError> {
    let channel = command.joint.channel();
    if channel > MAX_CHANNEL {
        return Err(EncodeError::InvalidChannel(channel));
    }
    if command.angle > SERVO_MAX_ANGLE {
        return Err(EncodeError::AngleOutOfRange(command.angle));
    }
    let mut bytes = command.to_string().into_bytes();
    bytes.push(TERMINATOR);
    Ok(bytes)
}

/// Strict inverse of [`encode`]. Tolerates a trailing `\r`.
pub fn decode(bytes: &[u8]) -> Result<Command, DecodeError> {
    let body = bytes
        .strip_suffix(&[TERMINATOR])
        .ok_or(DecodeError::MissingTerminator)?;
    let body = body.strip_suffix(b"\r").unwrap_or(body);
    let body = body.strip_prefix(&[PREFIX]).ok_or(DecodeError::MissingPrefix)?;

    let split = body
        .iter()
        .position(|&b| b == DELIMITER)
        .ok_or(DecodeError::MissingDelimiter)?;
    let (id_bytes, angle_bytes) = (&body[..split], &body[split + 1..]);

    let joint = parse_digits(id_bytes)
        .and_then(|id| u8::try_from(id).ok())
        .and_then(JointId::from_channel)
        .ok_or_else(|| DecodeError::InvalidJointId(lossy(id_bytes)))?;

    let angle = parse_digits(angle_bytes).ok_or_else(|| DecodeError::InvalidAngle(lossy(angle_bytes)))?;
    let angle = u8::try_from(angle)
        .ok()
        .filter(|a| *a <= SERVO_MAX_ANGLE)
        .ok_or(DecodeError::AngleOutOfRange(angle))?;

    Ok(Command { joint, angle })
}

/// True for the firmware's readiness line, ignoring surrounding whitespace
/// (the firmware terminates lines with CRLF).
pub fn is_ready_line(line: &str) -> bool {
    line.trim() == READY_LINE
}

fn parse_digits(bytes: &[u8]) -> Option<u32> {
    if bytes.is_empty() || !bytes.iter().all(u8::is_ascii_digit) {
        return None;
    }
    std::str::from_utf8(bytes).ok()?.parse().ok()
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// Assembles newline-delimited lines from arbitrary read chunks.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buf: Vec<u8>,
    overflowed: bool,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `bytes`, returning every line they complete (without the
    /// terminator). Lines longer than [`MAX_LINE_LEN`] are dropped whole.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        for &byte in bytes {
            if byte == TERMINATOR {
                if !self.overflowed {
                    lines.push(String::from_utf8_lossy(&self.buf).into_owned());
                }
                self.buf.clear();
                self.overflowed = false;
            } else if self.buf.len() < MAX_LINE_LEN {
                self.buf.push(byte);
            } else {
                self.overflowed = true;
            }
        }
        lines
    }

    pub fn clear(&mut self) {
        self.buf.clear();
        self.overflowed = false;
    }
}
