//! Microcontroller side of the wire protocol.
//!
//! Bytes are consumed one at a time, so commands split across reads parse the
//! same as whole ones. Malformed or out-of-range lines are dropped without a
//! reply; the only thing the firmware ever says is the readiness line.

use super::codec::READY_LINE;
use crate::joints::{JointId, SERVO_MAX_ANGLE};

/// Servo pins used by the stock wiring, indexed by channel.
pub const DEFAULT_PINS: [u8; 4] = [2, 3, 4, 5];
/// Positions written during setup: arm centred, gripper closed.
pub const BOOT_ANGLES: [u8; 4] = [90, 90, 90, 0];

/// At most three digits per field; anything longer cannot be valid.
const MAX_DIGITS: u8 = 3;

/// Hardware the interpreter drives.
pub trait ServoBank {
    fn attach(&mut self, channel: u8, pin: u8);
    fn write(&mut self, channel: u8, angle: u8);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    AwaitingLine,
    ParsingId { id: u16, digits: u8 },
    ParsingAngle { id: u16, angle: u16, digits: u8 },
    /// Complete command followed by trailing whitespace.
    AwaitingTerminator { id: u16, angle: u16 },
    Discarding,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InterpreterStats {
    pub applied: u64,
    pub discarded: u64,
}

#[derive(Debug)]
pub struct FirmwareInterpreter<S> {
    servos: S,
    pins: [u8; 4],
    angles: [u8; 4],
    state: ParseState,
    stats: InterpreterStats,
}

impl<S: ServoBank> FirmwareInterpreter<S> {
    pub fn new(servos: S) -> Self {
        Self::with_pins(servos, DEFAULT_PINS)
    }

    pub fn with_pins(servos: S, pins: [u8; 4]) -> Self {
        Self {
            servos,
            pins,
            angles: BOOT_ANGLES,
            state: ParseState::AwaitingLine,
            stats: InterpreterStats::default(),
        }
    }

    /// Attach every servo, move to boot positions and return the readiness
    /// line to transmit.
    pub fn boot(&mut self) -> Vec<u8> {
        for (channel, (&pin, &angle)) in (0_u8..).zip(self.pins.iter().zip(&BOOT_ANGLES)) {
            self.servos.attach(channel, pin);
            self.servos.write(channel, angle);
        }
        self.angles = BOOT_ANGLES;
        self.state = ParseState::AwaitingLine;
        format!("{READY_LINE}\r\n").into_bytes()
    }

    pub fn feed(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.feed_byte(byte);
        }
    }

    pub fn feed_byte(&mut self, byte: u8) {
        use ParseState::{AwaitingLine, AwaitingTerminator, Discarding, ParsingAngle, ParsingId};

        if byte == b'\n' {
            match self.state {
                AwaitingTerminator { id, angle } | ParsingAngle { id, angle, digits: 1.. } => {
                    self.dispatch(id, angle);
                }
                AwaitingLine => {}
                _ => self.stats.discarded += 1,
            }
            self.state = AwaitingLine;
            return;
        }

        let blank = matches!(byte, b' ' | b'\t' | b'\r');
        self.state = match self.state {
            AwaitingLine if blank => AwaitingLine,
            AwaitingLine if byte == b'S' => ParsingId { id: 0, digits: 0 },
            ParsingId { id, digits } if byte.is_ascii_digit() && digits < MAX_DIGITS => ParsingId {
                id: id * 10 + u16::from(byte - b'0'),
                digits: digits + 1,
            },
            ParsingId { id, digits: 1.. } if byte == b',' => ParsingAngle {
                id,
                angle: 0,
                digits: 0,
            },
            ParsingAngle { id, angle, digits } if byte.is_ascii_digit() && digits < MAX_DIGITS => {
                ParsingAngle {
                    id,
                    angle: angle * 10 + u16::from(byte - b'0'),
                    digits: digits + 1,
                }
            }
            ParsingAngle { id, angle, digits: 1.. } | AwaitingTerminator { id, angle } if blank => {
                AwaitingTerminator { id, angle }
            }
            _ => Discarding,
        };
    }

    fn dispatch(&mut self, id: u16, angle: u16) {
        let joint = u8::try_from(id).ok().and_then(JointId::from_channel);
        let angle = u8::try_from(angle).ok().filter(|a| *a <= SERVO_MAX_ANGLE);
        let (Some(joint), Some(angle)) = (joint, angle) else {
            self.stats.discarded += 1;
            return;
        };
        let angle = angle.min(SERVO_MAX_ANGLE);
        self.servos.write(joint.channel(), angle);
        self.angles[joint.index()] = angle;
        self.stats.applied += 1;
    }

    /// Last angle written to each channel.
    pub fn angles(&self) -> [u8; 4] {
        self.angles
    }

    pub fn stats(&self) -> InterpreterStats {
        self.stats
    }

    pub fn servos(&self) -> &S {
        &self.servos
    }
}
